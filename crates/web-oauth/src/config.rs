use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Audience the handler accepts. Required.
pub const ALLOWED_AUDIENCE_VAR: &str = "WEB_OAUTH_ALLOWED_AUDIENCE";

/// Clock skew tolerance in seconds. Optional, 1..=600.
pub const CLOCK_SKEW_VAR: &str = "JWT_CLOCK_SKEW_SECONDS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub allowed_audience: String,
    pub clock_skew_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid allowed audience: {0}")]
    InvalidAudience(String),

    #[error("Invalid clock skew: {0}")]
    InvalidClockSkew(String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let allowed_audience = vars
            .get(ALLOWED_AUDIENCE_VAR)
            .ok_or_else(|| ConfigError::MissingEnvVar(ALLOWED_AUDIENCE_VAR.to_string()))?
            .trim()
            .to_string();

        // An empty audience would never match any token.
        if allowed_audience.is_empty() {
            return Err(ConfigError::InvalidAudience(
                "audience must not be empty".to_string(),
            ));
        }

        let clock_skew_seconds = match vars.get(CLOCK_SKEW_VAR) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|e| {
                    ConfigError::InvalidClockSkew(format!("{CLOCK_SKEW_VAR}={raw:?}: {e}"))
                })?;
                if secs == 0 || secs > MAX_CLOCK_SKEW.as_secs() {
                    return Err(ConfigError::InvalidClockSkew(format!(
                        "must be between 1 and {} seconds, got {secs}",
                        MAX_CLOCK_SKEW.as_secs()
                    )));
                }
                secs
            }
            None => DEFAULT_CLOCK_SKEW.as_secs(),
        };

        tracing::debug!(
            target: "web_oauth.config",
            allowed_audience = %allowed_audience,
            clock_skew_seconds,
            "Loaded web OAuth configuration"
        );

        Ok(Config {
            allowed_audience,
            clock_skew_seconds,
        })
    }

    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.clock_skew_seconds)
    }
}
