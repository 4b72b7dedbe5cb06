//! JWT claims for web OAuth tokens.
//!
//! [`JwtClaims`] is the wire payload shared by every RPC auth scheme: the
//! registered claims plus the scheme tag and an auth metadata map.
//! [`WebOAuthClaims`] wraps it with the audience the verifying service is
//! configured to accept, which never travels on the wire.
//!
//! Debug output redacts `sub` and metadata values so claims can be logged.

use crate::errors::AuthError;
use crate::handler::oauth_web_credentials_type;
use crate::rpc::{Claims, CredentialsType};
use common::jwt::{validate_iat_at, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Metadata attribute that names the entity.
///
/// The `sub` claim is the identity provider's internal user ID, not a
/// usable entity name, so the entity is read from here instead.
pub const ENTITY_METADATA_KEY: &str = "email";

/// Base claims carried by every RPC auth token.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject (identity provider user ID) - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience. Accepts a single string or a list on the wire; always
    /// serialized as a list.
    #[serde(
        default,
        deserialize_with = "deserialize_audience",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub aud: Vec<String>,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// JWT ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Auth scheme that issued the token.
    #[serde(
        rename = "rpc_creds_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub credentials_type: Option<CredentialsType>,

    /// Scheme-specific metadata - values redacted in Debug output.
    #[serde(
        rename = "rpc_auth_md",
        default,
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub auth_metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AudienceWire {
    One(String),
    Many(Vec<String>),
}

fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<AudienceWire>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(AudienceWire::One(aud)) => vec![aud],
        Some(AudienceWire::Many(aud)) => aud,
    })
}

impl fmt::Debug for JwtClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut metadata_keys: Vec<&str> = self.auth_metadata.keys().map(String::as_str).collect();
        metadata_keys.sort_unstable();

        f.debug_struct("JwtClaims")
            .field("iss", &self.iss)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("iat", &self.iat)
            .field("jti", &self.jti)
            .field("credentials_type", &self.credentials_type)
            .field("auth_metadata_keys", &metadata_keys)
            .finish()
    }
}

impl JwtClaims {
    /// Whether `audience` appears in the `aud` list (exact match).
    pub fn has_audience(&self, audience: &str) -> bool {
        !audience.is_empty() && self.aud.iter().any(|a| a == audience)
    }

    /// Base structural validation against the current time.
    ///
    /// # Errors
    ///
    /// See [`JwtClaims::validate_at`].
    pub fn validate(&self, leeway: Duration) -> Result<(), AuthError> {
        self.validate_at(chrono::Utc::now().timestamp(), leeway)
    }

    /// Base structural validation against an explicit `now`.
    ///
    /// - `exp`, when present, must be strictly after `now`; no leeway applies
    /// - `iat` must be present and not more than `leeway` in the future
    /// - `nbf`, when present, must be reached within `leeway`
    ///
    /// `leeway` is capped at [`MAX_CLOCK_SKEW`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaims` naming the first failed check.
    pub fn validate_at(&self, now: i64, leeway: Duration) -> Result<(), AuthError> {
        let leeway = leeway.min(MAX_CLOCK_SKEW);
        let leeway_secs = i64::try_from(leeway.as_secs()).unwrap_or(i64::MAX);

        if let Some(exp) = self.exp {
            if exp <= now {
                return Err(AuthError::InvalidClaims("token is expired".to_string()));
            }
        }

        let iat = self
            .iat
            .ok_or_else(|| AuthError::InvalidClaims("missing iat".to_string()))?;
        validate_iat_at(iat, leeway, now)?;

        if let Some(nbf) = self.nbf {
            if nbf > now.saturating_add(leeway_secs) {
                return Err(AuthError::InvalidClaims("token is not valid yet".to_string()));
            }
        }

        Ok(())
    }
}

/// Claims for one web OAuth verification attempt.
#[derive(Clone)]
pub struct WebOAuthClaims {
    payload: JwtClaims,

    // The JWT must contain this value in its aud claim.
    allowed_audience: String,

    clock_skew: Duration,
}

impl fmt::Debug for WebOAuthClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebOAuthClaims")
            .field("payload", &self.payload)
            .field("allowed_audience", &self.allowed_audience)
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

impl WebOAuthClaims {
    /// Empty claims that will accept tokens for `allowed_audience`.
    pub fn new(allowed_audience: impl Into<String>) -> Self {
        Self::with_clock_skew(allowed_audience, DEFAULT_CLOCK_SKEW)
    }

    /// Empty claims with an explicit clock skew tolerance, capped at
    /// [`MAX_CLOCK_SKEW`].
    pub fn with_clock_skew(allowed_audience: impl Into<String>, clock_skew: Duration) -> Self {
        Self {
            payload: JwtClaims::default(),
            allowed_audience: allowed_audience.into(),
            clock_skew: clock_skew.min(MAX_CLOCK_SKEW),
        }
    }

    /// The audience these claims were seeded with.
    pub fn allowed_audience(&self) -> &str {
        &self.allowed_audience
    }

    /// [`Claims::validate`] against an explicit `now`.
    ///
    /// # Errors
    ///
    /// `AudienceMismatch` if the allowed audience is not in `aud`,
    /// `MalformedToken` if `rpc_creds_type` is not the web OAuth scheme,
    /// otherwise whatever [`JwtClaims::validate_at`] reports.
    pub fn validate_at(&self, now: i64) -> Result<(), AuthError> {
        if !self.payload.has_audience(&self.allowed_audience) {
            tracing::debug!(
                target: "web_oauth.claims",
                allowed = %self.allowed_audience,
                presented = ?self.payload.aud,
                "Token rejected: audience mismatch"
            );
            return Err(AuthError::AudienceMismatch);
        }

        // Tokens minted for another scheme are routed elsewhere, never here.
        if self.payload.credentials_type != Some(oauth_web_credentials_type()) {
            tracing::debug!(
                target: "web_oauth.claims",
                presented = ?self.payload.credentials_type,
                "Token rejected: credentials type mismatch"
            );
            return Err(AuthError::MalformedToken(
                "unexpected credentials type".to_string(),
            ));
        }

        self.payload.validate_at(now, self.clock_skew)
    }
}

impl Claims for WebOAuthClaims {
    fn set_payload(&mut self, payload: JwtClaims) {
        self.payload = payload;
    }

    fn payload(&self) -> &JwtClaims {
        &self.payload
    }

    fn entity(&self) -> Result<String, AuthError> {
        self.payload
            .auth_metadata
            .get(ENTITY_METADATA_KEY)
            .cloned()
            .ok_or_else(|| {
                AuthError::MissingEntityAttribute(format!(
                    "missing {ENTITY_METADATA_KEY} in rpc_auth_md"
                ))
            })
    }

    fn validate(&self) -> Result<(), AuthError> {
        self.validate_at(chrono::Utc::now().timestamp())
    }
}
