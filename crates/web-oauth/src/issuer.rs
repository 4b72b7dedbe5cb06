//! Signing of web OAuth access tokens.
//!
//! Live traffic never mints tokens here. These helpers exist for tests and
//! for identity provider stand-ins that need tokens the handler accepts.

use crate::claims::{JwtClaims, ENTITY_METADATA_KEY};
use crate::errors::AuthError;
use crate::handler::oauth_web_credentials_type;
use crate::rpc::verify::ACCEPTED_ALGORITHM;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::collections::HashMap;
use std::time::Duration;
use tracing::instrument;

/// Parameters for a signed web OAuth access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAuthTokenRequest {
    /// Entity placed in both `sub` and the `email` metadata attribute.
    pub entity: String,
    /// Single `aud` value.
    pub audience: String,
    /// `iss` claim.
    pub issuer: String,
    /// `kid` header, naming the key verifiers should look up.
    pub key_id: String,
    /// Lifetime from `iat`. No `exp` claim is written when unset.
    pub expires_in: Option<Duration>,
}

impl WebAuthTokenRequest {
    /// Request a token without an expiry.
    pub fn new(
        entity: impl Into<String>,
        audience: impl Into<String>,
        issuer: impl Into<String>,
        key_id: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            audience: audience.into(),
            issuer: issuer.into(),
            key_id: key_id.into(),
            expires_in: None,
        }
    }

    /// Add an `exp` claim `expires_in` after issuance.
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    /// The claims this request produces when issued at `now` (Unix seconds).
    pub fn claims_at(&self, now: i64) -> JwtClaims {
        let exp = self.expires_in.map(|lifetime| {
            let secs = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
            now.saturating_add(secs)
        });

        JwtClaims {
            iss: Some(self.issuer.clone()),
            sub: Some(self.entity.clone()),
            aud: vec![self.audience.clone()],
            exp,
            iat: Some(now),
            credentials_type: Some(oauth_web_credentials_type()),
            auth_metadata: HashMap::from([(
                ENTITY_METADATA_KEY.to_string(),
                self.entity.clone(),
            )]),
            ..Default::default()
        }
    }

    /// Sign the token with an RSA private key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the key cannot sign RS256.
    #[instrument(skip_all)]
    pub fn sign(&self, key: &EncodingKey) -> Result<String, AuthError> {
        let mut header = Header::new(ACCEPTED_ALGORITHM);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.key_id.clone());

        let claims = self.claims_at(Utc::now().timestamp());

        encode(&header, &claims, key).map_err(|e| {
            tracing::error!(target: "web_oauth.issuer", error = %e, "Token signing failed");
            AuthError::Signing(format!("JWT signing operation failed: {e}"))
        })
    }
}

/// Sign an access token the web OAuth handler will accept.
///
/// The token is RS256 with `kid` set to `key_id`, audience `aud`, issuer
/// `iss`, subject and `email` metadata set to `entity`, and no expiry.
///
/// # Errors
///
/// Returns `AuthError::Signing` if the key cannot sign RS256.
pub fn sign_web_auth_access_token(
    key: &EncodingKey,
    entity: &str,
    aud: &str,
    iss: &str,
    key_id: &str,
) -> Result<String, AuthError> {
    WebAuthTokenRequest::new(entity, aud, iss, key_id).sign(key)
}
