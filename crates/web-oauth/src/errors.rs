//! Web OAuth error types.
//!
//! Every variant carries enough detail for server-side logs and tests, but
//! none of that detail reaches the remote caller: [`AuthError::to_status`]
//! collapses all rejections into a single `UNAUTHENTICATED` status so that a
//! client cannot learn which check failed.

use common::jwt::JwtValidationError;
use thiserror::Error;
use tonic::Status;

/// Message returned to remote callers for every rejected token.
pub const UNAUTHENTICATED_MESSAGE: &str = "Authentication required";

/// Web OAuth error type.
///
/// Maps to gRPC status codes:
/// - Unimplemented: UNIMPLEMENTED
/// - everything else: UNAUTHENTICATED with a fixed message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Deployment or programming defect (e.g. no entity verifier configured).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token structure or header is unusable (bad encoding, missing `kid`,
    /// unsupported algorithm).
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Claims lack the metadata attribute that names the entity.
    #[error("Missing required attribute: {0}")]
    MissingEntityAttribute(String),

    /// Token is scoped to a different consumer.
    #[error("invalid aud")]
    AudienceMismatch,

    /// Base claim validation failed (expired, not yet valid, iat problems).
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    /// Signature did not verify against the resolved key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The key provider could not resolve the key ID.
    #[error("Key lookup failed: {0}")]
    KeyLookup(String),

    /// The entity verifier rejected or failed on the entity.
    #[error("Entity verification failed: {0}")]
    EntityVerification(String),

    /// Token signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The operation is not offered by this scheme.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// The caller's context was cancelled while waiting on a collaborator.
    #[error("Request cancelled")]
    Cancelled,
}

impl AuthError {
    /// Bounded metric label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) => "configuration",
            AuthError::MalformedToken(_) | AuthError::MissingEntityAttribute(_) => "malformed",
            AuthError::AudienceMismatch => "audience",
            AuthError::InvalidClaims(_) => "claims",
            AuthError::InvalidSignature => "signature",
            AuthError::KeyLookup(_) => "key_lookup",
            AuthError::EntityVerification(_) => "entity",
            AuthError::Signing(_) => "signing",
            AuthError::Unimplemented(_) => "unimplemented",
            AuthError::Cancelled => "cancelled",
        }
    }

    /// Convert to the status reported to the remote caller.
    ///
    /// Configuration defects are logged at error level here since this is
    /// the last point where the detail is still available.
    pub fn to_status(&self) -> Status {
        match self {
            AuthError::Unimplemented(msg) => Status::unimplemented(msg.clone()),
            AuthError::Configuration(msg) => {
                tracing::error!(
                    target: "web_oauth.errors",
                    error = %msg,
                    "Auth handler misconfigured"
                );
                Status::unauthenticated(UNAUTHENTICATED_MESSAGE)
            }
            _ => Status::unauthenticated(UNAUTHENTICATED_MESSAGE),
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge => {
                AuthError::MalformedToken("token exceeds size limit".to_string())
            }
            JwtValidationError::MalformedToken => {
                AuthError::MalformedToken("invalid token format".to_string())
            }
            JwtValidationError::IatTooFarInFuture => {
                AuthError::InvalidClaims("iat too far in the future".to_string())
            }
        }
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        err.to_status()
    }
}
