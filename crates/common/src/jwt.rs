//! JWT utilities shared by the web OAuth plugin.
//!
//! This module provides the pieces of token handling that happen before a
//! signature can be checked:
//! - Size limits for DoS prevention
//! - Clock skew constants for temporal claim validation
//! - Unverified header decoding (`kid` and `alg` lookup)
//! - iat validation logic
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Header values are attacker-controlled until the signature is verified.
//!   They are only good for choosing a key, never for trusting a caller.
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_unverified_header, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! let header = decode_unverified_header(token)?;
//! let kid = header.key_id().ok_or("missing kid")?;
//!
//! // After verifying the signature, validate iat
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any parsing or cryptographic
/// operations.
///
/// # Rationale
///
/// - An RS256 access token with a handful of registered claims and a small
///   metadata map is roughly 600-900 bytes
/// - 8KB leaves room for identity providers that pack extra claims
/// - Checked BEFORE base64 decode and signature verification
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Applied to `iat`, `exp` and `nbf` when comparing against the local clock.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Configuration above this value is rejected.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a token before signature checks.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Unverified Header
// =============================================================================

/// The decoded JOSE header of a token whose signature has NOT been checked.
///
/// Values are kept as raw JSON so that callers can distinguish a missing
/// field from one with the wrong type (e.g. a numeric `kid`).
#[derive(Debug, Clone, PartialEq)]
pub struct UnverifiedHeader {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl UnverifiedHeader {
    /// Build a header from already-decoded JSON fields.
    #[must_use]
    pub fn from_fields(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { fields }
    }

    /// The `kid` (key ID) header, if present and a string.
    ///
    /// An empty string is still a key ID; resolving it is the key source's
    /// decision.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.fields.get("kid").and_then(serde_json::Value::as_str)
    }

    /// The `alg` header, if present and a string.
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.fields.get("alg").and_then(serde_json::Value::as_str)
    }

    /// The `typ` header, if present and a string.
    #[must_use]
    pub fn typ(&self) -> Option<&str> {
        self.fields.get("typ").and_then(serde_json::Value::as_str)
    }

    /// Raw access to any header field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Decode a JWT header without verifying the signature.
///
/// This is used to look up the correct verification key when multiple keys
/// may be valid (e.g., during key rotation at the identity provider).
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The token MUST still be verified after fetching the key
///
/// # Errors
///
/// Returns `JwtValidationError` variants:
/// - `TokenTooLarge` - Token exceeds size limit (denial-of-service protection)
/// - `MalformedToken` - Token format invalid (wrong structure, bad base64,
///   invalid JSON, or a header that is not a JSON object)
pub fn decode_unverified_header(token: &str) -> Result<UnverifiedHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    match header {
        serde_json::Value::Object(fields) => Ok(UnverifiedHeader { fields }),
        _ => {
            tracing::debug!(target: "common.jwt", "JWT header is not a JSON object");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens with `iat` too far in the future, which could indicate
/// token pre-generation or a badly drifted identity provider clock.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
///
/// Prefer [`validate_iat`] when the wall clock is the reference. Claim
/// validation that already captured `now` uses this variant so that all
/// temporal checks agree on a single instant.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat > now + clock_skew`.
/// Skews above [`MAX_CLOCK_SKEW`] are clamped.
pub fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is clamped to MAX_CLOCK_SKEW (600 seconds), well within i64 range
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.min(MAX_CLOCK_SKEW).as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
