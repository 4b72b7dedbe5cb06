//! Bearer token verification pipeline.
//!
//! The server runs this for every incoming token, calling into the
//! registered [`AuthHandler`] at each step:
//!
//! 1. Size check and unverified header decode
//! 2. `create_claims` - one fresh claims instance per attempt
//! 3. `token_verification_key` - resolve the key named by the `kid` header
//! 4. RS256 signature verification
//! 5. `Claims::validate` - audience, then base temporal checks
//! 6. `Claims::entity` and `verify_entity`
//!
//! Any failure ends the attempt. Nothing after a failed step runs.

use super::{AuthContext, AuthHandler, Claims};
use crate::claims::JwtClaims;
use crate::errors::AuthError;
use crate::observability::metrics::record_token_validation;
use common::jwt::decode_unverified_header;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use std::collections::HashSet;
use tracing::instrument;

/// The only signing algorithm accepted for bearer tokens.
pub const ACCEPTED_ALGORITHM: Algorithm = Algorithm::RS256;

/// Claims that have passed signature verification and [`Claims::validate`].
///
/// Only [`verify_token`] can construct this, so holding one proves the
/// checks ran.
#[derive(Debug, Clone)]
pub struct VerifiedClaims<C> {
    claims: C,
}

impl<C: Claims> VerifiedClaims<C> {
    /// The entity named by the validated claims.
    ///
    /// # Errors
    ///
    /// Fails when the claims do not carry an entity attribute.
    pub fn entity(&self) -> Result<String, AuthError> {
        self.claims.entity()
    }

    /// The validated claims.
    pub fn claims(&self) -> &C {
        &self.claims
    }

    /// Unwrap into the inner claims.
    pub fn into_inner(self) -> C {
        self.claims
    }
}

/// Successful outcome of [`verify_token`].
#[derive(Debug, Clone)]
pub struct Authenticated<C, I> {
    /// The verified claims.
    pub claims: VerifiedClaims<C>,
    /// The entity extracted from the claims.
    pub entity: String,
    /// Opaque info returned by the handler's entity verification.
    pub info: I,
}

/// Verify a bearer token with `handler`.
///
/// # Errors
///
/// Returns the first failing step's [`AuthError`]. Callers facing a remote
/// peer should report it through [`AuthError::to_status`].
#[instrument(skip_all)]
pub async fn verify_token<H>(
    handler: &H,
    ctx: &AuthContext,
    token: &str,
) -> Result<Authenticated<H::Claims, H::EntityInfo>, AuthError>
where
    H: AuthHandler + ?Sized,
{
    let result = run_pipeline(handler, ctx, token).await;

    match &result {
        Ok(_) => {
            tracing::debug!(target: "web_oauth.verify", "Token verified");
            record_token_validation("success", None);
        }
        Err(e) => {
            tracing::debug!(target: "web_oauth.verify", error = %e, "Token rejected");
            record_token_validation("error", Some(e.category()));
        }
    }

    result
}

async fn run_pipeline<H>(
    handler: &H,
    ctx: &AuthContext,
    token: &str,
) -> Result<Authenticated<H::Claims, H::EntityInfo>, AuthError>
where
    H: AuthHandler + ?Sized,
{
    // 1. Header (includes size check via common::jwt)
    let header = decode_unverified_header(token)?;
    if header.alg() != Some("RS256") {
        tracing::debug!(
            target: "web_oauth.verify",
            alg = ?header.alg(),
            "Unsupported token algorithm"
        );
        return Err(AuthError::MalformedToken(
            "unsupported signing algorithm".to_string(),
        ));
    }

    // 2. Fresh claims for this attempt
    let mut claims = handler.create_claims();

    // 3. Resolve the verification key before looking at any claim
    let key = handler.token_verification_key(ctx, &header).await?;

    // 4. Signature only; temporal and audience checks belong to Claims::validate
    let mut validation = Validation::new(ACCEPTED_ALGORITHM);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let token_data = decode::<JwtClaims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(
            target: "web_oauth.verify",
            error = %e,
            "Token signature verification failed"
        );
        match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                AuthError::InvalidSignature
            }
            _ => AuthError::MalformedToken("token could not be decoded".to_string()),
        }
    })?;

    // 5. Semantic validation
    claims.set_payload(token_data.claims);
    claims.validate()?;
    let verified = VerifiedClaims { claims };

    // 6. Entity extraction and verification
    let entity = verified.entity()?;
    let info = handler.verify_entity(ctx, &entity).await?;

    Ok(Authenticated {
        claims: verified,
        entity,
        info,
    })
}
