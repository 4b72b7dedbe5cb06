//! Contract between the RPC server and its authentication handlers.
//!
//! The RPC framework owns connections and credential-type dispatch. What it
//! needs from a handler is captured by [`AuthHandler`]; what it needs from the
//! claims a handler produces is captured by [`Claims`]. The token parsing
//! routine the server runs on every bearer token lives in [`verify`].

pub mod verify;

use crate::claims::JwtClaims;
use crate::errors::AuthError;
use async_trait::async_trait;
use common::jwt::UnverifiedHeader;
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub use verify::{verify_token, Authenticated, VerifiedClaims};

/// Names the auth scheme that issued a token.
///
/// The server routes bearer tokens to a handler by this value, and the
/// issuer stamps it into the `rpc_creds_type` claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialsType(String);

impl CredentialsType {
    /// Create a credentials type from any string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CredentialsType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Per-request context handed to every collaborator call.
///
/// Cancelling the token aborts any in-flight key lookup or entity
/// verification for the request with [`AuthError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    cancellation: CancellationToken,
    metadata: HashMap<String, String>,
}

impl AuthContext {
    /// Context with a fresh cancellation token and no metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context bound to a caller-owned cancellation token.
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            metadata: HashMap::new(),
        }
    }

    /// Attach request metadata (e.g. non-credential gRPC headers).
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Request metadata visible to collaborators.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// The cancellation token governing this request.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Drive `fut` to completion unless the context is cancelled first.
    ///
    /// Cancellation is checked before `fut` is first polled, so an already
    /// cancelled context never reaches the collaborator.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(AuthError::Cancelled),
            result = fut => result,
        }
    }
}

/// Claims produced by a handler for one verification attempt.
///
/// A fresh instance comes from [`AuthHandler::create_claims`], is filled from
/// the signature-verified payload, and must pass [`Claims::validate`] before
/// [`Claims::entity`] means anything. [`verify_token`] enforces that order.
pub trait Claims: Send + Sync + 'static {
    /// Replace the wire payload.
    fn set_payload(&mut self, payload: JwtClaims);

    /// The wire payload.
    fn payload(&self) -> &JwtClaims;

    /// The caller-identifying entity carried by the claims.
    ///
    /// # Errors
    ///
    /// Fails when the claims do not name an entity.
    fn entity(&self) -> Result<String, AuthError>;

    /// Semantic validation of the claims.
    ///
    /// # Errors
    ///
    /// Fails with the first check that does not pass.
    fn validate(&self) -> Result<(), AuthError>;
}

/// An authentication handler registered with the RPC server for one
/// credentials type.
#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Claims type produced per verification attempt.
    type Claims: Claims;

    /// Opaque identity information bound to the request after verification.
    type EntityInfo: Send + Sync + 'static;

    /// Exchange an entity and payload for token metadata through the live
    /// protocol path.
    async fn authenticate(
        &self,
        ctx: &AuthContext,
        entity: &str,
        payload: &str,
    ) -> Result<HashMap<String, String>, AuthError>;

    /// Decide whether `entity` may connect, returning info about it.
    async fn verify_entity(
        &self,
        ctx: &AuthContext,
        entity: &str,
    ) -> Result<Self::EntityInfo, AuthError>;

    /// A fresh, empty claims instance for one verification attempt.
    fn create_claims(&self) -> Self::Claims;

    /// Resolve the key that must have signed a token with this header.
    async fn token_verification_key(
        &self,
        ctx: &AuthContext,
        header: &UnverifiedHeader,
    ) -> Result<DecodingKey, AuthError>;
}
