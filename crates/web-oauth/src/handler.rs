//! Auth handler for OAuth/OIDC access tokens signed by an external identity
//! provider.
//!
//! The handler validates the `aud` claim against the one audience it is
//! configured with, resolves signing keys through a [`KeyProvider`] keyed by
//! the token's `kid` header (so the provider can rotate keys freely), and
//! delegates the final entity decision to an [`EntityVerifier`].
//!
//! It never mints tokens through the live protocol path: access tokens come
//! from the identity provider.

use crate::claims::WebOAuthClaims;
use crate::config::Config;
use crate::entity::EntityVerifier;
use crate::errors::AuthError;
use crate::key_provider::KeyProvider;
use crate::rpc::{AuthContext, AuthHandler, CredentialsType};
use async_trait::async_trait;
use common::jwt::{UnverifiedHeader, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Credentials type for JWT access tokens signed by an OIDC/OAuth backend.
pub const CREDENTIALS_TYPE_OAUTH_WEB: &str = "oauth-web-auth";

/// The [`CredentialsType`] this handler is registered under.
pub fn oauth_web_credentials_type() -> CredentialsType {
    CredentialsType::new(CREDENTIALS_TYPE_OAUTH_WEB)
}

/// Options for the web OAuth handler.
///
/// `I` is the info type the entity verifier produces; it stays `()` until
/// [`WebOAuthOptions::with_entity_verifier`] sets a verifier.
pub struct WebOAuthOptions<I = ()> {
    /// Audience that must be within the `aud` claims presented.
    allowed_audience: String,

    /// Provides public keys to validate the JWT based on its `kid` header.
    key_provider: Arc<dyn KeyProvider>,

    entity_verifier: Option<Arc<dyn EntityVerifier<Info = I>>>,

    /// Tolerance for `iat`, `exp` and `nbf` checks.
    clock_skew: Duration,
}

impl<I> Clone for WebOAuthOptions<I> {
    fn clone(&self) -> Self {
        Self {
            allowed_audience: self.allowed_audience.clone(),
            key_provider: Arc::clone(&self.key_provider),
            entity_verifier: self.entity_verifier.clone(),
            clock_skew: self.clock_skew,
        }
    }
}

impl<I> fmt::Debug for WebOAuthOptions<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebOAuthOptions")
            .field("allowed_audience", &self.allowed_audience)
            .field("has_entity_verifier", &self.entity_verifier.is_some())
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl WebOAuthOptions {
    /// Options with no entity verifier and the default clock skew.
    pub fn new(allowed_audience: impl Into<String>, key_provider: Arc<dyn KeyProvider>) -> Self {
        Self {
            allowed_audience: allowed_audience.into(),
            key_provider,
            entity_verifier: None,
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    /// Options from loaded configuration.
    pub fn from_config(config: &Config, key_provider: Arc<dyn KeyProvider>) -> Self {
        Self::new(config.allowed_audience.clone(), key_provider)
            .with_clock_skew(config.clock_skew())
    }
}

impl<I> WebOAuthOptions<I> {
    /// Set the entity verifier that makes the final authorization decision.
    pub fn with_entity_verifier<V>(self, verifier: V) -> WebOAuthOptions<V::Info>
    where
        V: EntityVerifier + 'static,
    {
        let verifier: Arc<dyn EntityVerifier<Info = V::Info>> = Arc::new(verifier);
        WebOAuthOptions {
            allowed_audience: self.allowed_audience,
            key_provider: self.key_provider,
            entity_verifier: Some(verifier),
            clock_skew: self.clock_skew,
        }
    }

    /// Override the clock skew tolerance, capped at [`MAX_CLOCK_SKEW`].
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew.min(MAX_CLOCK_SKEW);
        self
    }

    /// The configured audience.
    pub fn allowed_audience(&self) -> &str {
        &self.allowed_audience
    }

    /// The configured clock skew tolerance.
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }
}

/// Auth handler validating externally issued OAuth/OIDC access tokens.
///
/// Holds nothing but its immutable options, so one instance serves any
/// number of concurrent verifications.
pub struct WebOAuthHandler<I = ()> {
    options: WebOAuthOptions<I>,
}

impl<I> fmt::Debug for WebOAuthHandler<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebOAuthHandler")
            .field("options", &self.options)
            .finish()
    }
}

impl<I> WebOAuthHandler<I> {
    /// Create a handler from its options.
    pub fn new(options: WebOAuthOptions<I>) -> Self {
        Self { options }
    }

    /// The credentials type tokens for this handler carry.
    pub fn credentials_type(&self) -> CredentialsType {
        oauth_web_credentials_type()
    }

    /// The handler's options.
    pub fn options(&self) -> &WebOAuthOptions<I> {
        &self.options
    }
}

/// Build a web OAuth handler ready to register with the RPC server.
///
/// Returns the credentials type to register it under alongside the shared
/// handler.
pub fn with_web_oauth_token_auth_handler<I>(
    options: WebOAuthOptions<I>,
) -> (CredentialsType, Arc<WebOAuthHandler<I>>) {
    tracing::info!(
        target: "web_oauth.handler",
        allowed_audience = %options.allowed_audience,
        has_entity_verifier = options.entity_verifier.is_some(),
        "Registering web OAuth auth handler"
    );
    (
        oauth_web_credentials_type(),
        Arc::new(WebOAuthHandler::new(options)),
    )
}

#[async_trait]
impl<I> AuthHandler for WebOAuthHandler<I>
where
    I: Send + Sync + 'static,
{
    type Claims = WebOAuthClaims;
    type EntityInfo = I;

    /// Always fails. Web OAuth expects the access token to be generated by
    /// a separate system.
    async fn authenticate(
        &self,
        _ctx: &AuthContext,
        _entity: &str,
        _payload: &str,
    ) -> Result<HashMap<String, String>, AuthError> {
        tracing::debug!(target: "web_oauth.handler", "Authenticate called on web OAuth handler");
        Err(AuthError::Unimplemented(
            "not implemented with webauth".to_string(),
        ))
    }

    /// Forward the entity to the configured verifier and return its result
    /// unmodified.
    #[instrument(skip_all)]
    async fn verify_entity(&self, ctx: &AuthContext, entity: &str) -> Result<I, AuthError> {
        let Some(verifier) = &self.options.entity_verifier else {
            tracing::error!(
                target: "web_oauth.handler",
                "No entity verifier configured for web OAuth handler"
            );
            return Err(AuthError::Configuration(
                "invalid verify entity configuration".to_string(),
            ));
        };

        ctx.run(verifier.verify_entity(ctx, entity)).await
    }

    fn create_claims(&self) -> WebOAuthClaims {
        WebOAuthClaims::with_clock_skew(
            self.options.allowed_audience.clone(),
            self.options.clock_skew,
        )
    }

    /// Resolve the RSA public key for the token's `kid` header.
    ///
    /// The header is unverified: it is used for this lookup and nothing
    /// else, and a missing or non-string `kid` never reaches the provider.
    /// An empty string is forwarded like any other key ID.
    #[instrument(skip_all)]
    async fn token_verification_key(
        &self,
        ctx: &AuthContext,
        header: &UnverifiedHeader,
    ) -> Result<DecodingKey, AuthError> {
        let key_id = header.key_id().ok_or_else(|| {
            tracing::debug!(target: "web_oauth.handler", "Token kid missing or not a string");
            AuthError::MalformedToken("kid not valid".to_string())
        })?;

        ctx.run(self.options.key_provider.lookup_key(ctx, key_id))
            .await
    }
}
