//! Verification key lookup by key ID.
//!
//! Fetching and caching keys from an identity provider's JWKS endpoint is
//! the key provider's business, not the handler's. The handler only ever
//! calls [`KeyProvider::lookup_key`] with the `kid` from a token header.
//!
//! [`StaticKeyProvider`] serves a fixed key set, loaded from PEM or from a
//! JWKS document, for deployments that pin keys and for tests.

use crate::errors::AuthError;
use crate::observability::metrics::record_key_lookup;
use crate::rpc::AuthContext;
use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::fmt;

/// Resolves a key ID to a public verification key.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Look up the verification key for `kid`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyLookup` if the key is unknown or cannot be
    /// fetched.
    async fn lookup_key(&self, ctx: &AuthContext, kid: &str) -> Result<DecodingKey, AuthError>;
}

/// Key provider over a fixed key set.
#[derive(Clone, Default)]
pub struct StaticKeyProvider {
    keys: HashMap<String, DecodingKey>,
}

impl fmt::Debug for StaticKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        kids.sort_unstable();
        f.debug_struct("StaticKeyProvider")
            .field("kids", &kids)
            .finish()
    }
}

impl StaticKeyProvider {
    /// Empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the key for `kid`.
    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }

    /// Add an RSA public key in PEM format under `kid`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the PEM is not an RSA public key.
    pub fn with_rsa_pem(self, kid: impl Into<String>, pem: &[u8]) -> Result<Self, AuthError> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| {
            AuthError::Configuration(format!("invalid RSA public key PEM: {e}"))
        })?;
        Ok(self.with_key(kid, key))
    }

    /// Build a key set from a JWKS JSON document.
    ///
    /// RSA keys with a `kid` are loaded. Other entries are skipped with a
    /// warning since they can never verify an RS256 token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the document is not a JWKS or
    /// an RSA key has unusable components.
    pub fn from_jwks_json(json: &str) -> Result<Self, AuthError> {
        let jwks: JwkSet = serde_json::from_str(json)
            .map_err(|e| AuthError::Configuration(format!("invalid JWKS document: {e}")))?;

        let mut provider = Self::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.as_deref() else {
                tracing::warn!(target: "web_oauth.keys", "Skipping JWK without kid");
                continue;
            };

            match &jwk.algorithm {
                AlgorithmParameters::RSA(rsa) => {
                    let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e).map_err(|e| {
                        AuthError::Configuration(format!("invalid RSA JWK {kid}: {e}"))
                    })?;
                    provider.keys.insert(kid.to_string(), key);
                }
                _ => {
                    tracing::warn!(target: "web_oauth.keys", kid = %kid, "Skipping non-RSA JWK");
                }
            }
        }

        tracing::info!(
            target: "web_oauth.keys",
            key_count = provider.len(),
            "Loaded static key set"
        );
        Ok(provider)
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the key set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether a key is held for `kid`.
    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn lookup_key(&self, _ctx: &AuthContext, kid: &str) -> Result<DecodingKey, AuthError> {
        match self.keys.get(kid) {
            Some(key) => {
                record_key_lookup("hit");
                Ok(key.clone())
            }
            None => {
                tracing::debug!(
                    target: "web_oauth.keys",
                    kid = %kid,
                    "Key not found in static key set"
                );
                record_key_lookup("miss");
                Err(AuthError::KeyLookup(format!("unknown kid {kid}")))
            }
        }
    }
}
