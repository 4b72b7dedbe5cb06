//! Mock collaborators for the web OAuth handler
//!
//! Both mocks count calls so tests can prove a step was (or was not)
//! reached.

use crate::crypto_fixtures::{test_decoding_key, FixtureError};
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use web_oauth::{AuthContext, AuthError, EntityVerifier, KeyProvider};

/// How [`MockKeyProvider`] answers lookups
#[derive(Debug, Clone)]
pub enum KeyProviderMode {
    /// Serve the configured keys, failing on unknown kids
    Serve,
    /// Fail every lookup with this error
    Fail(AuthError),
    /// Never complete
    Hang,
}

/// Key provider over fixed keys that records every lookup
pub struct MockKeyProvider {
    keys: HashMap<String, DecodingKey>,
    mode: KeyProviderMode,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl MockKeyProvider {
    /// Empty provider; every lookup misses
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
            mode: KeyProviderMode::Serve,
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Serve test keypair `index` under `kid`
    pub fn with_test_key(mut self, kid: &str, index: u8) -> Result<Self, FixtureError> {
        self.keys.insert(kid.to_string(), test_decoding_key(index)?);
        Ok(self)
    }

    /// Switch answering mode
    pub fn with_mode(mut self, mode: KeyProviderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of lookups received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Kids requested, in order
    pub fn requested_kids(&self) -> Vec<String> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for MockKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyProvider for MockKeyProvider {
    async fn lookup_key(&self, _ctx: &AuthContext, kid: &str) -> Result<DecodingKey, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(kid.to_string());
        }

        match &self.mode {
            KeyProviderMode::Serve => self
                .keys
                .get(kid)
                .cloned()
                .ok_or_else(|| AuthError::KeyLookup(format!("unknown kid {kid}"))),
            KeyProviderMode::Fail(e) => Err(e.clone()),
            KeyProviderMode::Hang => std::future::pending().await,
        }
    }
}

/// Entity verifier that accepts or rejects every entity
///
/// On acceptance the info is the entity itself.
pub struct MockEntityVerifier {
    reject_with: Option<AuthError>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockEntityVerifier {
    /// Accept every entity
    pub fn accepting() -> Self {
        Self {
            reject_with: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Reject every entity with `error`
    pub fn rejecting(error: AuthError) -> Self {
        Self {
            reject_with: Some(error),
            ..Self::accepting()
        }
    }

    /// Number of verifications received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Entities verified, in order
    pub fn seen_entities(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EntityVerifier for MockEntityVerifier {
    type Info = String;

    async fn verify_entity(&self, _ctx: &AuthContext, entity: &str) -> Result<String, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(entity.to_string());
        }

        match &self.reject_with {
            Some(e) => Err(e.clone()),
            None => Ok(entity.to_string()),
        }
    }
}
