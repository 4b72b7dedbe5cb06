//! Builder patterns for test data construction
//!
//! [`TestTokenBuilder`] starts from the token a well-behaved identity
//! provider would issue for [`TEST_ENTITY`] and lets each test break exactly
//! one thing about it.

use crate::crypto_fixtures::FixtureError;
use crate::test_ids::{TEST_AUDIENCE, TEST_ENTITY, TEST_ISSUER, TEST_KEY_ID_1, TEST_SUBJECT};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey};
use serde_json::{json, Map, Value};
use web_oauth::CREDENTIALS_TYPE_OAUTH_WEB;

/// Builder for signed test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .with_audience("svc-b")
///     .expires_in(3600)
///     .sign(&test_encoding_key(1)?)?;
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    header: Map<String, Value>,
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// A token for `u@example.com`, audience `svc-a`, issued now by `idp`
    /// under key `k1`, with no expiry.
    pub fn new() -> Self {
        let mut header = Map::new();
        header.insert("alg".to_string(), json!("RS256"));
        header.insert("typ".to_string(), json!("JWT"));
        header.insert("kid".to_string(), json!(TEST_KEY_ID_1));

        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("sub".to_string(), json!(TEST_SUBJECT));
        claims.insert("aud".to_string(), json!([TEST_AUDIENCE]));
        claims.insert("iat".to_string(), json!(Utc::now().timestamp()));
        claims.insert("rpc_creds_type".to_string(), json!(CREDENTIALS_TYPE_OAUTH_WEB));
        claims.insert("rpc_auth_md".to_string(), json!({ "email": TEST_ENTITY }));

        Self { header, claims }
    }

    /// Set the `kid` header
    pub fn with_key_id(self, kid: &str) -> Self {
        self.with_header("kid", json!(kid))
    }

    /// Set any header field, including non-string values
    pub fn with_header(mut self, name: &str, value: Value) -> Self {
        self.header.insert(name.to_string(), value);
        self
    }

    /// Remove a header field
    pub fn without_header(mut self, name: &str) -> Self {
        self.header.remove(name);
        self
    }

    /// Set a single audience
    pub fn with_audience(self, aud: &str) -> Self {
        self.with_claim("aud", json!([aud]))
    }

    /// Set the issuer
    pub fn with_issuer(self, iss: &str) -> Self {
        self.with_claim("iss", json!(iss))
    }

    /// Set the `email` metadata attribute
    pub fn with_email(self, email: &str) -> Self {
        self.with_claim("rpc_auth_md", json!({ "email": email }))
    }

    /// Drop the `email` metadata attribute, keeping the map
    pub fn without_email(self) -> Self {
        self.with_claim("rpc_auth_md", json!({}))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        let nbf = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("nbf", json!(nbf))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", json!(timestamp))
    }

    /// Set any claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// The claims as a JSON value
    pub fn claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with an RSA key using RS256, whatever the `alg` header says
    pub fn sign(&self, key: &EncodingKey) -> Result<String, FixtureError> {
        let message = self.signing_input()?;
        let signature = jsonwebtoken::crypto::sign(message.as_bytes(), key, Algorithm::RS256)
            .map_err(|e| FixtureError::Crypto(format!("Failed to sign test token: {e}")))?;
        Ok(format!("{message}.{signature}"))
    }

    /// Encode with a junk signature
    pub fn unsigned(&self) -> Result<String, FixtureError> {
        let message = self.signing_input()?;
        Ok(format!("{message}.{}", URL_SAFE_NO_PAD.encode(b"not-a-signature")))
    }

    fn signing_input(&self) -> Result<String, FixtureError> {
        let header = serde_json::to_vec(&self.header)
            .map_err(|e| FixtureError::Crypto(format!("Failed to encode header: {e}")))?;
        let claims = serde_json::to_vec(&self.claims)
            .map_err(|e| FixtureError::Crypto(format!("Failed to encode claims: {e}")))?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        ))
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
