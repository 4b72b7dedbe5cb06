//! Key selection by `kid` across several published keys.

use std::sync::Arc;
use web_oauth::{
    verify_token, AuthContext, AuthError, StaticKeyProvider, WebOAuthHandler, WebOAuthOptions,
};
use web_oauth_test_utils::*;

fn jwks_with_both_keys() -> Result<String, anyhow::Error> {
    Ok(serde_json::json!({
        "keys": [test_jwk_json(TEST_KEY_ID_1, 1)?, test_jwk_json(TEST_KEY_ID_2, 2)?]
    })
    .to_string())
}

fn handler_for(provider: StaticKeyProvider) -> WebOAuthHandler<String> {
    WebOAuthHandler::new(
        WebOAuthOptions::new(TEST_AUDIENCE, Arc::new(provider))
            .with_entity_verifier(MockEntityVerifier::accepting()),
    )
}

#[tokio::test]
async fn test_each_kid_selects_its_own_key() -> Result<(), anyhow::Error> {
    let handler = handler_for(StaticKeyProvider::from_jwks_json(&jwks_with_both_keys()?)?);

    for (kid, index) in [(TEST_KEY_ID_1, 1), (TEST_KEY_ID_2, 2)] {
        let token = TestTokenBuilder::new()
            .with_key_id(kid)
            .sign(&test_encoding_key(index)?)?;
        let authenticated = verify_token(&handler, &AuthContext::new(), &token).await?;
        assert_eq!(authenticated.entity, TEST_ENTITY);
    }
    Ok(())
}

#[tokio::test]
async fn test_kid_pointing_at_other_key_fails_signature() -> Result<(), anyhow::Error> {
    let handler = handler_for(StaticKeyProvider::from_jwks_json(&jwks_with_both_keys()?)?);
    let token = TestTokenBuilder::new()
        .with_key_id(TEST_KEY_ID_2)
        .sign(&test_encoding_key(1)?)?;

    let result = verify_token(&handler, &AuthContext::new(), &token).await;
    assert!(matches!(result, Err(AuthError::InvalidSignature)));
    Ok(())
}

#[tokio::test]
async fn test_retired_key_is_unknown() -> Result<(), anyhow::Error> {
    // Only key 2 is still published
    let provider = StaticKeyProvider::new()
        .with_rsa_pem(TEST_KEY_ID_2, TEST_RSA_PUBLIC_KEY_2_PEM.as_bytes())?;
    let handler = handler_for(provider);
    let token = TestTokenBuilder::new().sign(&test_encoding_key(1)?)?;

    let result = verify_token(&handler, &AuthContext::new(), &token).await;
    assert!(matches!(result, Err(AuthError::KeyLookup(_))));
    Ok(())
}

#[tokio::test]
async fn test_key_lookup_is_deterministic() -> Result<(), anyhow::Error> {
    let keys = Arc::new(MockKeyProvider::new().with_test_key(TEST_KEY_ID_1, 1)?);
    let handler = WebOAuthHandler::new(
        WebOAuthOptions::new(TEST_AUDIENCE, keys.clone())
            .with_entity_verifier(MockEntityVerifier::accepting()),
    );
    let token = TestTokenBuilder::new().sign(&test_encoding_key(1)?)?;

    for _ in 0..3 {
        assert!(verify_token(&handler, &AuthContext::new(), &token).await.is_ok());
    }
    assert_eq!(keys.requested_kids(), vec![TEST_KEY_ID_1.to_string(); 3]);
    Ok(())
}
