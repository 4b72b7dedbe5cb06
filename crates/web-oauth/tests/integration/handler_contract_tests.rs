//! Handler operations called directly, the way the RPC server calls them
//! outside the token pipeline.

use std::sync::Arc;
use web_oauth::{
    entity_verifier_fn, with_web_oauth_token_auth_handler, AuthContext, AuthError, AuthHandler,
    Claims, Config, StaticKeyProvider, WebOAuthHandler, WebOAuthOptions,
    CREDENTIALS_TYPE_OAUTH_WEB,
};
use web_oauth_test_utils::*;

fn bare_handler() -> WebOAuthHandler {
    WebOAuthHandler::new(WebOAuthOptions::new(
        TEST_AUDIENCE,
        Arc::new(MockKeyProvider::new()),
    ))
}

#[tokio::test]
async fn test_authenticate_is_never_supported() {
    let verifier = Arc::new(MockEntityVerifier::accepting());
    let options = WebOAuthOptions::new(TEST_AUDIENCE, Arc::new(MockKeyProvider::new()))
        .with_entity_verifier(Arc::clone(&verifier));
    let handler = WebOAuthHandler::new(options);

    let result = handler
        .authenticate(&AuthContext::new(), TEST_ENTITY, "password")
        .await;

    assert!(matches!(result, Err(AuthError::Unimplemented(_))));
    assert_eq!(
        result.map_err(|e| e.to_status().code()),
        Err(tonic::Code::Unimplemented)
    );
    assert_eq!(verifier.call_count(), 0);
}

#[tokio::test]
async fn test_verify_entity_without_verifier() {
    let result = bare_handler()
        .verify_entity(&AuthContext::new(), TEST_ENTITY)
        .await;

    assert_eq!(
        result,
        Err(AuthError::Configuration(
            "invalid verify entity configuration".to_string()
        ))
    );
}

#[tokio::test]
async fn test_verify_entity_returns_verifier_info_unchanged() {
    let options = WebOAuthOptions::new(TEST_AUDIENCE, Arc::new(MockKeyProvider::new()))
        .with_entity_verifier(entity_verifier_fn(|ctx: AuthContext, entity: String| async move {
            let tenant = ctx.metadata().get("x-tenant").cloned().unwrap_or_default();
            Ok::<_, AuthError>((entity, tenant))
        }));
    let handler = WebOAuthHandler::new(options);

    let ctx = AuthContext::new().with_metadata(
        [("x-tenant".to_string(), "acme".to_string())].into_iter().collect(),
    );
    let info = handler.verify_entity(&ctx, TEST_ENTITY).await;

    assert_eq!(info, Ok((TEST_ENTITY.to_string(), "acme".to_string())));
}

#[test]
fn test_create_claims_validates_only_its_audience() {
    let handler = bare_handler();
    let mut claims = handler.create_claims();

    let now = chrono::Utc::now().timestamp();
    claims.set_payload(web_oauth::JwtClaims {
        aud: vec![TEST_AUDIENCE.to_string()],
        iat: Some(now),
        ..Default::default()
    });
    assert_eq!(claims.validate(), Ok(()));

    claims.set_payload(web_oauth::JwtClaims {
        aud: vec![TEST_OTHER_AUDIENCE.to_string()],
        iat: Some(now),
        ..Default::default()
    });
    assert_eq!(claims.validate(), Err(AuthError::AudienceMismatch));
}

#[test]
fn test_registration_pair() {
    let (creds, handler) = with_web_oauth_token_auth_handler(WebOAuthOptions::new(
        TEST_AUDIENCE,
        Arc::new(StaticKeyProvider::new()),
    ));

    assert_eq!(creds.as_str(), CREDENTIALS_TYPE_OAUTH_WEB);
    assert_eq!(handler.credentials_type(), creds);
    assert_eq!(handler.options().allowed_audience(), TEST_AUDIENCE);
}

#[test]
fn test_options_from_config() -> Result<(), anyhow::Error> {
    let vars = [
        ("WEB_OAUTH_ALLOWED_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
        ("JWT_CLOCK_SKEW_SECONDS".to_string(), "45".to_string()),
    ]
    .into_iter()
    .collect();
    let config = Config::from_vars(&vars)?;

    let options = WebOAuthOptions::from_config(&config, Arc::new(StaticKeyProvider::new()));

    assert_eq!(options.allowed_audience(), TEST_AUDIENCE);
    assert_eq!(options.clock_skew(), std::time::Duration::from_secs(45));
    Ok(())
}

#[tokio::test]
async fn test_handler_is_shareable_across_tasks() -> Result<(), anyhow::Error> {
    let keys = Arc::new(MockKeyProvider::new().with_test_key(TEST_KEY_ID_1, 1)?);
    let (_, handler) = with_web_oauth_token_auth_handler(
        WebOAuthOptions::new(TEST_AUDIENCE, keys.clone())
            .with_entity_verifier(MockEntityVerifier::accepting()),
    );
    let token = TestTokenBuilder::new().sign(&test_encoding_key(1)?)?;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let handler = Arc::clone(&handler);
        let token = token.clone();
        tasks.push(tokio::spawn(async move {
            web_oauth::verify_token(handler.as_ref(), &AuthContext::new(), &token)
                .await
                .map(|a| a.entity)
        }));
    }

    for task in tasks {
        assert_eq!(task.await?, Ok(TEST_ENTITY.to_string()));
    }
    assert_eq!(keys.call_count(), 8);
    Ok(())
}
