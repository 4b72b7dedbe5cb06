//! The tower layer in front of a gRPC service, with real signed tokens.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::codegen::http::{Request, Response};
use tower::{Layer, Service, ServiceExt};
use web_oauth::{
    with_web_oauth_token_auth_handler, AuthError, AuthenticatedEntity, WebOAuthHandler,
    WebOAuthLayer, WebOAuthOptions,
};
use web_oauth_test_utils::*;

/// Inner service that records the identity the layer attached.
#[derive(Clone, Default)]
struct RecordingService {
    seen: Arc<Mutex<Vec<AuthenticatedEntity<String>>>>,
}

impl<ReqBody> Service<Request<ReqBody>> for RecordingService
where
    ReqBody: Send + 'static,
{
    type Response = Response<BoxBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if let Some(identity) = req.extensions().get::<AuthenticatedEntity<String>>() {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(identity.clone());
            }
        }
        Box::pin(async move { Ok(Response::new(BoxBody::default())) })
    }
}

fn layer_with(
    verifier: MockEntityVerifier,
) -> Result<WebOAuthLayer<WebOAuthHandler<String>>, anyhow::Error> {
    let keys = Arc::new(MockKeyProvider::new().with_test_key(TEST_KEY_ID_1, 1)?);
    let (creds, handler) = with_web_oauth_token_auth_handler(
        WebOAuthOptions::new(TEST_AUDIENCE, keys).with_entity_verifier(verifier),
    );
    Ok(WebOAuthLayer::new(creds, handler))
}

fn request(token: &str) -> Result<Request<()>, anyhow::Error> {
    Ok(Request::builder()
        .header("authorization", format!("Bearer {token}"))
        .header("x-request-id", "req-1")
        .body(())?)
}

fn grpc_status(response: &Response<BoxBody>) -> Option<tonic::Status> {
    tonic::Status::from_header_map(response.headers())
}

#[tokio::test]
async fn test_valid_token_reaches_inner_service_with_identity() -> Result<(), anyhow::Error> {
    let inner = RecordingService::default();
    let service = layer_with(MockEntityVerifier::accepting())?.layer(inner.clone());
    let token = TestTokenBuilder::new().sign(&test_encoding_key(1)?)?;

    let response = service.oneshot(request(&token)?).await?;

    assert!(grpc_status(&response).is_none());
    let seen = inner.seen.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(seen.len(), 1);
    let Some(identity) = seen.first() else {
        anyhow::bail!("inner service saw no identity");
    };
    assert_eq!(identity.entity, TEST_ENTITY);
    assert_eq!(identity.info, TEST_ENTITY);
    assert_eq!(identity.credentials_type.as_str(), "oauth-web-auth");
    Ok(())
}

#[tokio::test]
async fn test_rejections_share_one_status() -> Result<(), anyhow::Error> {
    let key = test_encoding_key(1)?;
    let tokens = [
        TestTokenBuilder::new().with_audience(TEST_OTHER_AUDIENCE).sign(&key)?,
        TestTokenBuilder::new().with_key_id(TEST_KEY_ID_MISSING).sign(&key)?,
        TestTokenBuilder::new().without_email().sign(&key)?,
        TestTokenBuilder::new()
            .with_claim("rpc_creds_type", serde_json::json!("api-key"))
            .sign(&key)?,
        TestTokenBuilder::new().sign(&test_encoding_key(2)?)?,
        "not-a-jwt".to_string(),
    ];

    for token in tokens {
        let inner = RecordingService::default();
        let service = layer_with(MockEntityVerifier::accepting())?.layer(inner.clone());

        let response = service.oneshot(request(&token)?).await?;

        let status = grpc_status(&response).ok_or_else(|| anyhow::anyhow!("missing grpc-status"))?;
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert_eq!(status.message(), "Authentication required");
        assert!(inner.seen.lock().map(|s| s.is_empty()).unwrap_or(false));
    }
    Ok(())
}

#[tokio::test]
async fn test_entity_rejection_blocks_request() -> Result<(), anyhow::Error> {
    let inner = RecordingService::default();
    let service = layer_with(MockEntityVerifier::rejecting(AuthError::EntityVerification(
        "suspended".to_string(),
    )))?
    .layer(inner.clone());
    let token = TestTokenBuilder::new().sign(&test_encoding_key(1)?)?;

    let response = service.oneshot(request(&token)?).await?;

    let status = grpc_status(&response).ok_or_else(|| anyhow::anyhow!("missing grpc-status"))?;
    assert_eq!(status.code(), tonic::Code::Unauthenticated);
    assert_eq!(status.message(), "Authentication required");
    Ok(())
}
