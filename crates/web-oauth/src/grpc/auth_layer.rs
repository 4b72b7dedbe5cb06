//! Tower layer authenticating gRPC requests with web OAuth bearer tokens.
//!
//! Extracts the Bearer token from the `authorization` metadata and runs it
//! through [`verify_token`] with the configured handler.
//!
//! # Security
//!
//! - Every request must carry a token the handler accepts
//! - All rejections return the same UNAUTHENTICATED status and message
//! - Rejection detail is logged at debug level only

use crate::errors::UNAUTHENTICATED_MESSAGE;
use crate::rpc::{verify_token, AuthContext, AuthHandler, CredentialsType};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::codegen::http;
use tonic::Status;
use tower::{Layer, Service};

const AUTHORIZATION_HEADER: &str = "authorization";

/// Identity of the authenticated caller, stored in request extensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedEntity<I> {
    /// Scheme the caller authenticated with.
    pub credentials_type: CredentialsType,
    /// Entity named by the token.
    pub entity: String,
    /// Info returned by the entity verifier.
    pub info: I,
}

/// Tower layer for web OAuth gRPC authentication.
pub struct WebOAuthLayer<H> {
    handler: Arc<H>,
    credentials_type: CredentialsType,
}

impl<H> Clone for WebOAuthLayer<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            credentials_type: self.credentials_type.clone(),
        }
    }
}

impl<H> fmt::Debug for WebOAuthLayer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebOAuthLayer")
            .field("credentials_type", &self.credentials_type)
            .finish_non_exhaustive()
    }
}

impl<H> WebOAuthLayer<H> {
    /// Create a layer from a registration pair.
    pub fn new(credentials_type: CredentialsType, handler: Arc<H>) -> Self {
        Self {
            handler,
            credentials_type,
        }
    }
}

impl<S, H> Layer<S> for WebOAuthLayer<H> {
    type Service = WebOAuthService<S, H>;

    fn layer(&self, inner: S) -> Self::Service {
        WebOAuthService {
            inner,
            handler: Arc::clone(&self.handler),
            credentials_type: self.credentials_type.clone(),
        }
    }
}

/// Tower service for web OAuth gRPC authentication.
pub struct WebOAuthService<S, H> {
    inner: S,
    handler: Arc<H>,
    credentials_type: CredentialsType,
}

impl<S: Clone, H> Clone for WebOAuthService<S, H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            handler: Arc::clone(&self.handler),
            credentials_type: self.credentials_type.clone(),
        }
    }
}

impl<S, H, ReqBody> Service<http::Request<ReqBody>> for WebOAuthService<S, H>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    H: AuthHandler + 'static,
    H::EntityInfo: Clone,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let mut inner = self.inner.clone();
        let handler = Arc::clone(&self.handler);
        let credentials_type = self.credentials_type.clone();

        Box::pin(async move {
            let Some(token) = bearer_token(req.headers()) else {
                return Ok(unauthenticated_response());
            };

            let ctx = AuthContext::new().with_metadata(request_metadata(req.headers()));

            let authenticated = match verify_token(handler.as_ref(), &ctx, &token).await {
                Ok(a) => a,
                Err(e) => {
                    tracing::debug!(target: "web_oauth.grpc", error = %e, "Request rejected");
                    return Ok(e.to_status().into_http());
                }
            };

            let (mut parts, body) = req.into_parts();
            parts.extensions.insert(AuthenticatedEntity {
                credentials_type,
                entity: authenticated.entity,
                info: authenticated.info,
            });
            let req = http::Request::from_parts(parts, body);

            inner.call(req).await
        })
    }
}

fn bearer_token(headers: &http::HeaderMap) -> Option<String> {
    let Some(value) = headers.get(AUTHORIZATION_HEADER) else {
        tracing::debug!(target: "web_oauth.grpc", "Missing authorization header");
        return None;
    };

    let Ok(value) = value.to_str() else {
        tracing::debug!(target: "web_oauth.grpc", "Invalid authorization header encoding");
        return None;
    };

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Some(token.to_string()),
        _ => {
            tracing::debug!(target: "web_oauth.grpc", "Invalid authorization format");
            None
        }
    }
}

fn request_metadata(headers: &http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| name.as_str() != AUTHORIZATION_HEADER)
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn unauthenticated_response() -> http::Response<BoxBody> {
    Status::unauthenticated(UNAUTHENTICATED_MESSAGE).into_http()
}
