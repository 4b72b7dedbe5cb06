//! Web OAuth authentication for RPC servers.
//!
//! Verifies JWT access tokens issued by an external OAuth/OIDC identity
//! provider and binds the entity they name to the request.
//!
//! # Modules
//!
//! - `rpc` - Handler contract and the token verification pipeline
//! - `handler` - The web OAuth handler and its options
//! - `claims` - Wire claims and audience-bound validation
//! - `key_provider` - Verification key lookup by `kid`
//! - `entity` - Entity verification seam
//! - `issuer` - Token signing for tests and identity provider stand-ins
//! - `grpc` - Tower layer for tonic servers
//! - `config` - Environment configuration
//! - `errors` - Error types

pub mod claims;
pub mod config;
pub mod entity;
pub mod errors;
pub mod grpc;
pub mod handler;
pub mod issuer;
pub mod key_provider;
pub mod observability;
pub mod rpc;

pub use claims::{JwtClaims, WebOAuthClaims, ENTITY_METADATA_KEY};
pub use config::{Config, ConfigError};
pub use entity::{entity_verifier_fn, EntityVerifier, FnEntityVerifier};
pub use errors::AuthError;
pub use grpc::{AuthenticatedEntity, WebOAuthLayer, WebOAuthService};
pub use handler::{
    with_web_oauth_token_auth_handler, WebOAuthHandler, WebOAuthOptions,
    CREDENTIALS_TYPE_OAUTH_WEB,
};
pub use issuer::{sign_web_auth_access_token, WebAuthTokenRequest};
pub use key_provider::{KeyProvider, StaticKeyProvider};
pub use rpc::{
    verify_token, AuthContext, AuthHandler, Authenticated, Claims, CredentialsType, VerifiedClaims,
};
