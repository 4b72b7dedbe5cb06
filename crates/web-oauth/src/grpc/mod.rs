//! gRPC integration for tonic servers.

pub mod auth_layer;

pub use auth_layer::{AuthenticatedEntity, WebOAuthLayer, WebOAuthService};
