//! Observability for web OAuth verification.
//!
//! Instrumented functions use `#[instrument(skip_all)]`. Tokens, keys and
//! entity values never appear as span fields. Error details stay in debug
//! level events on the server side.

pub mod metrics;

pub use metrics::{record_key_lookup, record_token_validation};
