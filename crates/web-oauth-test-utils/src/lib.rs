//! # Web OAuth Test Utilities
//!
//! Shared test utilities for the web OAuth handler.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed RSA keys for reproducible tests)
//! - Token builders (TestTokenBuilder)
//! - Mock key providers and entity verifiers with call counting
//! - Fixed test IDs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use web_oauth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let provider = MockKeyProvider::new().with_test_key(TEST_KEY_ID_1, 1)?;
//!     let token = TestTokenBuilder::new()
//!         .with_audience(TEST_AUDIENCE)
//!         .sign(&test_encoding_key(1)?)?;
//! }
//! ```

pub mod crypto_fixtures;
pub mod mocks;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use mocks::*;
pub use test_ids::*;
pub use token_builders::*;
