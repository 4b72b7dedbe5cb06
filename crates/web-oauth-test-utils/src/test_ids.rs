//! Fixed test IDs for deterministic tests
//!
//! Every integration test speaks about the same service, identity provider
//! and user so failures are easy to compare.

// Audiences
pub const TEST_AUDIENCE: &str = "svc-a";
pub const TEST_OTHER_AUDIENCE: &str = "svc-b";

// Issuer
pub const TEST_ISSUER: &str = "idp";

// Subject (identity provider user ID) and entity
pub const TEST_SUBJECT: &str = "u123";
pub const TEST_ENTITY: &str = "u@example.com";

// Signing Key IDs
pub const TEST_KEY_ID_1: &str = "k1";
pub const TEST_KEY_ID_2: &str = "k2";
pub const TEST_KEY_ID_MISSING: &str = "k-missing";
