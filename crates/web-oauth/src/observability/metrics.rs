//! Metrics definitions for web OAuth verification.
//!
//! All metrics follow Prometheus naming conventions:
//! - `web_oauth_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: `success`/`error` for validations, `hit`/`miss` for key lookups
//! - `error_category`: the fixed set returned by `AuthError::category`

use metrics::counter;

/// Record token validation result
///
/// Metric: `web_oauth_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!(
        "web_oauth_token_validations_total",
        "status" => status.to_string(),
        "error_category" => category.to_string()
    )
    .increment(1);
}

/// Record a key provider lookup outcome
///
/// Metric: `web_oauth_key_lookups_total`
/// Labels: `status`
pub fn record_key_lookup(status: &str) {
    counter!("web_oauth_key_lookups_total", "status" => status.to_string()).increment(1);
}
