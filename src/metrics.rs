//! Prometheus metrics for edge-protection observability.
//!
//! Metrics are exposed via a dedicated HTTP endpoint (default: `:9090`).
//!
//! # Available Metrics
//!
//! ## Allow-list counters
//! - `perimeter_allowlist_fetch_success_total` - Well-formed refresh responses
//! - `perimeter_allowlist_fetch_fail_total` - Transport/status/JSON failures
//! - `perimeter_allowlist_update_total` - Rule-set replacements (content changed)
//! - `perimeter_allowlist_unrecognised_total` - Responses with a bad `addresses` shape
//! - `perimeter_allowlist_denied_total` - Requests rejected by the enforcement layer
//!
//! ## Backend authentication counters
//! - `perimeter_backend_auth_key_total` - Requests accepted with the current key
//! - `perimeter_backend_auth_old_key_total` - Requests accepted with the rotation key
//! - `perimeter_backend_auth_fail_total` - Requests with a missing or invalid key
//!
//! # Usage
//!
//! ```rust,ignore
//! use perimeter::metrics::{init_metrics, record_fetch_success};
//!
//! // Initialize metrics (call once at startup)
//! init_metrics(addr)?;
//!
//! // Record events as they happen
//! record_fetch_success();
//! ```

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const ALLOWLIST_FETCH_SUCCESS_TOTAL: &str = "perimeter_allowlist_fetch_success_total";
    pub const ALLOWLIST_FETCH_FAIL_TOTAL: &str = "perimeter_allowlist_fetch_fail_total";
    pub const ALLOWLIST_UPDATE_TOTAL: &str = "perimeter_allowlist_update_total";
    pub const ALLOWLIST_UNRECOGNISED_TOTAL: &str = "perimeter_allowlist_unrecognised_total";
    pub const ALLOWLIST_DENIED_TOTAL: &str = "perimeter_allowlist_denied_total";
    pub const BACKEND_AUTH_KEY_TOTAL: &str = "perimeter_backend_auth_key_total";
    pub const BACKEND_AUTH_OLD_KEY_TOTAL: &str = "perimeter_backend_auth_old_key_total";
    pub const BACKEND_AUTH_FAIL_TOTAL: &str = "perimeter_backend_auth_fail_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// This sets up metric descriptions and starts the Prometheus HTTP listener
/// on the specified address.
///
/// # Errors
///
/// Returns `Err` with a message if the exporter cannot be installed.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::ALLOWLIST_FETCH_SUCCESS_TOTAL,
        "Total number of well-formed allow-list refresh responses"
    );
    describe_counter!(
        names::ALLOWLIST_FETCH_FAIL_TOTAL,
        "Total number of allow-list fetches that failed in transport, status or JSON parsing"
    );
    describe_counter!(
        names::ALLOWLIST_UPDATE_TOTAL,
        "Total number of allow-list rule-set replacements"
    );
    describe_counter!(
        names::ALLOWLIST_UNRECOGNISED_TOTAL,
        "Total number of allow-list responses with an unrecognised shape"
    );
    describe_counter!(
        names::ALLOWLIST_DENIED_TOTAL,
        "Total number of requests rejected by allow-list enforcement"
    );
    describe_counter!(
        names::BACKEND_AUTH_KEY_TOTAL,
        "Total number of requests authenticated with the current backend key"
    );
    describe_counter!(
        names::BACKEND_AUTH_OLD_KEY_TOTAL,
        "Total number of requests authenticated with the rotation backend key"
    );
    describe_counter!(
        names::BACKEND_AUTH_FAIL_TOTAL,
        "Total number of requests with a missing or invalid backend key"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
///
/// This is useful for cases where metrics are optional.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

// =============================================================================
// Counter Recording Functions
// =============================================================================

/// Record a well-formed allow-list fetch.
pub fn record_fetch_success() {
    counter!(names::ALLOWLIST_FETCH_SUCCESS_TOTAL).increment(1);
}

/// Record a failed allow-list fetch (transport, status, or JSON parse).
pub fn record_fetch_fail() {
    counter!(names::ALLOWLIST_FETCH_FAIL_TOTAL).increment(1);
}

/// Record an allow-list rule-set replacement.
pub fn record_update() {
    counter!(names::ALLOWLIST_UPDATE_TOTAL).increment(1);
}

/// Record an allow-list response with an unrecognised shape.
pub fn record_unrecognised() {
    counter!(names::ALLOWLIST_UNRECOGNISED_TOTAL).increment(1);
}

/// Record a request rejected by allow-list enforcement.
pub fn record_allowlist_denied() {
    counter!(names::ALLOWLIST_DENIED_TOTAL).increment(1);
}

/// Record a request authenticated with the current backend key.
pub fn record_backend_key() {
    counter!(names::BACKEND_AUTH_KEY_TOTAL).increment(1);
}

/// Record a request authenticated with the rotation backend key.
pub fn record_old_backend_key() {
    counter!(names::BACKEND_AUTH_OLD_KEY_TOTAL).increment(1);
}

/// Record a request with a missing or invalid backend key.
pub fn record_backend_auth_fail() {
    counter!(names::BACKEND_AUTH_FAIL_TOTAL).increment(1);
}
