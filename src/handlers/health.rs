//! Health and readiness endpoints.
//!
//! # Endpoints
//!
//! - `GET /__health` - Health check with allow-list state
//! - `GET /__ready` - Kubernetes-compatible readiness probe
//!
//! Both live under the `/__` internal prefix, which bypasses backend key
//! authentication and allow-list enforcement.
//!
//! Readiness never depends on a successful allow-list fetch: the bundled
//! fallback data is authoritative until the first fetch lands, and a
//! fetch outage must not take the service out of rotation.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

/// Health check response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy"; degradation shows up in the allow-list fields
    pub status: String,
    /// Whether any allow-list refresh has succeeded yet
    pub allowlist_initialized: bool,
    /// Ranges in the active primary rule set
    pub allowlist_primary_rules: usize,
    /// Ranges in the always-included secondary rule set
    pub allowlist_secondary_rules: usize,
    pub uptime_seconds: u64,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check endpoint.
///
/// Always returns 200 OK with status details in the body. A validator
/// still serving fallback data is healthy: that is its designed degraded
/// mode, not an outage.
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        allowlist_initialized: state.allowlist.is_initialized(),
        allowlist_primary_rules: state.allowlist.primary_rule_count(),
        allowlist_secondary_rules: state.allowlist.secondary_rule_count(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint for load balancer and Kubernetes probes.
#[instrument]
pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}
