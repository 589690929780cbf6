//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────────┐
//! │  Backend Key Auth    │ ← 401 in production (bypassed for /<app>, /__)
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │  Allow-list Enforce  │ ← 403 if not allow-listed (bypassed for /__)
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │       Tracing        │ ← HTTP request/response logging
//! └──────────┬───────────┘
//!            │
//!            ▼
//!        Handler
//! ```

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{AllowlistEnforce, BackendKeyAuth};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// # Middleware Configuration
///
/// - **Backend key auth**: enabled if any backend key is configured
/// - **Allow-list enforcement**: enabled if `ALLOWLIST_ENFORCE=true`
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let mut router = Router::new()
        // Internal endpoints (bypass both gates via the /__ prefix)
        .route("/__health", get(handlers::health_check))
        .route("/__ready", get(handlers::readiness_check));

    // Middleware is applied bottom to top: tracing innermost, then
    // enforcement, then the key gate outermost.
    router = router.layer(TraceLayer::new_for_http());

    if config.allowlist_enforce {
        info!("Allow-list enforcement enabled");
        router = router.layer(AllowlistEnforce::new(state.allowlist.clone()));
    } else {
        info!("Allow-list enforcement disabled (ALLOWLIST_ENFORCE=false)");
    }

    let auth_layer = BackendKeyAuth::from_config(config);
    if auth_layer.is_enabled() {
        info!(
            production = config.is_production(),
            "Backend key authentication enabled"
        );
        router = router.layer(auth_layer);
    }

    router.with_state(state)
}
