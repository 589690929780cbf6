//! # Perimeter
//!
//! Edge-protection middleware for Axum services behind a CDN:
//!
//! - **IP allow-listing**: a background-refreshed set of permitted CIDR
//!   ranges with bundled fallback data, lock-free containment checks, and
//!   an optional enforcement layer
//! - **Backend key authentication**: a constant-time shared-key gate with
//!   rotation support
//! - **Observability**: structured logging and Prometheus counters for
//!   every fetch, update, and authentication outcome
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Backend Key Auth → Allow-list Enforce → Trace) │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (/__health, /__ready)                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  IpAllowlist (refresh task → atomic snapshot swap)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use perimeter::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config)?;
//!     let app = build_router(state);
//!
//!     // Serve the app...
//!     Ok(())
//! }
//! ```
//!
//! The validator can also be used on its own, without the router glue:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use perimeter::{Config, IpAllowlist};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let allowlist = Arc::new(IpAllowlist::new(&Config::default())?);
//! allowlist.clone().start();
//!
//! if allowlist.validate("203.0.113.10") {
//!     // permitted
//! }
//! # Ok(())
//! # }
//! ```

pub mod allowlist;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use allowlist::IpAllowlist;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
