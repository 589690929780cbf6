//! Shared application state for Axum handlers.
//!
//! The state owns the allow-list validator (a single long-lived instance,
//! constructed once at process start and handed to request-handling code
//! by `Arc` - dependency injection rather than ambient globals) alongside
//! the configuration and the start instant.
//!
//! # Lifecycle
//!
//! `AppState::new` spawns the validator's background refresh schedule.
//! Call `shutdown()` before exit to stop it and wait for in-flight
//! fetches:
//!
//! ```rust,ignore
//! let state = AppState::new(config)?;
//! // ... serve ...
//! state.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::allowlist::IpAllowlist;
use crate::config::Config;
use crate::error::AppResult;

/// Shared application state for Axum handlers.
///
/// Cloned for each request handler; all internal data is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Allow-list validator (background-refreshed)
    pub allowlist: Arc<IpAllowlist>,
    /// Application configuration
    pub config: Arc<Config>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    /// Create application state and start the validator's refresh schedule.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Init` if the validator cannot be constructed.
    pub fn new(config: Config) -> AppResult<Self> {
        let allowlist = Arc::new(IpAllowlist::new(&config)?);
        allowlist.clone().start();

        Ok(Self {
            allowlist,
            config: Arc::new(config),
            started_at: Instant::now(),
        })
    }

    /// Gracefully shut down background work.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");
        self.allowlist.shutdown().await;
        info!("All background tasks have completed");
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
