//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with sensible
//! defaults for development. In production, configure via environment
//! variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `BACKEND_KEY` / `BACKEND_KEY_OLD`: when at least one is set, backend
//!   key authentication is enforced on every route outside the bypass
//!   prefixes. When neither is set the gate is disabled and the service is
//!   exposed directly - a warning is logged at startup.
//! - `ALLOWLIST_ENFORCE`: when `true`, requests from addresses outside the
//!   allow-list are rejected with 403. The validator itself always runs so
//!   application code can call it directly.

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Default URL serving the public CDN address ranges.
const DEFAULT_ALLOWLIST_URL: &str = "https://api.fastly.com/public-ip-list";

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    /// Application name. Requests under `/<app_name>` (hashed static
    /// assets) bypass backend key authentication.
    pub app_name: String,

    /// Deployment environment ("development", "production", ...).
    /// Only "production" rejects unauthenticated requests; elsewhere the
    /// gate logs and passes through so local development needs no keys.
    pub environment: String,

    // =========================================================================
    // Allow-List Configuration
    // =========================================================================
    /// URL returning `{"addresses": ["cidr", ...]}` on GET.
    pub allowlist_url: String,

    /// Interval between allow-list refresh ticks (default: 10 seconds).
    pub allowlist_refresh_interval: Duration,

    /// Per-request timeout for the allow-list fetch (default: 10 seconds).
    /// A hung fetch only delays its own tick; later ticks may overlap it.
    pub allowlist_fetch_timeout: Duration,

    /// Install the enforcement middleware that rejects requests from
    /// addresses outside the allow-list (default: false).
    pub allowlist_enforce: bool,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Current backend key (optional).
    pub backend_key: Option<String>,

    /// Previous backend key, accepted during rotation (optional).
    pub backend_key_old: Option<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if any value is invalid (non-numeric
    /// PORT, zero refresh interval, unparseable URL).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string()),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),

            // Allow-list
            allowlist_url: env::var("ALLOWLIST_URL")
                .unwrap_or_else(|_| DEFAULT_ALLOWLIST_URL.to_string()),
            allowlist_refresh_interval: Duration::from_millis(Self::parse_env(
                "ALLOWLIST_REFRESH_MS",
                10_000,
            )?),
            allowlist_fetch_timeout: Duration::from_secs(Self::parse_env(
                "ALLOWLIST_FETCH_TIMEOUT_SECS",
                10,
            )?),
            allowlist_enforce: Self::parse_env("ALLOWLIST_ENFORCE", false)?,

            // Security
            backend_key: env::var("BACKEND_KEY").ok().filter(|k| !k.is_empty()),
            backend_key_old: env::var("BACKEND_KEY_OLD").ok().filter(|k| !k.is_empty()),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if validation fails.
    fn validate(&self) -> AppResult<()> {
        if self.allowlist_refresh_interval.is_zero() {
            return Err(AppError::Config(
                "ALLOWLIST_REFRESH_MS must be greater than 0".to_string(),
            ));
        }

        if self.allowlist_fetch_timeout.is_zero() {
            return Err(AppError::Config(
                "ALLOWLIST_FETCH_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.allowlist_url.parse::<reqwest::Url>().is_err() {
            return Err(AppError::Config(format!(
                "ALLOWLIST_URL is not a valid URL: {}",
                self.allowlist_url
            )));
        }

        if self.app_name.is_empty() {
            return Err(AppError::Config("APP_NAME must not be empty".to_string()));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if the deployment environment is production.
    ///
    /// The backend key gate only rejects in production; the comparison is
    /// case-insensitive to tolerate "PRODUCTION"-style values.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Configured backend keys, current first.
    ///
    /// Empty when authentication is disabled.
    pub fn backend_keys(&self) -> Vec<String> {
        self.backend_key
            .iter()
            .chain(self.backend_key_old.iter())
            .cloned()
            .collect()
    }

    /// Check if backend key authentication is enabled.
    pub fn auth_enabled(&self) -> bool {
        self.backend_key.is_some() || self.backend_key_old.is_some()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            app_name: env!("CARGO_PKG_NAME").to_string(),
            environment: "development".to_string(),
            // Allow-list
            allowlist_url: DEFAULT_ALLOWLIST_URL.to_string(),
            allowlist_refresh_interval: Duration::from_secs(10),
            allowlist_fetch_timeout: Duration::from_secs(10),
            allowlist_enforce: false,
            // Security
            backend_key: None,
            backend_key_old: None,
            // Observability
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.allowlist_url, DEFAULT_ALLOWLIST_URL);
        assert_eq!(config.allowlist_refresh_interval, Duration::from_secs(10));
        assert!(!config.allowlist_enforce);
        assert!(config.backend_key.is_none());
    }

    #[test]
    fn test_server_addr_format() {
        let config = Config {
            host: "localhost".to_string(),
            port: 8080,
            ..Config::default()
        };

        assert_eq!(config.server_addr(), "localhost:8080");
    }

    #[test]
    fn test_is_production() {
        let config = Config::default();
        assert!(!config.is_production());

        let config = Config {
            environment: "PRODUCTION".to_string(),
            ..Config::default()
        };
        assert!(config.is_production());
    }

    #[test]
    fn test_backend_keys_order() {
        let config = Config {
            backend_key: Some("current".to_string()),
            backend_key_old: Some("old".to_string()),
            ..Config::default()
        };

        assert_eq!(config.backend_keys(), vec!["current", "old"]);
        assert!(config.auth_enabled());
    }

    #[test]
    fn test_auth_disabled_without_keys() {
        let config = Config::default();
        assert!(!config.auth_enabled());
        assert!(config.backend_keys().is_empty());
    }

    #[test]
    fn test_validate_zero_refresh_interval() {
        let config = Config {
            allowlist_refresh_interval: Duration::ZERO,
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("ALLOWLIST_REFRESH_MS")
        );
    }

    #[test]
    fn test_validate_bad_url() {
        let config = Config {
            allowlist_url: "not a url".to_string(),
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }
}
