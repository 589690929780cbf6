//! Backend key authentication middleware.
//!
//! Services behind the CDN share a secret key; the edge injects it into
//! every origin request. A request carrying a configured key passes, and
//! key rotation is supported by accepting the previous key through a
//! second header while edges converge.
//!
//! # Behavior
//!
//! - Paths under `/<app-name>` (hashed static assets) or `/__` (health,
//!   readiness, metrics) bypass the gate so probes and asset fetches work
//!   without a key.
//! - With no configured keys the gate is disabled entirely and a warning
//!   is logged: the service is exposed directly to the internet.
//! - Key comparison is constant-time (`subtle`) to prevent timing attacks.
//! - Rejection only happens in production; in development an
//!   unauthenticated request is marked and passed through.
//!
//! Every response is stamped with `X-Backend-Authentication: true|false`
//! so the edge can observe the authentication outcome.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::config::Config;
use crate::metrics::{record_backend_auth_fail, record_backend_key, record_old_backend_key};

/// Header carrying the current backend key.
pub const BACKEND_KEY_HEADER: &str = "x-backend-key";

/// Header carrying the previous backend key during rotation.
pub const BACKEND_KEY_OLD_HEADER: &str = "x-backend-key-old";

/// Response header recording the authentication outcome for the edge.
pub const BACKEND_AUTH_RESULT_HEADER: &str = "x-backend-authentication";

/// Prefix of internal endpoints (health, readiness) that bypass the gate.
const INTERNAL_PREFIX: &str = "/__";

/// Backend key authentication layer.
///
/// When no keys are configured, all requests are allowed (gate disabled).
#[derive(Clone)]
pub struct BackendKeyAuth {
    /// Accepted keys, current first (empty = gate disabled)
    keys: Arc<Vec<String>>,
    /// Static asset prefix (`/<app-name>`) that bypasses the gate
    asset_prefix: Arc<String>,
    /// Whether unauthenticated requests are rejected (production) or
    /// marked and passed through (development)
    reject: bool,
}

impl BackendKeyAuth {
    /// Create a backend key auth layer.
    ///
    /// # Arguments
    ///
    /// * `keys` - Accepted keys, current first; empty disables the gate
    /// * `app_name` - Application name forming the asset bypass prefix
    /// * `reject` - Reject unauthenticated requests (production behavior)
    pub fn new(keys: Vec<String>, app_name: &str, reject: bool) -> Self {
        if keys.is_empty() {
            warn!(
                "Backend authentication is disabled, this app is exposed directly to the \
                 internet. To enable, configure BACKEND_KEY"
            );
        }

        Self {
            keys: Arc::new(keys),
            asset_prefix: Arc::new(format!("/{app_name}")),
            reject,
        }
    }

    /// Create the layer from application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.backend_keys(),
            &config.app_name,
            config.is_production(),
        )
    }

    /// Check if the gate is enabled.
    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }
}

impl<S> Layer<S> for BackendKeyAuth {
    type Service = BackendKeyAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BackendKeyAuthService {
            inner,
            keys: self.keys.clone(),
            asset_prefix: self.asset_prefix.clone(),
            reject: self.reject,
        }
    }
}

/// Backend key authentication service wrapper.
#[derive(Clone)]
pub struct BackendKeyAuthService<S> {
    inner: S,
    keys: Arc<Vec<String>>,
    asset_prefix: Arc<String>,
    reject: bool,
}

impl<S> Service<Request<Body>> for BackendKeyAuthService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let keys = self.keys.clone();
        let asset_prefix = self.asset_prefix.clone();
        let reject = self.reject;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // No keys configured: the gate is disabled
            if keys.is_empty() {
                return inner.call(req).await;
            }

            // Static assets and internal endpoints pass without a key
            let path = req.uri().path();
            if path.starts_with(asset_prefix.as_str()) || path.starts_with(INTERNAL_PREFIX) {
                debug!(path, "Bypassing backend authentication");
                return inner.call(req).await;
            }

            // Current key header first, then the rotation header; both are
            // checked against the full key list
            if header_matches(&req, BACKEND_KEY_HEADER, &keys) {
                record_backend_key();
                let mut response = inner.call(req).await?;
                mark_authenticated(&mut response, true);
                return Ok(response);
            }

            if header_matches(&req, BACKEND_KEY_OLD_HEADER, &keys) {
                record_old_backend_key();
                let mut response = inner.call(req).await?;
                mark_authenticated(&mut response, true);
                return Ok(response);
            }

            record_backend_auth_fail();
            warn!(path = %req.uri().path(), "Request failed backend key authentication");

            if reject {
                // The body text is load-bearing: the CDN keys
                // stale-if-error handling off it when key synchronisation
                // between edge and origin breaks.
                let mut response =
                    (StatusCode::UNAUTHORIZED, "Invalid Backend Key").into_response();
                mark_authenticated(&mut response, false);
                return Ok(response);
            }

            // Development: mark and pass through
            let mut response = inner.call(req).await?;
            mark_authenticated(&mut response, false);
            Ok(response)
        })
    }
}

/// Check a request header against all accepted keys in constant time.
fn header_matches<B>(req: &Request<B>, header: &str, keys: &[String]) -> bool {
    let Some(value) = req.headers().get(header).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    keys.iter()
        .any(|key| bool::from(value.as_bytes().ct_eq(key.as_bytes())))
}

/// Stamp the authentication outcome on a response.
fn mark_authenticated(response: &mut Response<Body>, authenticated: bool) {
    let value = if authenticated { "true" } else { "false" };
    response
        .headers_mut()
        .insert(BACKEND_AUTH_RESULT_HEADER, HeaderValue::from_static(value));
}
