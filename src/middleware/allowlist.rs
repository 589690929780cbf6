//! Allow-list enforcement middleware.
//!
//! Extracts the client address from proxy headers and consults the shared
//! [`IpAllowlist`]. Requests from addresses outside the active rule set
//! are rejected with `403`; internal endpoints under `/__` are exempt so
//! probes keep working when the edge is misconfigured.
//!
//! The layer is opt-in (`ALLOWLIST_ENFORCE`); the validator runs either
//! way, and application code can call
//! [`IpAllowlist::validate`](crate::allowlist::IpAllowlist::validate)
//! directly where a middleware-wide gate is too blunt.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::ip::extract_client_ip;
use crate::allowlist::IpAllowlist;
use crate::metrics::record_allowlist_denied;

/// Prefix of internal endpoints that bypass enforcement.
const INTERNAL_PREFIX: &str = "/__";

/// Allow-list enforcement layer.
#[derive(Clone)]
pub struct AllowlistEnforce {
    allowlist: Arc<IpAllowlist>,
}

impl AllowlistEnforce {
    /// Create an enforcement layer over a shared validator.
    pub fn new(allowlist: Arc<IpAllowlist>) -> Self {
        Self { allowlist }
    }
}

impl<S> Layer<S> for AllowlistEnforce {
    type Service = AllowlistEnforceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AllowlistEnforceService {
            inner,
            allowlist: self.allowlist.clone(),
        }
    }
}

/// Allow-list enforcement service wrapper.
#[derive(Clone)]
pub struct AllowlistEnforceService<S> {
    inner: S,
    allowlist: Arc<IpAllowlist>,
}

impl<S> Service<Request<Body>> for AllowlistEnforceService<S>
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
        let allowlist = self.allowlist.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = req.uri().path();
            if path.starts_with(INTERNAL_PREFIX) {
                debug!(path, "Bypassing allow-list enforcement");
                return inner.call(req).await;
            }

            let client_ip = extract_client_ip(&req);
            if allowlist.validate(&client_ip) {
                return inner.call(req).await;
            }

            record_allowlist_denied();
            warn!(
                client_ip = %client_ip,
                path = %req.uri().path(),
                "Request address is not allow-listed"
            );
            Ok(forbidden_response())
        })
    }
}

/// Build a forbidden (403) response.
fn forbidden_response() -> Response<Body> {
    (
        StatusCode::FORBIDDEN,
        [("Content-Type", "application/json")],
        r#"{"error":"forbidden","message":"Client address is not allow-listed"}"#,
    )
        .into_response()
}
