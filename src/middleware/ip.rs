//! Client address extraction for middleware.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! These functions trust proxy-provided headers. Allow-list enforcement is
//! only meaningful when this service sits behind an edge that overwrites
//! (not appends to) `X-Forwarded-For` / `X-Real-IP`, with direct access
//! from the internet blocked. Requests with no extractable address share
//! the [`UNKNOWN_IP`] fallback, which never passes validation.

use std::borrow::Cow;

use axum::http::Request;

/// Fallback value when no client address can be determined.
///
/// Not parseable as an address, so it fails every containment check.
pub const UNKNOWN_IP: &str = "unknown";

/// Extract the client address from request headers.
///
/// Checks in order (returns first match):
/// 1. `X-Forwarded-For` header (first entry of the comma-separated list -
///    the original client, with later entries being intermediate proxies)
/// 2. `X-Real-IP` header
/// 3. Falls back to [`UNKNOWN_IP`]
///
/// Returns `Cow<'static, str>` - borrowed for the fallback (no
/// allocation), owned for actual addresses.
#[inline]
pub fn extract_client_ip<B>(req: &Request<B>) -> Cow<'static, str> {
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
    {
        return Cow::Owned(first.trim().to_string());
    }

    if let Some(real_ip) = req.headers().get("x-real-ip")
        && let Ok(value) = real_ip.to_str()
    {
        return Cow::Owned(value.trim().to_string());
    }

    Cow::Borrowed(UNKNOWN_IP)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_extract_from_xff_first_entry() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.50, 10.0.0.1, 172.16.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_extract_from_real_ip() {
        let req = Request::builder()
            .header("x-real-ip", "198.51.100.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "198.51.100.7");
    }

    #[test]
    fn test_xff_takes_priority() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.50")
            .header("x-real-ip", "198.51.100.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_whitespace_trimmed() {
        let req = Request::builder()
            .header("x-forwarded-for", "  203.0.113.50  , 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "203.0.113.50");
    }

    #[test]
    fn test_no_headers_is_unknown_and_borrowed() {
        let req = Request::builder().body(Body::empty()).unwrap();

        let ip = extract_client_ip(&req);
        assert_eq!(ip, UNKNOWN_IP);
        assert!(matches!(ip, Cow::Borrowed(_)));
    }

    #[test]
    fn test_v4_mapped_v6_passed_through() {
        let req = Request::builder()
            .header("x-forwarded-for", "::ffff:203.0.113.50")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&req), "::ffff:203.0.113.50");
    }
}
