//! Integration tests for the allow-list refresh cycle against a mock
//! address-list endpoint.
//!
//! Run with: `cargo test --test allowlist_refresh`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use perimeter::{Config, IpAllowlist};

/// Config pointing the validator at a mock server.
fn config_for(server: &MockServer) -> Config {
    Config {
        allowlist_url: format!("{}/public-ip-list", server.uri()),
        allowlist_refresh_interval: Duration::from_millis(50),
        allowlist_fetch_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

/// Mount a 200 response serving the given address list.
async fn serve_addresses(server: &MockServer, addresses: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/public-ip-list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "addresses": addresses })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn refresh_replaces_fallback_wholesale() {
    let server = MockServer::start().await;
    serve_addresses(&server, json!(["198.51.100.0/24"])).await;

    let allowlist =
        IpAllowlist::with_rules(&config_for(&server), &["203.0.113.0/24"], &[]).unwrap();

    // Fallback answers until the first refresh
    assert!(allowlist.validate("203.0.113.10"));
    assert!(!allowlist.validate("198.51.100.1"));

    allowlist.refresh().await;

    assert!(allowlist.is_initialized());
    assert!(allowlist.validate("198.51.100.1"));
    // The fetched list fully replaces the fallback
    assert!(!allowlist.validate("203.0.113.10"));
}

#[tokio::test]
async fn secondary_list_survives_refresh() {
    let server = MockServer::start().await;
    serve_addresses(&server, json!(["198.51.100.0/24"])).await;

    let allowlist = IpAllowlist::with_rules(
        &config_for(&server),
        &["203.0.113.0/24"],
        &["192.0.2.0/24"],
    )
    .unwrap();

    assert!(allowlist.validate("192.0.2.50"));
    allowlist.refresh().await;
    assert!(allowlist.validate("192.0.2.50"));
}

#[tokio::test]
async fn empty_address_list_leaves_state_unchanged() {
    let server = MockServer::start().await;
    serve_addresses(&server, json!([])).await;

    let allowlist =
        IpAllowlist::with_rules(&config_for(&server), &["203.0.113.0/24"], &[]).unwrap();

    allowlist.refresh().await;

    assert!(!allowlist.is_initialized());
    assert!(allowlist.validate("203.0.113.10"));
    assert!(!allowlist.validate("198.51.100.1"));
}

#[tokio::test]
async fn non_array_addresses_leaves_state_unchanged() {
    let server = MockServer::start().await;
    serve_addresses(&server, json!("not-a-list")).await;

    let allowlist =
        IpAllowlist::with_rules(&config_for(&server), &["203.0.113.0/24"], &[]).unwrap();

    allowlist.refresh().await;

    assert!(!allowlist.is_initialized());
    assert!(allowlist.validate("203.0.113.10"));
}

#[tokio::test]
async fn non_string_elements_leave_state_unchanged() {
    let server = MockServer::start().await;
    serve_addresses(&server, json!(["198.51.100.0/24", 42])).await;

    let allowlist =
        IpAllowlist::with_rules(&config_for(&server), &["203.0.113.0/24"], &[]).unwrap();

    allowlist.refresh().await;

    assert!(!allowlist.is_initialized());
    assert!(!allowlist.validate("198.51.100.1"));
}

#[tokio::test]
async fn http_error_leaves_state_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public-ip-list"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let allowlist =
        IpAllowlist::with_rules(&config_for(&server), &["203.0.113.0/24"], &[]).unwrap();

    allowlist.refresh().await;

    assert!(!allowlist.is_initialized());
    assert!(allowlist.validate("203.0.113.10"));
}

#[tokio::test]
async fn invalid_json_leaves_state_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public-ip-list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let allowlist =
        IpAllowlist::with_rules(&config_for(&server), &["203.0.113.0/24"], &[]).unwrap();

    allowlist.refresh().await;

    assert!(!allowlist.is_initialized());
    assert!(allowlist.validate("203.0.113.10"));
}

#[tokio::test]
async fn failed_refresh_keeps_last_good_fetched_list() {
    let server = MockServer::start().await;

    let good = Mock::given(method("GET"))
        .and(path("/public-ip-list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "addresses": ["198.51.100.0/24"]
        })))
        .up_to_n_times(1)
        .mount_as_scoped(&server)
        .await;

    let allowlist =
        IpAllowlist::with_rules(&config_for(&server), &["203.0.113.0/24"], &[]).unwrap();
    allowlist.refresh().await;
    assert!(allowlist.is_initialized());
    drop(good);

    // Subsequent failures leave the fetched list in place (stale-but-valid):
    // no reverse transition to the fallback
    Mock::given(method("GET"))
        .and(path("/public-ip-list"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    allowlist.refresh().await;

    assert!(allowlist.is_initialized());
    assert!(allowlist.validate("198.51.100.1"));
    assert!(!allowlist.validate("203.0.113.10"));
}

#[tokio::test]
async fn identical_payload_does_not_replace_rule_set() {
    let server = MockServer::start().await;
    serve_addresses(&server, json!(["198.51.100.0/24"])).await;

    let allowlist = IpAllowlist::with_rules(&config_for(&server), &[], &[]).unwrap();

    allowlist.refresh().await;
    assert!(allowlist.is_initialized());
    assert_eq!(allowlist.primary_rule_count(), 1);

    // Byte-identical content is a no-op; validation is unaffected
    allowlist.refresh().await;
    assert_eq!(allowlist.primary_rule_count(), 1);
    assert!(allowlist.validate("198.51.100.1"));
}

#[tokio::test]
async fn background_schedule_refreshes_without_manual_calls() {
    let server = MockServer::start().await;
    serve_addresses(&server, json!(["198.51.100.0/24"])).await;

    let allowlist = Arc::new(
        IpAllowlist::with_rules(&config_for(&server), &["203.0.113.0/24"], &[]).unwrap(),
    );
    allowlist.clone().start();

    // The initial refresh runs immediately on start
    tokio::time::timeout(Duration::from_secs(5), async {
        while !allowlist.is_initialized() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("validator never initialized from background refresh");

    assert!(allowlist.validate("198.51.100.1"));

    allowlist.shutdown().await;
}
