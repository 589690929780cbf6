//! Periodically refreshed IP allow-list validator.
//!
//! The validator owns three rule sets:
//!
//! - the **fetched** set, replaced wholesale by each successful refresh
//!   (absent until the first one lands);
//! - the bundled **fallback** set, the primary rule set until then;
//! - the bundled **secondary** set, unioned with whichever primary set is
//!   active on every check.
//!
//! Once a fetch has succeeded the validator never reverts to the fallback:
//! a failed refresh leaves the last good fetched set in place
//! (stale-but-valid).
//!
//! # Concurrency
//!
//! The fetched set lives behind an [`ArcSwapOption`]: refresh builds a new
//! list and swaps the reference, readers load it lock-free and never
//! observe a partially updated list. Refresh ticks do not serialize - a
//! slow fetch can overlap later ones, and the last *successful* completion
//! wins the update step regardless of initiation order.
//!
//! # Failure containment
//!
//! [`IpAllowlist::refresh`] never returns an error: transport failures and
//! malformed payloads are logged, counted, and leave state untouched.
//! [`IpAllowlist::validate`] is infallible - unparseable addresses match
//! no range and return `false`.

pub mod cidr;
pub mod sources;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use serde_json::Value;
use thiserror::Error;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub use cidr::CidrRange;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::{
    record_fetch_fail, record_fetch_success, record_unrecognised, record_update,
};

/// Textual prefix of IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`).
const V4_MAPPED_PREFIX: &str = "::ffff:";

/// One rule set: the raw fetched strings plus their parsed ranges.
///
/// The raw strings are kept verbatim so change detection compares exactly
/// what the remote served, even when some entries failed to parse.
#[derive(Debug)]
struct RuleSet {
    raw: Vec<String>,
    ranges: Vec<CidrRange>,
}

impl RuleSet {
    fn parse(raw: Vec<String>) -> Self {
        let ranges = raw
            .iter()
            .filter_map(|s| {
                let parsed = CidrRange::parse(s);
                if parsed.is_none() {
                    warn!(range = %s, "Skipping unparseable allow-list range");
                }
                parsed
            })
            .collect();

        Self { raw, ranges }
    }

    fn from_static(ranges: &[&str]) -> Self {
        Self::parse(ranges.iter().map(|s| (*s).to_string()).collect())
    }
}

/// Why a refresh produced no usable address list.
#[derive(Error, Debug)]
enum RefreshError {
    /// Network failure, non-2xx status, or a body that is not JSON.
    /// Recoverable by the next scheduled tick.
    #[error("fetch failed: {0}")]
    Transient(String),

    /// Parseable JSON whose `addresses` field is missing, not an array,
    /// empty, or contains non-string elements.
    #[error("unrecognised response shape: {0}")]
    Unrecognised(String),
}

/// Periodically refreshed allow-list of network address ranges.
///
/// Construct once at process start, wrap in an [`Arc`], call
/// [`start`](Self::start) to begin refreshing, and hand the handle to
/// request-handling code. [`validate`](Self::validate) is synchronous and
/// safe to call concurrently with an in-flight refresh.
pub struct IpAllowlist {
    /// Last successfully fetched rule set (absent until first success).
    fetched: ArcSwapOption<RuleSet>,
    /// Bundled primary rule set used until the first successful fetch.
    fallback: RuleSet,
    /// Bundled rule set unioned with the active primary set on every check.
    secondary: RuleSet,
    http: reqwest::Client,
    url: String,
    refresh_interval: Duration,
    /// Tracks the scheduler loop and its per-tick fetch tasks.
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl IpAllowlist {
    /// Create a validator with the bundled rule lists.
    ///
    /// No background work starts until [`start`](Self::start) is called.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Init` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::with_rules(
            config,
            sources::FALLBACK_CDN_RANGES,
            sources::ORG_STATIC_RANGES,
        )
    }

    /// Create a validator with caller-supplied fallback and secondary lists.
    ///
    /// Unparseable entries are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Init` if the HTTP client cannot be built.
    pub fn with_rules(config: &Config, fallback: &[&str], secondary: &[&str]) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.allowlist_fetch_timeout)
            .build()
            .map_err(|e| AppError::Init(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            fetched: ArcSwapOption::const_empty(),
            fallback: RuleSet::from_static(fallback),
            secondary: RuleSet::from_static(secondary),
            http,
            url: config.allowlist_url.clone(),
            refresh_interval: config.allowlist_refresh_interval,
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Test an address for containment in the active allow-list.
    ///
    /// The address may be IPv4 (`"203.0.113.10"`) or IPv4-mapped IPv6
    /// (`"::ffff:203.0.113.10"`); the mapping prefix is stripped before
    /// parsing. Unparseable input returns `false`.
    ///
    /// Checks the active primary set (fetched if any fetch has succeeded,
    /// bundled fallback otherwise) unioned with the secondary set. Linear
    /// scan, first containing range wins.
    pub fn validate(&self, address: &str) -> bool {
        let normalized = address.strip_prefix(V4_MAPPED_PREFIX).unwrap_or(address);
        let Ok(ip) = normalized.parse::<IpAddr>() else {
            return false;
        };

        let fetched = self.fetched.load();
        let primary = match fetched.as_ref() {
            Some(rules) => &rules.ranges,
            None => &self.fallback.ranges,
        };

        primary
            .iter()
            .chain(self.secondary.ranges.iter())
            .any(|range| range.contains(&ip))
    }

    /// Whether any refresh has ever succeeded.
    ///
    /// Until then [`validate`](Self::validate) answers from the bundled
    /// fallback list.
    pub fn is_initialized(&self) -> bool {
        self.fetched.load().is_some()
    }

    /// Number of ranges in the active primary rule set.
    pub fn primary_rule_count(&self) -> usize {
        match self.fetched.load().as_ref() {
            Some(rules) => rules.ranges.len(),
            None => self.fallback.ranges.len(),
        }
    }

    /// Number of ranges in the always-included secondary rule set.
    pub fn secondary_rule_count(&self) -> usize {
        self.secondary.ranges.len()
    }

    /// Perform one refresh cycle: fetch, validate shape, swap on change.
    ///
    /// Never fails: every error path is logged, counted, and leaves the
    /// held rule set untouched.
    pub async fn refresh(&self) {
        match self.fetch_addresses().await {
            Ok(addresses) => {
                record_fetch_success();
                self.apply(addresses);
            }
            Err(RefreshError::Unrecognised(body)) => {
                error!(response = %body, "Unrecognised allow-list response shape");
                record_unrecognised();
            }
            Err(RefreshError::Transient(reason)) => {
                error!(error = %reason, "Allow-list fetch failed");
                record_fetch_fail();
            }
        }
    }

    /// Replace the fetched rule set if `addresses` differs from it.
    ///
    /// Whole-list string comparison against the raw fetched strings.
    /// Plain load-compare-store: overlapping fetches race here and the
    /// last successful completion wins.
    ///
    /// Returns whether a replacement happened.
    fn apply(&self, addresses: Vec<String>) -> bool {
        let current = self.fetched.load_full();

        if current.as_ref().is_some_and(|c| c.raw == addresses) {
            return false;
        }

        let old_size = current.as_ref().map_or(0, |c| c.raw.len());
        let rules = RuleSet::parse(addresses);
        info!(
            old_size,
            new_size = rules.raw.len(),
            "Allow-list rule set updated"
        );
        record_update();
        self.fetched.store(Some(Arc::new(rules)));
        true
    }

    /// Fetch and shape-check the remote address list.
    async fn fetch_addresses(&self) -> Result<Vec<String>, RefreshError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RefreshError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Transient(format!(
                "unexpected status: {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RefreshError::Transient(format!("invalid JSON: {e}")))?;

        let Some(list) = body.get("addresses").and_then(Value::as_array) else {
            return Err(RefreshError::Unrecognised(body.to_string()));
        };

        if list.is_empty() {
            return Err(RefreshError::Unrecognised(body.to_string()));
        }

        let mut addresses = Vec::with_capacity(list.len());
        for entry in list {
            match entry.as_str() {
                Some(s) => addresses.push(s.to_string()),
                None => return Err(RefreshError::Unrecognised(body.to_string())),
            }
        }

        Ok(addresses)
    }

    /// Start the background refresh schedule.
    ///
    /// Performs one refresh immediately, then one per interval tick until
    /// [`shutdown`](Self::shutdown) is called or the process exits. Each
    /// tick spawns its own fetch task, so ticks never wait on a slow
    /// in-flight fetch.
    pub fn start(self: Arc<Self>) {
        let cancel = self.cancellation_token.clone();
        let tracker = self.task_tracker.clone();
        let this = self;

        tracker.spawn(async move {
            // Fallback data serves until the initial refresh lands.
            this.refresh().await;

            let mut ticker = interval(this.refresh_interval);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased; // Check cancellation first

                    _ = cancel.cancelled() => {
                        debug!("Allow-list refresh task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let worker = Arc::clone(&this);
                        this.task_tracker.spawn(async move {
                            worker.refresh().await;
                        });
                    }
                }
            }

            debug!("Allow-list refresh task shutting down");
        });
    }

    /// Stop the refresh schedule and wait for in-flight fetches.
    ///
    /// The validator keeps answering [`validate`](Self::validate) from its
    /// last-held rule set afterwards.
    pub async fn shutdown(&self) {
        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;
    }
}
