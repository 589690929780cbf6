//! Bundled rule lists.
//!
//! Two read-only lists ship with the crate:
//!
//! - [`FALLBACK_CDN_RANGES`]: a snapshot of the CDN's published egress
//!   ranges. Used as the primary rule set until the first successful
//!   refresh; replaced wholesale (never merged) by fetched data.
//! - [`ORG_STATIC_RANGES`]: organization-owned egress ranges (offices,
//!   VPN concentrators, CI runners). Always unioned with whichever primary
//!   list is active.

/// CDN egress ranges bundled as refresh fallback (snapshot, Aug 2025).
/// Source: https://api.fastly.com/public-ip-list
pub const FALLBACK_CDN_RANGES: &[&str] = &[
    "23.235.32.0/20",
    "43.249.72.0/22",
    "103.244.50.0/24",
    "103.245.222.0/23",
    "103.245.224.0/24",
    "104.156.80.0/20",
    "140.248.64.0/18",
    "140.248.128.0/17",
    "146.75.0.0/17",
    "151.101.0.0/16",
    "157.52.64.0/18",
    "167.82.0.0/17",
    "167.82.128.0/20",
    "167.82.160.0/20",
    "167.82.224.0/20",
    "172.111.64.0/18",
    "185.31.16.0/22",
    "199.27.72.0/21",
    "199.232.0.0/16",
];

/// Organization egress ranges, always allowed regardless of CDN list state.
pub const ORG_STATIC_RANGES: &[&str] = &[
    // Office egress
    "62.25.64.0/20",
    "82.136.1.214/32",
    // VPN concentrators
    "193.117.55.0/24",
    // CI runners
    "213.216.148.0/24",
];
