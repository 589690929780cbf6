//! CIDR range parsing and containment.

use std::net::IpAddr;

/// Parsed CIDR network range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrRange {
    /// Network address
    network: IpAddr,
    /// Prefix length (e.g., 24 for /24)
    prefix_len: u8,
}

impl CidrRange {
    /// Parse a CIDR notation string (e.g., "203.0.113.0/24" or "::1/128").
    ///
    /// A bare address is accepted as an implicit /32 (or /128 for IPv6).
    /// Returns `None` if the format is invalid.
    pub fn parse(cidr: &str) -> Option<Self> {
        let cidr = cidr.trim();

        let Some((addr, len)) = cidr.split_once('/') else {
            // Bare IP: implicit host route
            let ip = cidr.parse::<IpAddr>().ok()?;
            let prefix_len = match ip {
                IpAddr::V4(_) => 32,
                IpAddr::V6(_) => 128,
            };
            return Some(Self {
                network: ip,
                prefix_len,
            });
        };

        let ip: IpAddr = addr.parse().ok()?;
        let prefix_len: u8 = len.parse().ok()?;

        let max_prefix = match ip {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };

        if prefix_len > max_prefix {
            return None;
        }

        Some(Self {
            network: ip,
            prefix_len,
        })
    }

    /// Check if an IP address is contained within this CIDR range.
    ///
    /// Address families never match each other: an IPv4 address is not
    /// contained in any IPv6 range and vice versa.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let net_bits = u32::from(*net);
                let addr_bits = u32::from(*addr);
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u32::MAX << (32 - self.prefix_len)
                };
                (net_bits & mask) == (addr_bits & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let net_bits = u128::from(*net);
                let addr_bits = u128::from(*addr);
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u128::MAX << (128 - self.prefix_len)
                };
                (net_bits & mask) == (addr_bits & mask)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v4_cidr() {
        let range = CidrRange::parse("203.0.113.0/24").unwrap();
        assert!(range.contains(&"203.0.113.10".parse().unwrap()));
        assert!(!range.contains(&"203.0.114.10".parse().unwrap()));
    }

    #[test]
    fn test_parse_bare_address_is_host_route() {
        let range = CidrRange::parse("198.51.100.7").unwrap();
        assert!(range.contains(&"198.51.100.7".parse().unwrap()));
        assert!(!range.contains(&"198.51.100.8".parse().unwrap()));
    }

    #[test]
    fn test_parse_v6_cidr() {
        let range = CidrRange::parse("2001:db8::/32").unwrap();
        assert!(range.contains(&"2001:db8::1".parse().unwrap()));
        assert!(!range.contains(&"2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn test_zero_prefix_matches_everything_in_family() {
        let range = CidrRange::parse("0.0.0.0/0").unwrap();
        assert!(range.contains(&"8.8.8.8".parse().unwrap()));
        assert!(range.contains(&"203.0.113.10".parse().unwrap()));
        // Family mismatch never matches
        assert!(!range.contains(&"2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_full_prefix() {
        let range = CidrRange::parse("203.0.113.5/32").unwrap();
        assert!(range.contains(&"203.0.113.5".parse().unwrap()));
        assert!(!range.contains(&"203.0.113.6".parse().unwrap()));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(CidrRange::parse("").is_none());
        assert!(CidrRange::parse("not-a-cidr").is_none());
        assert!(CidrRange::parse("203.0.113.0/33").is_none());
        assert!(CidrRange::parse("203.0.113.0/abc").is_none());
        assert!(CidrRange::parse("2001:db8::/129").is_none());
        assert!(CidrRange::parse("203.0.113.0/24/7").is_none());
    }

    #[test]
    fn test_surrounding_whitespace_tolerated() {
        assert!(CidrRange::parse("  203.0.113.0/24  ").is_some());
    }
}
