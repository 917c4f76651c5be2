//! Target specification with hostname support.
//!
//! Accepts either an IPv4 literal or a hostname. Hostnames are resolved
//! through `trust-dns-resolver` and the first IPv4 answer is used, since
//! the probers only speak IPv4.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// A scan target that has been resolved to an IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    /// The original input (hostname or IP string).
    pub original: String,
    /// The resolved IPv4 address.
    pub ip: Ipv4Addr,
}

impl ScanTarget {
    /// Create a new scan target.
    pub fn new(original: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self {
            original: original.into(),
            ip,
        }
    }

    /// Whether the target was given by name rather than as a literal.
    pub fn was_resolved(&self) -> bool {
        self.original != self.ip.to_string()
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.was_resolved() {
            write!(f, "{} ({})", self.original, self.ip)
        } else {
            write!(f, "{}", self.ip)
        }
    }
}

/// Error type for target parsing and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target format: {0}")]
    InvalidFormat(String),
    #[error("IPv6 targets are not supported: {0}")]
    Ipv6Unsupported(String),
    #[error("couldn't resolve domain name '{0}': {1}")]
    DnsResolutionFailed(String, String),
    #[error("no IPv4 addresses found for hostname '{0}'")]
    NoAddressesFound(String),
}

/// A target specification as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A literal IPv4 address.
    Address(Ipv4Addr),
    /// A hostname to be resolved.
    Hostname(String),
}

impl TargetSpec {
    /// Parse a target specification from a string.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();

        match s.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => return Ok(Self::Address(ip)),
            Ok(IpAddr::V6(_)) => return Err(TargetError::Ipv6Unsupported(s.to_string())),
            Err(_) => {}
        }

        if is_valid_hostname(s) {
            return Ok(Self::Hostname(s.to_string()));
        }

        Err(TargetError::InvalidFormat(s.to_string()))
    }

    /// Resolve this specification to a single IPv4 scan target.
    pub async fn resolve(&self) -> Result<ScanTarget, TargetError> {
        match self {
            Self::Address(ip) => Ok(ScanTarget::new(ip.to_string(), *ip)),

            Self::Hostname(hostname) => {
                let resolver = TokioAsyncResolver::tokio(
                    ResolverConfig::default(),
                    ResolverOpts::default(),
                );

                let response = resolver.lookup_ip(hostname.as_str()).await.map_err(|e| {
                    TargetError::DnsResolutionFailed(hostname.clone(), e.to_string())
                })?;

                response
                    .iter()
                    .find_map(|ip| match ip {
                        IpAddr::V4(v4) => Some(v4),
                        IpAddr::V6(_) => None,
                    })
                    .map(|ip| ScanTarget::new(hostname.clone(), ip))
                    .ok_or_else(|| TargetError::NoAddressesFound(hostname.clone()))
            }
        }
    }
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(ip) => write!(f, "{}", ip),
            Self::Hostname(hostname) => write!(f, "{}", hostname),
        }
    }
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    // Each label must be 1-63 characters
    for label in s.trim_end_matches('.').split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        // Must start and end with alphanumeric
        if !label.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return false;
        }
        if !label.chars().last().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4() {
        let spec = TargetSpec::parse("192.168.1.1").unwrap();
        assert_eq!(spec, TargetSpec::Address(Ipv4Addr::new(192, 168, 1, 1)));
    }

    #[test]
    fn test_parse_ipv6_rejected() {
        let result = TargetSpec::parse("::1");
        assert!(matches!(result, Err(TargetError::Ipv6Unsupported(_))));
    }

    #[test]
    fn test_parse_hostname() {
        let spec = TargetSpec::parse("example.com").unwrap();
        assert!(matches!(spec, TargetSpec::Hostname(_)));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            TargetSpec::parse("not a host!"),
            Err(TargetError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_valid_hostname() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("sub.example.com."));
        assert!(is_valid_hostname("my-server"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("-invalid.com"));
        assert!(!is_valid_hostname("a..b"));
    }

    #[tokio::test]
    async fn test_resolve_literal_skips_dns() {
        let target = TargetSpec::parse("10.0.0.7").unwrap().resolve().await.unwrap();
        assert_eq!(target.ip, Ipv4Addr::new(10, 0, 0, 7));
        assert!(!target.was_resolved());
        assert_eq!(target.to_string(), "10.0.0.7");
    }

    #[test]
    fn test_display_resolved() {
        let target = ScanTarget::new("router.lan", Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(target.to_string(), "router.lan (192.168.0.1)");
    }
}
