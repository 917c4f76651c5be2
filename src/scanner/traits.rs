//! Prober trait abstractions and the status types they produce.
//!
//! The orchestrator is written against these traits so the real
//! socket-backed probers can be swapped for stubs in tests.

use crate::error::Result;
use crate::scanner::icmp::IcmpDisposition;
use crate::types::Port;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Which protocols a scan should probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP connect probe only.
    Tcp,
    /// UDP probe only (requires root/admin privileges for ICMP capture).
    Udp,
    /// TCP first, then UDP.
    Both,
}

impl Protocol {
    /// Whether a TCP probe is part of this selection.
    pub fn includes_tcp(self) -> bool {
        matches!(self, Self::Tcp | Self::Both)
    }

    /// Whether a UDP probe is part of this selection.
    pub fn includes_udp(self) -> bool {
        matches!(self, Self::Udp | Self::Both)
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::Both
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "both" => Ok(Self::Both),
            _ => Err(format!("unknown protocol: {}", s)),
        }
    }
}

/// A single transport protocol, used for service-name lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a TCP connect probe.
///
/// There is deliberately no filtered state: refused, timed out and
/// unreachable all collapse to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TcpStatus {
    /// Connection established.
    Open,
    /// Connection could not be established for any reason.
    Closed,
}

impl fmt::Display for TcpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Outcome of a UDP probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UdpStatus {
    /// The service answered with a datagram.
    Open,
    /// ICMP destination unreachable came back for the probe.
    Closed,
    /// Some other ICMP error came back for the probe.
    Filtered,
    /// Silence: either accepted without reply or silently dropped.
    #[serde(rename = "open|filtered")]
    OpenOrFiltered,
    /// A response arrived that fits none of the above.
    Unknown,
}

impl fmt::Display for UdpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Filtered => write!(f, "filtered"),
            Self::OpenOrFiltered => write!(f, "open|filtered"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// What a UDP probe concluded, plus the ICMP error behind it if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpVerdict {
    pub status: UdpStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp: Option<IcmpDisposition>,
}

impl UdpVerdict {
    /// A verdict not backed by an ICMP error.
    pub fn new(status: UdpStatus) -> Self {
        Self { status, icmp: None }
    }

    /// A verdict derived from a classified ICMP error.
    pub fn from_icmp(icmp: IcmpDisposition) -> Self {
        Self {
            status: icmp.status(),
            icmp: Some(icmp),
        }
    }
}

/// Connect-style TCP prober.
///
/// Implementations must never fail: every problem is a `Closed` port.
#[async_trait]
pub trait TcpProbe: Send + Sync {
    async fn probe(&self, target: Ipv4Addr, port: Port, timeout: Duration) -> TcpStatus;
}

/// UDP prober.
///
/// Errors are reserved for broken preconditions (no raw socket access,
/// a crashed worker). Network ambiguity is expressed in the verdict.
#[async_trait]
pub trait UdpProbe: Send + Sync {
    /// Check if this prober requires elevated privileges.
    fn requires_privileges(&self) -> bool;

    async fn probe(&self, target: Ipv4Addr, port: Port, timeout: Duration) -> Result<UdpVerdict>;
}
