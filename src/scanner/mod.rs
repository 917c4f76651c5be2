//! Scanner module - probes a single port over TCP and/or UDP.
//!
//! The [`Orchestrator`] runs the requested probers one after the other
//! (TCP first) and folds their answers into a [`ScanResult`]. Probes are
//! never retried and never run concurrently.

pub mod icmp;
pub mod payloads;
pub mod tcp;
pub mod traits;
pub mod udp;

use crate::error::Result;
use crate::services::service_name;
use crate::types::Port;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::debug;

pub use icmp::{classify, Disposition, IcmpDisposition};
pub use payloads::{PayloadError, PayloadGenerator, PayloadRegistry};
pub use tcp::TcpProber;
pub use traits::{Protocol, TcpProbe, TcpStatus, Transport, UdpProbe, UdpStatus, UdpVerdict};
pub use udp::UdpProber;

/// TCP half of a scan result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpOutcome {
    pub status: TcpStatus,
    /// Service name, looked up only for open ports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// UDP half of a scan result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpOutcome {
    pub status: UdpStatus,
    /// Service name, looked up only for open ports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// The ICMP error that decided the status, if one did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp: Option<IcmpDisposition>,
}

/// Outcome of scanning one port on one target.
///
/// Only the protocols that were requested are populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub target: Ipv4Addr,
    pub port: Port,
    pub protocol: Protocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp: Option<TcpOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp: Option<UdpOutcome>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ScanResult {
    /// Check if any probed protocol found the port open.
    pub fn is_open(&self) -> bool {
        self.tcp.as_ref().is_some_and(|t| t.status == TcpStatus::Open)
            || self.udp.as_ref().is_some_and(|u| u.status == UdpStatus::Open)
    }
}

/// Runs the probers a scan asks for.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator<T = TcpProber, U = UdpProber> {
    tcp: T,
    udp: U,
}

impl Orchestrator {
    /// Orchestrator backed by the socket probers.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: TcpProbe, U: UdpProbe> Orchestrator<T, U> {
    /// Orchestrator backed by custom probers.
    pub fn with_probers(tcp: T, udp: U) -> Self {
        Self { tcp, udp }
    }

    /// Check if the given selection needs raw socket privileges.
    pub fn requires_privileges(&self, protocol: Protocol) -> bool {
        protocol.includes_udp() && self.udp.requires_privileges()
    }

    /// Scan one port.
    ///
    /// Errors come only from broken preconditions in a prober; closed,
    /// filtered and silent ports are ordinary results.
    pub async fn scan(
        &self,
        target: Ipv4Addr,
        port: Port,
        protocol: Protocol,
        timeout: Duration,
    ) -> Result<ScanResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        let tcp = if protocol.includes_tcp() {
            debug!(%target, %port, "scanning tcp port");
            let status = self.tcp.probe(target, port, timeout).await;
            let service = (status == TcpStatus::Open).then(|| service_name(port, Transport::Tcp));
            Some(TcpOutcome { status, service })
        } else {
            None
        };

        let udp = if protocol.includes_udp() {
            debug!(%target, %port, "scanning udp port");
            let verdict = self.udp.probe(target, port, timeout).await?;
            let service = (verdict.status == UdpStatus::Open)
                .then(|| service_name(port, Transport::Udp));
            Some(UdpOutcome {
                status: verdict.status,
                service,
                icmp: verdict.icmp,
            })
        } else {
            None
        };

        Ok(ScanResult {
            target,
            port,
            protocol,
            tcp,
            udp,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Scan one port with the default socket probers.
pub async fn scan(
    target: Ipv4Addr,
    port: Port,
    protocol: Protocol,
    timeout: Duration,
) -> Result<ScanResult> {
    Orchestrator::new().scan(target, port, protocol, timeout).await
}
