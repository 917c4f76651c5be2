//! TCP connect prober.
//!
//! Performs a standard TCP connect using the operating system's socket
//! API. A completed handshake means open; anything else means closed.
//! No data is exchanged and the stream is dropped as soon as it exists.

use crate::scanner::traits::{TcpProbe, TcpStatus};
use crate::types::Port;
use async_trait::async_trait;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Why a connect attempt did not produce a stream.
#[derive(Debug)]
enum ConnectFailure {
    TimedOut,
    Io(io::Error),
}

/// TCP connect prober.
///
/// Does not require elevated privileges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl TcpProber {
    /// Create a new TCP prober.
    pub fn new() -> Self {
        Self
    }

    /// Attempt to connect to the target address.
    async fn attempt_connect(
        addr: SocketAddr,
        limit: Duration,
    ) -> Result<TcpStream, ConnectFailure> {
        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(ConnectFailure::Io(e)),
            Err(_) => Err(ConnectFailure::TimedOut),
        }
    }
}

#[async_trait]
impl TcpProbe for TcpProber {
    async fn probe(&self, target: Ipv4Addr, port: Port, limit: Duration) -> TcpStatus {
        let addr = SocketAddr::V4(SocketAddrV4::new(target, port.as_u16()));

        match Self::attempt_connect(addr, limit).await {
            Ok(stream) => {
                drop(stream);
                debug!(%addr, "tcp connect succeeded, port is open");
                TcpStatus::Open
            }
            Err(ConnectFailure::TimedOut) => {
                debug!(%addr, ?limit, "tcp connect timed out, port is closed");
                TcpStatus::Closed
            }
            Err(ConnectFailure::Io(e)) => {
                debug!(%addr, error = %e, "tcp connect failed, port is closed");
                TcpStatus::Closed
            }
        }
    }
}
