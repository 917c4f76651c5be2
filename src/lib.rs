//! # portprobe - single-port TCP/UDP reachability prober
//!
//! portprobe answers one question: is this port reachable on this host?
//! TCP is checked with a plain connect. UDP is checked by sending one
//! datagram and reading the ICMP errors that come back, which separates
//! closed, filtered and open|filtered ports.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portprobe::scanner::{scan, Protocol};
//! use portprobe::types::Port;
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), portprobe::ScanError> {
//!     let port = Port::new(53).unwrap();
//!     let result = scan(Ipv4Addr::new(192, 168, 1, 1), port, Protocol::Both, Duration::from_secs(3)).await?;
//!
//!     if let Some(udp) = result.udp {
//!         println!("{}/udp is {}", port, udp.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`scanner`] - TCP and UDP probers, ICMP classification, probe payloads
//!   and the orchestrator that ties them together
//! - [`types`] - Validated ports and targets
//! - [`services`] - Best-effort service names for reporting
//! - [`config`] - Settings file handling
//! - [`cli`] - Command-line front end
//! - [`output`] - Plain text and JSON rendering
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ScanError};
pub use scanner::{scan, Protocol, ScanResult, TcpStatus, UdpStatus};
pub use types::{Port, ScanTarget, TargetSpec};
