//! Command-line interface definitions for portprobe.
//!
//! Uses `clap` derive macros for declarative argument parsing.

use crate::config::Settings;
use crate::error::CliResult;
use crate::output::{self, OutputFormat};
use crate::scanner::{Orchestrator, Protocol, ScanResult};
use crate::types::{Port, ScanTarget, TargetSpec};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check whether a single TCP and/or UDP port is reachable on a host.
#[derive(Parser, Debug)]
#[command(name = "portprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Probe one TCP/UDP port and classify it", long_about = None)]
#[command(after_help = "Example: portprobe -t 192.168.1.10 -p 53 -P both -T 5 --verbose")]
pub struct Args {
    /// Target IPv4 address or domain name
    #[arg(short, long, value_name = "TARGET")]
    pub target: TargetSpec,

    /// Port number to scan (1-65535)
    #[arg(short, long)]
    pub port: Port,

    /// Protocol to scan [default: both, or the configured default]
    #[arg(short = 'P', long, value_enum)]
    pub protocol: Option<Protocol>,

    /// Timeout in seconds for each probe [default: 10, or the configured default]
    #[arg(short = 'T', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Output format for results
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Enable verbose (debug) output
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a custom settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Fully resolved scan parameters: CLI flags layered over settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub target: TargetSpec,
    pub port: Port,
    pub protocol: Protocol,
    pub timeout: Duration,
    pub output: OutputFormat,
}

impl Args {
    /// Merge flags with settings, flags winning.
    pub fn to_request(&self, settings: &Settings) -> ScanRequest {
        ScanRequest {
            target: self.target.clone(),
            port: self.port,
            protocol: self.protocol.unwrap_or(settings.default_protocol),
            timeout: self
                .timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| settings.default_timeout()),
            output: self.output.unwrap_or(settings.default_output),
        }
    }

    /// Execute the scan described by these arguments.
    pub async fn execute(&self) -> CliResult<(ScanTarget, ScanResult, OutputFormat)> {
        let settings = Settings::load(self.config.as_deref())?;
        let request = self.to_request(&settings);

        debug!(target = %request.target, "resolving target");
        let target = request.target.resolve().await?;
        if target.was_resolved() {
            debug!("resolved domain {} -> {}", target.original, target.ip);
        } else {
            debug!("valid IP address: {}", target.ip);
        }
        debug!(port = %request.port, "port is valid");

        let orchestrator = Orchestrator::new();
        if orchestrator.requires_privileges(request.protocol) && !is_root() {
            output::print_warning(
                "UDP scanning requires root/sudo privileges for raw socket access.",
            );
        }

        info!(
            target = %target,
            port = %request.port,
            protocol = %request.protocol,
            timeout = ?request.timeout,
            "starting scan"
        );
        let result = orchestrator
            .scan(target.ip, request.port, request.protocol, request.timeout)
            .await?;
        info!(open = result.is_open(), "scan completed");
        debug!("scan duration: {} ms", result.duration_ms);

        Ok((target, result, request.output))
    }
}

/// Check if running with root/admin privileges.
pub fn is_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
