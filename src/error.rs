//! Error types for portprobe.
//!
//! Uses `thiserror` for ergonomic error definitions. Expected network
//! outcomes (closed, filtered, silence) are statuses, not errors; only
//! conditions that stop a probe from running at all end up here.

use crate::types::TargetError;
use std::path::PathBuf;
use thiserror::Error;

/// Scan-level failures that propagate out of a probe.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Raw socket error: {0}")]
    RawSocket(String),

    #[error("Probe task failed: {0}")]
    TaskFailed(String),
}

impl ScanError {
    /// Map a failure to open a raw channel onto the right precondition error.
    pub fn from_raw_open(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied
            || err.raw_os_error() == Some(libc::EPERM)
        {
            Self::PermissionDenied(
                "raw socket access requires root/sudo privileges (or CAP_NET_RAW)".to_string(),
            )
        } else {
            Self::RawSocket(err.to_string())
        }
    }
}

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors raised while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Everything the command-line front end can fail with.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid target: {0}")]
    Target(#[from] TargetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
