//! Core type definitions using newtype patterns for type safety.
//!
//! These types keep invalid ports and unsupported targets out of the
//! probers: by the time a scan runs, its inputs are already validated.

mod port;
mod target;

pub use port::{Port, PortError};
pub use target::{ScanTarget, TargetError, TargetSpec};
