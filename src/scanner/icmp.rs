//! ICMP error classification.
//!
//! Maps the (type, code) of an ICMP error received for a UDP probe to a
//! diagnostic message and a coarse disposition. Only the error types a
//! UDP prober can meaningfully receive are tabled:
//!
//! - Type 3, Destination Unreachable: the target actively rejected the
//!   datagram, so the port is closed.
//! - Type 11, Time Exceeded, and type 12, Parameter Problem: something on
//!   the path interfered, so the port is filtered.

use crate::scanner::traits::UdpStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

pub const DESTINATION_UNREACHABLE: u8 = 3;
pub const TIME_EXCEEDED: u8 = 11;
pub const PARAMETER_PROBLEM: u8 = 12;

/// Coarse meaning of an ICMP error for the probed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Closed,
    Filtered,
}

impl Disposition {
    /// Disposition is decided by type alone.
    fn for_type(icmp_type: u8) -> Self {
        if icmp_type == DESTINATION_UNREACHABLE {
            Self::Closed
        } else {
            Self::Filtered
        }
    }
}

/// A classified ICMP error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcmpDisposition {
    #[serde(rename = "type")]
    pub icmp_type: u8,
    pub code: u8,
    pub message: String,
    pub disposition: Disposition,
}

impl IcmpDisposition {
    /// The UDP status this error contributes.
    pub fn status(&self) -> UdpStatus {
        match self.disposition {
            Disposition::Closed => UdpStatus::Closed,
            Disposition::Filtered => UdpStatus::Filtered,
        }
    }
}

impl fmt::Display for IcmpDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

static ICMP_MESSAGES: LazyLock<HashMap<(u8, u8), &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // Destination Unreachable
    m.insert((3, 0), "Destination network unreachable");
    m.insert((3, 1), "Destination host unreachable");
    m.insert((3, 2), "Destination protocol unreachable");
    m.insert((3, 3), "Destination port unreachable");
    m.insert((3, 4), "Fragmentation required, and DF flag set");
    m.insert((3, 5), "Source route failed");
    m.insert((3, 6), "Destination network unknown");
    m.insert((3, 7), "Destination host unknown");
    m.insert((3, 8), "Source host isolated");
    m.insert((3, 9), "Network administratively prohibited");
    m.insert((3, 10), "Host administratively prohibited");
    m.insert((3, 11), "Network unreachable for ToS");
    m.insert((3, 12), "Host unreachable for ToS");
    m.insert((3, 13), "Communication administratively prohibited");
    m.insert((3, 14), "Host precedence violation");
    m.insert((3, 15), "Precedence cutoff in effect");

    // Time Exceeded
    m.insert((11, 0), "TTL expired in transit");
    m.insert((11, 1), "Fragment reassembly time exceeded");

    // Parameter Problem
    m.insert((12, 0), "Pointer indicates the error");
    m.insert((12, 1), "Missing a required option");
    m.insert((12, 2), "Bad length");

    m
});

/// Look up the table message for a (type, code) pair.
pub fn message_for(icmp_type: u8, code: u8) -> Option<&'static str> {
    ICMP_MESSAGES.get(&(icmp_type, code)).copied()
}

/// Classify an ICMP error. Never fails: unknown pairs get a generic
/// message and the conservative `Filtered` disposition.
pub fn classify(icmp_type: u8, code: u8) -> IcmpDisposition {
    let message = match message_for(icmp_type, code) {
        Some(message) => message.to_string(),
        None => format!("unknown ICMP type {}, {}", icmp_type, code),
    };

    IcmpDisposition {
        icmp_type,
        code,
        message,
        disposition: Disposition::for_type(icmp_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_unreachable() {
        let d = classify(3, 3);
        assert_eq!(d.message, "Destination port unreachable");
        assert_eq!(d.disposition, Disposition::Closed);
        assert_eq!(d.status(), UdpStatus::Closed);
    }

    #[test]
    fn test_type3_always_closed() {
        for code in 0..=u8::MAX {
            assert_eq!(classify(3, code).disposition, Disposition::Closed, "code {code}");
        }
        for code in 0..=15 {
            assert!(message_for(3, code).is_some());
        }
    }

    #[test]
    fn test_time_exceeded_and_parameter_problem_filtered() {
        for code in 0..=u8::MAX {
            assert_eq!(classify(TIME_EXCEEDED, code).disposition, Disposition::Filtered);
            assert_eq!(classify(PARAMETER_PROBLEM, code).disposition, Disposition::Filtered);
        }
        assert_eq!(classify(11, 0).message, "TTL expired in transit");
        assert_eq!(classify(12, 2).message, "Bad length");
    }

    #[test]
    fn test_unknown_pairs() {
        for icmp_type in (0..=u8::MAX).filter(|t| ![3, 11, 12].contains(t)) {
            let d = classify(icmp_type, 7);
            assert_eq!(d.disposition, Disposition::Filtered);
            assert_eq!(d.message, format!("unknown ICMP type {}, 7", icmp_type));
            assert_eq!(d.status(), UdpStatus::Filtered);
        }
    }

    #[test]
    fn test_out_of_table_codes() {
        assert_eq!(classify(11, 2).message, "unknown ICMP type 11, 2");
        assert_eq!(classify(3, 16).message, "unknown ICMP type 3, 16");
        assert_eq!(classify(3, 16).disposition, Disposition::Closed);
    }
}
