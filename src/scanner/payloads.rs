//! UDP probe payloads for well-known services.
//!
//! Many UDP services ignore an empty datagram, so a probe that speaks the
//! service's protocol is far more likely to draw a reply. Each port maps
//! to a generator function; ports without one (or whose generator fails)
//! get an empty payload.

use crate::types::Port;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Failure to build a probe payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("DNS label too long: {0}")]
    DnsLabelTooLong(String),

    #[error("payload generation failed: {0}")]
    Other(String),
}

/// Builds the payload for one service.
pub type PayloadGenerator = fn() -> Result<Vec<u8>, PayloadError>;

/// Port-to-generator mapping used by the UDP prober.
#[derive(Debug, Clone)]
pub struct PayloadRegistry {
    generators: HashMap<u16, PayloadGenerator>,
}

impl PayloadRegistry {
    /// A registry with no generators; every port gets an empty payload.
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Register a generator for a port, returning the one it replaces.
    pub fn register(&mut self, port: Port, generator: PayloadGenerator) -> Option<PayloadGenerator> {
        self.generators.insert(port.as_u16(), generator)
    }

    /// Check whether a port has a service-specific payload.
    pub fn is_registered(&self, port: Port) -> bool {
        self.generators.contains_key(&port.as_u16())
    }

    /// Payload for a port, empty if none is registered or generation fails.
    pub fn payload_for(&self, port: Port) -> Vec<u8> {
        let Some(generator) = self.generators.get(&port.as_u16()) else {
            return Vec::new();
        };

        match generator() {
            Ok(payload) => payload,
            Err(e) => {
                debug!(port = port.as_u16(), error = %e, "payload generator failed, sending empty datagram");
                Vec::new()
            }
        }
    }
}

impl Default for PayloadRegistry {
    /// Registry preloaded with the built-in service probes.
    fn default() -> Self {
        let builtins: [(u16, PayloadGenerator); 5] = [
            (53, dns_root_query),
            (69, tftp_read_request),
            (123, ntp_client_request),
            (137, netbios_name_query),
            (161, snmp_get_request),
        ];

        Self {
            generators: builtins.into_iter().collect(),
        }
    }
}

/// Minimal recursive DNS query for the NS records of `name`.
fn dns_query(name: &str) -> Result<Vec<u8>, PayloadError> {
    let id: u16 = rand::random();

    let mut packet = Vec::with_capacity(17 + name.len() + 1);
    packet.extend_from_slice(&id.to_be_bytes());
    packet.extend_from_slice(&[0x01, 0x00]); // standard query, recursion desired
    packet.extend_from_slice(&[0x00, 0x01]); // QDCOUNT
    packet.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]); // AN/NS/AR

    for label in name.split('.').filter(|l| !l.is_empty()) {
        if label.len() > 63 {
            return Err(PayloadError::DnsLabelTooLong(label.to_string()));
        }
        packet.push(label.len() as u8);
        packet.extend_from_slice(label.as_bytes());
    }
    packet.push(0x00);

    packet.extend_from_slice(&[0x00, 0x02]); // QTYPE NS
    packet.extend_from_slice(&[0x00, 0x01]); // QCLASS IN
    Ok(packet)
}

fn dns_root_query() -> Result<Vec<u8>, PayloadError> {
    dns_query("")
}

fn tftp_read_request() -> Result<Vec<u8>, PayloadError> {
    Ok(b"\x00\x01probe\x00octet\x00".to_vec())
}

/// NTPv4 client-mode packet; servers answer with a 48 byte reply.
fn ntp_client_request() -> Result<Vec<u8>, PayloadError> {
    let mut packet = vec![0u8; 48];
    packet[0] = 0xe3; // LI = 3 (unsynchronized), VN = 4, mode = 3 (client)
    Ok(packet)
}

/// NetBIOS name service wildcard (`*`) NBSTAT query.
fn netbios_name_query() -> Result<Vec<u8>, PayloadError> {
    Ok(b"\x80\xf0\x00\x10\x00\x01\x00\x00\x00\x00\x00\x00\x20CKAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA\x00\x00\x21\x00\x01".to_vec())
}

/// SNMPv1 get-request for sysDescr.0 with community "public".
fn snmp_get_request() -> Result<Vec<u8>, PayloadError> {
    let request_id: u32 = rand::random::<u32>() & 0x7fff_ffff;

    let mut packet = vec![
        0x30, 0x29, // SEQUENCE
        0x02, 0x01, 0x00, // version: 1
        0x04, 0x06, b'p', b'u', b'b', b'l', b'i', b'c', // community
        0xa0, 0x1c, // GetRequest PDU
        0x02, 0x04, // request-id
    ];
    packet.extend_from_slice(&request_id.to_be_bytes());
    packet.extend_from_slice(&[
        0x02, 0x01, 0x00, // error-status
        0x02, 0x01, 0x00, // error-index
        0x30, 0x0e, // varbind list
        0x30, 0x0c, // varbind
        0x06, 0x08, 0x2b, 0x06, 0x01, 0x02, 0x01, 0x01, 0x01, 0x00, // 1.3.6.1.2.1.1.1.0
        0x05, 0x00, // NULL
    ]);
    Ok(packet)
}
