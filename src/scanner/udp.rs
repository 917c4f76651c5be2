//! UDP prober.
//!
//! Sends one hand-built UDP datagram through a raw layer-4 channel and
//! watches both for a reply datagram and for ICMP errors quoting the
//! probe. UDP has no handshake, so the answer has to be inferred:
//!
//! 1. **UDP reply**: the port is open
//! 2. **ICMP destination unreachable**: the port is closed
//! 3. **Any other ICMP error**: something on the path filtered it
//! 4. **Silence**: open or filtered (ambiguous)
//!
//! # Privileges
//!
//! Root/sudo (or `CAP_NET_RAW`) is required to open the raw channels.
//! Lacking it is reported as an error rather than a port status.

use crate::error::{Result, ScanError};
use crate::scanner::icmp;
use crate::scanner::payloads::PayloadRegistry;
use crate::scanner::traits::{UdpProbe, UdpStatus, UdpVerdict};
use crate::types::Port;
use async_trait::async_trait;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::udp::{self, MutableUdpPacket, UdpPacket};
use pnet::packet::Packet;
use pnet::transport::{
    self, TransportChannelType, TransportProtocol, TransportReceiver, TransportSender,
};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const UDP_HEADER_LEN: usize = 8;
const RECV_BUFFER_SIZE: usize = 2048;

/// How long a single wait on the ICMP channel may block before the
/// reply socket is checked again.
const POLL_SLICE: Duration = Duration::from_millis(20);

/// Shortest wait handed to the ICMP channel. The receive timeout is a
/// `timeval`, and a zero `timeval` in `SO_RCVTIMEO` blocks forever.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Extra time given to the raw ICMP channel once the reply socket has
/// already reported an ICMP-derived error.
const ICMP_GRACE: Duration = Duration::from_millis(50);

const CHANNEL_TYPE_UDP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Udp));
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));

/// Something that came back for a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ProbeResponse {
    /// A reply datagram of the given size.
    Datagram(usize),
    /// An ICMP error quoting our datagram.
    Icmp { icmp_type: u8, code: u8 },
    /// A response that fits neither shape.
    Unrecognized(String),
}

/// UDP prober with service-aware payloads.
///
/// **Requires elevated privileges (root/sudo).**
#[derive(Debug, Clone, Default)]
pub struct UdpProber {
    payloads: PayloadRegistry,
}

impl UdpProber {
    /// Create a prober using the built-in payload registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a prober with a custom payload registry.
    pub fn with_payloads(payloads: PayloadRegistry) -> Self {
        Self { payloads }
    }
}

#[async_trait]
impl UdpProbe for UdpProber {
    fn requires_privileges(&self) -> bool {
        true
    }

    async fn probe(&self, target: Ipv4Addr, port: Port, limit: Duration) -> Result<UdpVerdict> {
        let payload = self.payloads.payload_for(port);
        let destination = SocketAddrV4::new(target, port.as_u16());

        let verdict = tokio::task::spawn_blocking(move || run_probe(destination, &payload, limit))
            .await
            .map_err(|e| ScanError::TaskFailed(e.to_string()))??;

        debug!(%destination, status = %verdict.status, "udp probe finished");
        Ok(verdict)
    }
}

/// The raw channels a probe needs. Opening them is the privileged step.
struct RawChannels {
    udp_tx: TransportSender,
    icmp_rx: TransportReceiver,
}

impl RawChannels {
    fn open() -> Result<Self> {
        let (udp_tx, _) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_UDP)
            .map_err(ScanError::from_raw_open)?;
        let (_, icmp_rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_ICMP)
            .map_err(ScanError::from_raw_open)?;
        Ok(Self { udp_tx, icmp_rx })
    }
}

/// Run one probe to completion on the current thread.
///
/// Every socket and channel is opened here and dropped on return.
fn run_probe(destination: SocketAddrV4, payload: &[u8], limit: Duration) -> Result<UdpVerdict> {
    let mut channels = RawChannels::open()?;

    // Reserve the source port so replies land on a real socket and the
    // kernel does not answer them with its own port unreachable.
    let socket = match reserve_source(destination) {
        Ok(socket) => socket,
        Err(e) => {
            warn!(%destination, error = %e, "could not set up udp probe socket");
            return Ok(UdpVerdict::new(UdpStatus::Unknown));
        }
    };
    let source = match socket.local_addr() {
        Ok(SocketAddr::V4(addr)) => addr,
        Ok(other) => {
            warn!(%destination, local = %other, "probe socket bound to a non-IPv4 address");
            return Ok(UdpVerdict::new(UdpStatus::Unknown));
        }
        Err(e) => {
            warn!(%destination, error = %e, "could not read probe socket address");
            return Ok(UdpVerdict::new(UdpStatus::Unknown));
        }
    };

    let datagram = build_datagram(source, destination, payload);
    if let Err(e) = send_datagram(&mut channels.udp_tx, &datagram, destination) {
        warn!(%destination, error = %e, "failed to send udp probe");
        return Ok(UdpVerdict::new(UdpStatus::Unknown));
    }
    debug!(%source, %destination, payload_len = payload.len(), "udp probe sent");

    let response = wait_for_response(&socket, &mut channels.icmp_rx, source, destination, limit);
    Ok(classify_response(response))
}

fn reserve_source(destination: SocketAddrV4) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(destination)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// Build a UDP header plus payload, checksummed over the IPv4 pseudo-header.
fn build_datagram(source: SocketAddrV4, destination: SocketAddrV4, payload: &[u8]) -> Vec<u8> {
    let total_len = UDP_HEADER_LEN + payload.len();
    let mut buffer = vec![0u8; total_len];

    if let Some(mut packet) = MutableUdpPacket::new(&mut buffer) {
        packet.set_source(source.port());
        packet.set_destination(destination.port());
        packet.set_length(total_len as u16);
        packet.set_payload(payload);
        let checksum = udp::ipv4_checksum(&packet.to_immutable(), source.ip(), destination.ip());
        packet.set_checksum(checksum);
    }

    buffer
}

fn send_datagram(
    tx: &mut TransportSender,
    datagram: &[u8],
    destination: SocketAddrV4,
) -> io::Result<()> {
    let packet = UdpPacket::new(datagram)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "datagram shorter than a UDP header"))?;
    tx.send_to(packet, IpAddr::V4(*destination.ip()))?;
    Ok(())
}

/// Wait until `limit` for a reply datagram or an ICMP error about the probe.
fn wait_for_response(
    socket: &UdpSocket,
    icmp_rx: &mut TransportReceiver,
    source: SocketAddrV4,
    destination: SocketAddrV4,
    limit: Duration,
) -> Option<ProbeResponse> {
    let deadline = Instant::now() + limit;
    let mut icmp_iter = transport::icmp_packet_iter(icmp_rx);
    let mut buf = [0u8; RECV_BUFFER_SIZE];

    let mut next_icmp = |wait: Duration| -> Option<ProbeResponse> {
        match icmp_iter.next_with_timeout(wait) {
            Ok(Some((packet, from))) => {
                let (icmp_type, code) = match_icmp_error(packet.packet(), source, destination)?;
                debug!(%from, icmp_type, code, "icmp error for udp probe");
                Some(ProbeResponse::Icmp { icmp_type, code })
            }
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "icmp receive failed");
                None
            }
        }
    };

    loop {
        let now = Instant::now();
        if now >= deadline {
            return None;
        }

        if let Some(response) = next_icmp(icmp_wait(deadline - now)) {
            return Some(response);
        }

        match socket.recv(&mut buf) {
            Ok(n) => return Some(ProbeResponse::Datagram(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                // The kernel turned an ICMP error into a socket error. Prefer
                // the raw copy, which keeps the exact type and code.
                if let Some(response) = next_icmp(ICMP_GRACE) {
                    return Some(response);
                }
                return Some(response_from_socket_error(&e));
            }
        }
    }
}

/// Wait for the next ICMP read, never shorter than [`MIN_WAIT`].
fn icmp_wait(remaining: Duration) -> Duration {
    remaining.min(POLL_SLICE).max(MIN_WAIT)
}

/// Best-effort recovery of the ICMP error behind a connected-socket error.
fn response_from_socket_error(err: &io::Error) -> ProbeResponse {
    let code = match err.raw_os_error() {
        Some(libc::ECONNREFUSED) => Some(3),
        Some(libc::EHOSTUNREACH) => Some(1),
        Some(libc::ENETUNREACH) => Some(0),
        _ => None,
    };

    match code {
        Some(code) => ProbeResponse::Icmp {
            icmp_type: icmp::DESTINATION_UNREACHABLE,
            code,
        },
        None => ProbeResponse::Unrecognized(err.to_string()),
    }
}

/// ICMP types whose body quotes the offending datagram.
fn quotes_original_datagram(icmp_type: u8) -> bool {
    matches!(icmp_type, 3 | 4 | 5 | 11 | 12)
}

/// Return (type, code) if `data` is an ICMP error about our probe.
fn match_icmp_error(
    data: &[u8],
    source: SocketAddrV4,
    destination: SocketAddrV4,
) -> Option<(u8, u8)> {
    let packet = IcmpPacket::new(data)?;
    let icmp_type = packet.get_icmp_type().0;
    if !quotes_original_datagram(icmp_type) {
        return None;
    }

    // Skip the 4 byte unused/pointer word that precedes the quoted header.
    let quoted = packet.payload().get(4..)?;
    let ip = Ipv4Packet::new(quoted)?;
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Udp
        || ip.get_destination() != *destination.ip()
    {
        return None;
    }

    let header_len = ip.get_header_length() as usize * 4;
    let udp = UdpPacket::new(quoted.get(header_len..)?)?;
    if udp.get_source() != source.port() || udp.get_destination() != destination.port() {
        return None;
    }

    Some((icmp_type, packet.get_icmp_code().0))
}

fn classify_response(response: Option<ProbeResponse>) -> UdpVerdict {
    match response {
        None => UdpVerdict::new(UdpStatus::OpenOrFiltered),
        Some(ProbeResponse::Icmp { icmp_type, code }) => {
            UdpVerdict::from_icmp(icmp::classify(icmp_type, code))
        }
        Some(ProbeResponse::Datagram(_)) => UdpVerdict::new(UdpStatus::Open),
        Some(ProbeResponse::Unrecognized(reason)) => {
            debug!(%reason, "unrecognized response to udp probe");
            UdpVerdict::new(UdpStatus::Unknown)
        }
    }
}
