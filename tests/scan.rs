//! End-to-end scans against local listeners.
//!
//! UDP scenarios need raw sockets and are ignored by default; run them with
//! `sudo -E cargo test -- --ignored`.

use portprobe::cli::is_root;
use portprobe::scanner::{
    scan, Disposition, Orchestrator, PayloadError, PayloadRegistry, Protocol, TcpProbe,
    TcpProber, TcpStatus, UdpProbe, UdpProber, UdpStatus,
};
use portprobe::{Port, ScanError};
use std::net::{Ipv4Addr, UdpSocket};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_test::assert_ok;

fn free_udp_port() -> Port {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    Port::new(socket.local_addr().unwrap().port()).unwrap()
}

async fn free_tcp_port() -> Port {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    Port::new(listener.local_addr().unwrap().port()).unwrap()
}

#[tokio::test]
async fn tcp_scan_of_closed_port_is_closed() {
    let port = free_tcp_port().await;
    let result = assert_ok!(
        scan(Ipv4Addr::LOCALHOST, port, Protocol::Tcp, Duration::from_secs(1)).await
    );

    let tcp = result.tcp.unwrap();
    assert_eq!(tcp.status, TcpStatus::Closed);
    assert!(tcp.service.is_none());
    assert!(result.udp.is_none());
}

#[tokio::test]
async fn tcp_scan_of_listener_is_open_with_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = Port::new(listener.local_addr().unwrap().port()).unwrap();

    let result = assert_ok!(
        scan(Ipv4Addr::LOCALHOST, port, Protocol::Tcp, Duration::from_secs(1)).await
    );

    assert!(result.is_open());
    let tcp = result.tcp.as_ref().unwrap();
    assert_eq!(tcp.status, TcpStatus::Open);
    assert!(tcp.service.is_some());
}

#[tokio::test]
async fn tcp_probe_is_idempotent() {
    let port = free_tcp_port().await;
    let prober = TcpProber::new();
    let first = prober.probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1)).await;
    let second = prober.probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1)).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn udp_without_privileges_is_a_hard_failure() {
    if is_root() {
        return;
    }

    let result = Orchestrator::new()
        .scan(Ipv4Addr::LOCALHOST, free_udp_port(), Protocol::Both, Duration::from_millis(200))
        .await;
    assert!(matches!(result, Err(ScanError::PermissionDenied(_))));
}

#[tokio::test]
#[ignore = "requires raw socket privileges"]
async fn udp_port_unreachable_is_closed() {
    let port = free_udp_port();
    let verdict = assert_ok!(
        UdpProber::new()
            .probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1))
            .await
    );

    assert_eq!(verdict.status, UdpStatus::Closed);
    let icmp = verdict.icmp.unwrap();
    assert_eq!((icmp.icmp_type, icmp.code), (3, 3));
    assert_eq!(icmp.message, "Destination port unreachable");
    assert_eq!(icmp.disposition, Disposition::Closed);
}

#[tokio::test]
#[ignore = "requires raw socket privileges"]
async fn udp_reply_is_open() {
    let responder = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = Port::new(responder.local_addr().unwrap().port()).unwrap();
    std::thread::spawn(move || {
        let mut buf = [0u8; 512];
        if let Ok((n, peer)) = responder.recv_from(&mut buf) {
            let _ = responder.send_to(&buf[..n.max(1)], peer);
        }
    });

    let result = assert_ok!(
        scan(Ipv4Addr::LOCALHOST, port, Protocol::Udp, Duration::from_secs(2)).await
    );
    let udp = result.udp.unwrap();
    assert_eq!(udp.status, UdpStatus::Open);
    assert!(udp.service.is_some());
}

#[tokio::test]
#[ignore = "requires raw socket privileges"]
async fn udp_probe_of_closed_port_is_idempotent() {
    let port = free_udp_port();
    let prober = UdpProber::new();

    let first = assert_ok!(prober.probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1)).await);
    let second = assert_ok!(prober.probe(Ipv4Addr::LOCALHOST, port, Duration::from_secs(1)).await);
    assert_eq!(first, second);
    assert_eq!(first.status, UdpStatus::Closed);
}

fn marker_payload() -> Result<Vec<u8>, PayloadError> {
    Ok(b"portprobe".to_vec())
}

#[tokio::test]
#[ignore = "requires raw socket privileges"]
async fn udp_silent_listener_is_open_or_filtered_after_timeout() {
    // Bound socket that reads the datagram and never answers.
    let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = Port::new(listener.local_addr().unwrap().port()).unwrap();
    listener.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let received = std::thread::spawn(move || {
        let mut buf = [0u8; 512];
        listener.recv(&mut buf).ok().map(|n| buf[..n].to_vec())
    });

    let mut payloads = PayloadRegistry::empty();
    payloads.register(port, marker_payload);
    let prober = UdpProber::with_payloads(payloads);

    let timeout = Duration::from_secs(1);
    let start = Instant::now();
    let verdict = assert_ok!(prober.probe(Ipv4Addr::LOCALHOST, port, timeout).await);

    assert_eq!(verdict.status, UdpStatus::OpenOrFiltered);
    assert!(verdict.icmp.is_none());
    assert!(start.elapsed() >= timeout);
    assert_eq!(received.join().unwrap().as_deref(), Some(&b"portprobe"[..]));
}
