//! Output formatting module.
//!
//! Renders a [`ScanResult`] as human-readable text or JSON.

use crate::scanner::{ScanResult, TcpOutcome, TcpStatus, UdpOutcome, UdpStatus};
use crate::services::UNKNOWN_SERVICE;
use crate::types::{Port, ScanTarget};
use console::{style, Style};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable plain text
    Plain,
    /// JSON structured output
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Plain
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// JSON document: the scan result plus the target as the user typed it.
#[derive(Serialize)]
struct JsonReport<'a> {
    host: &'a str,
    #[serde(flatten)]
    result: &'a ScanResult,
}

/// Format and print a scan result according to the specified format.
pub fn print_result(target: &ScanTarget, result: &ScanResult, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Plain => write_plain(&mut out, target, result),
        OutputFormat::Json => write_json(&mut out, target, result),
    }
}

fn write_plain(out: &mut impl Write, target: &ScanTarget, result: &ScanResult) -> io::Result<()> {
    writeln!(out, "{} {}", style("Target:").bold(), target)?;

    if let Some(tcp) = &result.tcp {
        let line = tcp_line(result.port, tcp);
        let line_style = match tcp.status {
            TcpStatus::Open => Style::new().green().bold(),
            TcpStatus::Closed => Style::new().red(),
        };
        writeln!(out, "{}", line_style.apply_to(line))?;
    }

    if let Some(udp) = &result.udp {
        let line = udp_line(result.port, udp);
        let line_style = match udp.status {
            UdpStatus::Open => Style::new().green().bold(),
            UdpStatus::OpenOrFiltered => Style::new().green(),
            UdpStatus::Closed => Style::new().red(),
            UdpStatus::Filtered => Style::new().yellow(),
            UdpStatus::Unknown => Style::new().dim(),
        };
        writeln!(out, "{}", line_style.apply_to(line))?;
    }

    Ok(())
}

fn write_json(out: &mut impl Write, target: &ScanTarget, result: &ScanResult) -> io::Result<()> {
    let report = JsonReport {
        host: &target.original,
        result,
    };
    serde_json::to_writer_pretty(&mut *out, &report)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    writeln!(out)
}

/// One-line summary of the TCP outcome.
pub fn tcp_line(port: Port, outcome: &TcpOutcome) -> String {
    match outcome.status {
        TcpStatus::Open => format!(
            "{}/tcp is open - Service: {}",
            port,
            outcome.service.as_deref().unwrap_or(UNKNOWN_SERVICE)
        ),
        TcpStatus::Closed => format!("{}/tcp is closed", port),
    }
}

/// One-line summary of the UDP outcome.
pub fn udp_line(port: Port, outcome: &UdpOutcome) -> String {
    match (outcome.status, &outcome.icmp) {
        (UdpStatus::Open, _) => format!(
            "{}/udp is open - Service: {}",
            port,
            outcome.service.as_deref().unwrap_or(UNKNOWN_SERVICE)
        ),
        (UdpStatus::OpenOrFiltered, _) => format!("{}/udp is open|filtered (no response)", port),
        (status, Some(icmp)) => format!("{}/udp is {} ({})", port, status, icmp.message),
        (status, None) => format!("{}/udp is {}", port, status),
    }
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{classify, Protocol};
    use chrono::Utc;
    use std::net::Ipv4Addr;

    fn port(p: u16) -> Port {
        Port::new(p).unwrap()
    }

    fn udp(status: UdpStatus) -> UdpOutcome {
        UdpOutcome {
            status,
            service: None,
            icmp: None,
        }
    }

    #[test]
    fn test_tcp_lines() {
        let open = TcpOutcome {
            status: TcpStatus::Open,
            service: Some("ssh".to_string()),
        };
        assert_eq!(tcp_line(port(22), &open), "22/tcp is open - Service: ssh");

        let closed = TcpOutcome {
            status: TcpStatus::Closed,
            service: None,
        };
        assert_eq!(tcp_line(port(22), &closed), "22/tcp is closed");
    }

    #[test]
    fn test_udp_lines() {
        let closed = UdpOutcome {
            icmp: Some(classify(3, 3)),
            ..udp(UdpStatus::Closed)
        };
        assert_eq!(
            udp_line(port(53), &closed),
            "53/udp is closed (Destination port unreachable)"
        );
        assert_eq!(
            udp_line(port(53), &udp(UdpStatus::OpenOrFiltered)),
            "53/udp is open|filtered (no response)"
        );
        assert_eq!(udp_line(port(53), &udp(UdpStatus::Unknown)), "53/udp is unknown");

        let open = UdpOutcome {
            service: Some("domain".to_string()),
            ..udp(UdpStatus::Open)
        };
        assert_eq!(udp_line(port(53), &open), "53/udp is open - Service: domain");
    }

    #[test]
    fn test_json_report() {
        let target = ScanTarget::new("localhost", Ipv4Addr::LOCALHOST);
        let result = ScanResult {
            target: Ipv4Addr::LOCALHOST,
            port: port(53),
            protocol: Protocol::Udp,
            tcp: None,
            udp: Some(udp(UdpStatus::OpenOrFiltered)),
            started_at: Utc::now(),
            duration_ms: 10,
        };

        let mut buf = Vec::new();
        write_json(&mut buf, &target, &result).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["host"], "localhost");
        assert_eq!(json["target"], "127.0.0.1");
        assert_eq!(json["udp"]["status"], "open|filtered");
        assert!(json.get("tcp").is_none());
    }

    #[test]
    fn test_plain_only_requested_protocols() {
        let target = ScanTarget::new("127.0.0.1", Ipv4Addr::LOCALHOST);
        let result = ScanResult {
            target: Ipv4Addr::LOCALHOST,
            port: port(80),
            protocol: Protocol::Tcp,
            tcp: Some(TcpOutcome {
                status: TcpStatus::Closed,
                service: None,
            }),
            udp: None,
            started_at: Utc::now(),
            duration_ms: 3,
        };

        let mut buf = Vec::new();
        write_plain(&mut buf, &target, &result).unwrap();
        let text = console::strip_ansi_codes(&String::from_utf8(buf).unwrap()).to_string();
        assert!(text.contains("80/tcp is closed"));
        assert!(!text.contains("/udp"));
    }
}
