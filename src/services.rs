//! Service-name lookup for reporting.
//!
//! Consults the system services database first (protocol-aware), then a
//! built-in table of well-known ports, and finally falls back to
//! `"unknown"`. Lookups never fail.

use crate::scanner::Transport;
use crate::types::Port;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

const SERVICES_PATH: &str = "/etc/services";

/// Name returned when no database knows the port.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Entries from the system services database, loaded once.
static SYSTEM_SERVICES: LazyLock<HashMap<(u16, Transport), String>> = LazyLock::new(|| {
    match fs::read_to_string(Path::new(SERVICES_PATH)) {
        Ok(content) => parse_services(&content),
        Err(e) => {
            debug!(path = SERVICES_PATH, error = %e, "services database unavailable, using built-in table");
            HashMap::new()
        }
    }
});

/// Static map of well-known ports to service names.
static PORT_SERVICES: LazyLock<HashMap<u16, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert(7, "echo");
    m.insert(20, "ftp-data");
    m.insert(21, "ftp");
    m.insert(22, "ssh");
    m.insert(23, "telnet");
    m.insert(25, "smtp");
    m.insert(53, "domain");
    m.insert(67, "bootps");
    m.insert(68, "bootpc");
    m.insert(69, "tftp");
    m.insert(80, "http");
    m.insert(88, "kerberos");
    m.insert(110, "pop3");
    m.insert(111, "sunrpc");
    m.insert(119, "nntp");
    m.insert(123, "ntp");
    m.insert(135, "epmap");
    m.insert(137, "netbios-ns");
    m.insert(138, "netbios-dgm");
    m.insert(139, "netbios-ssn");
    m.insert(143, "imap");
    m.insert(161, "snmp");
    m.insert(162, "snmp-trap");
    m.insert(179, "bgp");
    m.insert(389, "ldap");
    m.insert(443, "https");
    m.insert(445, "microsoft-ds");
    m.insert(464, "kpasswd");
    m.insert(465, "submissions");
    m.insert(500, "isakmp");
    m.insert(514, "syslog");
    m.insert(520, "router");
    m.insert(554, "rtsp");
    m.insert(587, "submission");
    m.insert(631, "ipp");
    m.insert(636, "ldaps");
    m.insert(873, "rsync");
    m.insert(993, "imaps");
    m.insert(995, "pop3s");
    m.insert(1080, "socks");
    m.insert(1194, "openvpn");
    m.insert(1433, "ms-sql-s");
    m.insert(1434, "ms-sql-m");
    m.insert(1701, "l2tp");
    m.insert(1723, "pptp");
    m.insert(1812, "radius");
    m.insert(1813, "radius-acct");
    m.insert(1883, "mqtt");
    m.insert(1900, "ssdp");
    m.insert(2049, "nfs");
    m.insert(2181, "zookeeper");
    m.insert(2375, "docker");
    m.insert(2376, "docker-s");
    m.insert(3128, "squid");
    m.insert(3306, "mysql");
    m.insert(3389, "ms-wbt-server");
    m.insert(3478, "stun");
    m.insert(3690, "svn");
    m.insert(4500, "ipsec-nat-t");
    m.insert(5060, "sip");
    m.insert(5061, "sip-tls");
    m.insert(5222, "xmpp-client");
    m.insert(5269, "xmpp-server");
    m.insert(5353, "mdns");
    m.insert(5432, "postgresql");
    m.insert(5672, "amqp");
    m.insert(5900, "rfb");
    m.insert(6379, "redis");
    m.insert(6443, "kubernetes-api");
    m.insert(8080, "http-alt");
    m.insert(8443, "https-alt");
    m.insert(9042, "cassandra");
    m.insert(9092, "kafka");
    m.insert(9200, "elasticsearch");
    m.insert(9418, "git");
    m.insert(11211, "memcache");
    m.insert(27017, "mongodb");
    m.insert(51820, "wireguard");

    m
});

/// Parse the `name port/proto [aliases] [# comment]` services format.
///
/// The first entry for a (port, protocol) pair wins.
fn parse_services(content: &str) -> HashMap<(u16, Transport), String> {
    let mut services = HashMap::new();

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default();
        let mut fields = line.split_whitespace();
        let (Some(name), Some(port_proto)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Some((port, proto)) = port_proto.split_once('/') else {
            continue;
        };
        let Ok(port) = port.parse::<u16>() else {
            continue;
        };
        let transport = match proto {
            "tcp" => Transport::Tcp,
            "udp" => Transport::Udp,
            _ => continue,
        };

        services
            .entry((port, transport))
            .or_insert_with(|| name.to_string());
    }

    services
}

/// Look up the built-in table for a port.
///
/// Returns `None` if the port is not in the well-known services table.
pub fn builtin_service_name(port: u16) -> Option<&'static str> {
    PORT_SERVICES.get(&port).copied()
}

/// Best-effort service name for a port and protocol.
///
/// Returns "unknown" if the port is not recognized.
pub fn service_name(port: Port, transport: Transport) -> String {
    let port = port.as_u16();
    SYSTEM_SERVICES
        .get(&(port, transport))
        .map(String::as_str)
        .or_else(|| builtin_service_name(port))
        .unwrap_or(UNKNOWN_SERVICE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Network services, Internet style
tcpmux          1/tcp                           # TCP port service multiplexer
ssh             22/tcp                          # SSH Remote Login Protocol
domain          53/tcp                          # Domain Name Server
domain          53/udp
bootps          67/udp
syslog          514/udp
shell           514/tcp         cmd             # no passwords used
sctp-thing      9/sctp
broken          notaport/tcp
";

    #[test]
    fn test_parse_services() {
        let services = parse_services(SAMPLE);
        assert_eq!(services.get(&(22, Transport::Tcp)).map(String::as_str), Some("ssh"));
        assert_eq!(services.get(&(53, Transport::Udp)).map(String::as_str), Some("domain"));
        assert_eq!(services.get(&(514, Transport::Udp)).map(String::as_str), Some("syslog"));
        assert_eq!(services.get(&(514, Transport::Tcp)).map(String::as_str), Some("shell"));
        assert!(services.get(&(22, Transport::Udp)).is_none());
        assert_eq!(services.len(), 7);
    }

    #[test]
    fn test_builtin_ports() {
        assert_eq!(builtin_service_name(22), Some("ssh"));
        assert_eq!(builtin_service_name(53), Some("domain"));
        assert_eq!(builtin_service_name(443), Some("https"));
        assert_eq!(builtin_service_name(12345), None);
    }

    #[test]
    fn test_service_name_never_fails() {
        let port = Port::new(22).unwrap();
        assert_eq!(service_name(port, Transport::Tcp), "ssh");
        assert_eq!(service_name(Port::new(65123).unwrap(), Transport::Udp), UNKNOWN_SERVICE);
    }
}
