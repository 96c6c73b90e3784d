//! Built-in service presets

use super::{ServiceCategory, ServicePreset, ServiceRule};
use crate::core::firewall::Protocol;
use crate::core::ports::PortRange;
use crate::core::risk::RiskLevel;
use crate::core::vocabulary::BackendDirection::{self, In, InOut, Out};

fn rule(
    protocol: Protocol,
    port: Option<PortRange>,
    direction: BackendDirection,
    description: &str,
) -> ServiceRule {
    ServiceRule {
        protocol,
        port,
        direction,
        description: description.to_string(),
    }
}

fn tcp(port: u16, direction: BackendDirection, description: &str) -> ServiceRule {
    rule(Protocol::Tcp, Some(PortRange::single(port)), direction, description)
}

fn udp(port: u16, direction: BackendDirection, description: &str) -> ServiceRule {
    rule(Protocol::Udp, Some(PortRange::single(port)), direction, description)
}

fn preset(
    id: &str,
    name: &str,
    category: ServiceCategory,
    risk: RiskLevel,
    rules: Vec<ServiceRule>,
) -> ServicePreset {
    ServicePreset {
        id: id.to_string(),
        name: name.to_string(),
        category,
        risk,
        rules,
    }
}

pub(super) fn builtin_services() -> Vec<ServicePreset> {
    use ServiceCategory::{Database, Email, File, Other, Remote, Web};

    vec![
        // Web
        preset("http", "HTTP", Web, RiskLevel::Low, vec![tcp(80, In, "Plain web traffic")]),
        preset("https", "HTTPS", Web, RiskLevel::Low, vec![tcp(443, In, "Secure web traffic")]),
        preset(
            "http-alt",
            "HTTP Alternate",
            Web,
            RiskLevel::Medium,
            vec![tcp(8080, In, "Development and proxy web traffic")],
        ),
        // Remote access
        preset("ssh", "SSH", Remote, RiskLevel::Medium, vec![tcp(22, In, "Secure shell")]),
        preset("rdp", "Remote Desktop", Remote, RiskLevel::High, vec![tcp(3389, In, "RDP sessions")]),
        preset(
            "vnc",
            "VNC",
            Remote,
            RiskLevel::High,
            vec![rule(
                Protocol::Tcp,
                Some(PortRange::new(5900, 5910)),
                In,
                "VNC displays 0-10",
            )],
        ),
        preset("telnet", "Telnet", Remote, RiskLevel::High, vec![tcp(23, In, "Unencrypted remote shell")]),
        // Databases
        preset("mysql", "MySQL", Database, RiskLevel::Medium, vec![tcp(3306, In, "MySQL server")]),
        preset(
            "postgresql",
            "PostgreSQL",
            Database,
            RiskLevel::Medium,
            vec![tcp(5432, In, "PostgreSQL server")],
        ),
        preset("mongodb", "MongoDB", Database, RiskLevel::Medium, vec![tcp(27017, In, "MongoDB server")]),
        preset("redis", "Redis", Database, RiskLevel::High, vec![tcp(6379, In, "Redis server")]),
        // Email
        preset("smtp", "SMTP", Email, RiskLevel::Medium, vec![tcp(25, In, "Mail transfer")]),
        preset("submission", "SMTP Submission", Email, RiskLevel::Low, vec![tcp(587, In, "Mail submission")]),
        preset("imaps", "IMAPS", Email, RiskLevel::Low, vec![tcp(993, In, "Secure IMAP")]),
        preset("pop3s", "POP3S", Email, RiskLevel::Low, vec![tcp(995, In, "Secure POP3")]),
        // File sharing
        preset(
            "ftp",
            "FTP",
            File,
            RiskLevel::High,
            vec![rule(
                Protocol::Tcp,
                Some(PortRange::new(20, 21)),
                In,
                "FTP data and control",
            )],
        ),
        preset(
            "smb",
            "SMB / Windows Shares",
            File,
            RiskLevel::High,
            vec![tcp(445, In, "SMB over TCP"), tcp(139, In, "NetBIOS session")],
        ),
        preset(
            "nfs",
            "NFS",
            File,
            RiskLevel::Medium,
            vec![tcp(2049, In, "NFS over TCP"), udp(2049, In, "NFS over UDP")],
        ),
        // Other
        preset(
            "dns",
            "DNS",
            Other,
            RiskLevel::Minimal,
            vec![udp(53, Out, "DNS queries"), tcp(53, Out, "DNS over TCP")],
        ),
        preset("ntp", "NTP", Other, RiskLevel::Minimal, vec![udp(123, Out, "Time sync")]),
        preset(
            "ping",
            "Ping",
            Other,
            RiskLevel::Low,
            vec![rule(Protocol::Icmp, None, InOut, "ICMP echo")],
        ),
        preset(
            "dhcp",
            "DHCP",
            Other,
            RiskLevel::Low,
            vec![rule(
                Protocol::Udp,
                Some(PortRange::new(67, 68)),
                InOut,
                "DHCP leases",
            )],
        ),
    ]
}
