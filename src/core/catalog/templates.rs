//! Built-in firewall templates

use super::{FirewallTemplate, TemplateCategory, TemplateRuleFragment};
use crate::core::firewall::Protocol;
use crate::core::ports::PortRange;
use crate::core::vocabulary::{Action, Direction};

fn block(
    action: Action,
    protocol: Protocol,
    port: Option<u16>,
    priority: Option<i32>,
    description: &str,
) -> TemplateRuleFragment {
    TemplateRuleFragment {
        action,
        direction: Direction::Inbound,
        protocol,
        ports: port.map(PortRange::single),
        priority,
        description: description.to_string(),
    }
}

fn template(
    id: &str,
    name: &str,
    description: &str,
    category: TemplateCategory,
    services: &[&str],
    custom_rules: Vec<TemplateRuleFragment>,
    base_priority: i32,
) -> FirewallTemplate {
    FirewallTemplate {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        services: services.iter().map(|s| (*s).to_string()).collect(),
        custom_rules,
        base_priority,
    }
}

pub(super) fn builtin_templates() -> Vec<FirewallTemplate> {
    vec![
        template(
            "web-server",
            "Web Server",
            "HTTPS only, with plain HTTP blocked",
            TemplateCategory::Web,
            &["https", "dns", "ssh"],
            vec![block(
                Action::Deny,
                Protocol::Tcp,
                Some(80),
                Some(90),
                "Block plain HTTP",
            )],
            100,
        ),
        template(
            "database-server",
            "Database Server",
            "SQL engines reachable, Redis kept private",
            TemplateCategory::Database,
            &["postgresql", "mysql", "ssh", "dns"],
            vec![block(
                Action::Deny,
                Protocol::Tcp,
                Some(6379),
                None,
                "Keep Redis private",
            )],
            200,
        ),
        template(
            "mail-server",
            "Mail Server",
            "Mail transfer, submission and secure mailbox access",
            TemplateCategory::Email,
            &["smtp", "submission", "imaps", "pop3s", "dns"],
            Vec::new(),
            300,
        ),
        template(
            "remote-desktop",
            "Remote Desktop Host",
            "RDP and VNC access with Telnet refused",
            TemplateCategory::Remote,
            &["rdp", "vnc", "dns"],
            vec![block(
                Action::Reject,
                Protocol::Tcp,
                Some(23),
                None,
                "Refuse Telnet",
            )],
            400,
        ),
        template(
            "file-server",
            "File Server",
            "SMB and NFS shares, legacy FTP blocked",
            TemplateCategory::File,
            &["smb", "nfs", "dns"],
            vec![block(
                Action::Deny,
                Protocol::Tcp,
                Some(21),
                None,
                "Block FTP control",
            )],
            500,
        ),
        template(
            "lockdown",
            "Lockdown",
            "Administration and time sync only, everything else inbound dropped",
            TemplateCategory::Security,
            &["ssh", "dns", "ntp"],
            vec![block(
                Action::Deny,
                Protocol::All,
                None,
                Some(1000),
                "Drop all other inbound traffic",
            )],
            10,
        ),
        template(
            "dev-workstation",
            "Developer Workstation",
            "Local dev server, SSH, DNS and ping",
            TemplateCategory::Development,
            &["http-alt", "ssh", "dns", "ping"],
            Vec::new(),
            600,
        ),
    ]
}
