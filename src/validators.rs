//! Input validation and sanitization functions
//!
//! This module provides centralized validation for all user inputs so that
//! drafts only reach the Rule Store once every field checks out.
//!
//! [`validate_rule`] never fails: it always returns a [`ValidationResult`] listing
//! every problem so a half-filled wizard step can show all of them inline.

use crate::core::error::FieldErrors;
use crate::core::firewall::RuleDraft;
use crate::core::ports::{self, MAX_PORT, MIN_PORT};
use crate::core::vocabulary::{Action, Direction};
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

/// Maximum label/comment length accepted by the Rule Store
pub const MAX_LABEL_LEN: usize = 64;

/// Sanitizes a label for safe use as a rule comment.
///
/// Removes control characters, quotes, and shell metacharacters.
/// Limits length to 64 bytes (ASCII characters only).
///
/// # Examples
///
/// ```
/// use vmfw::validators::sanitize_label;
///
/// let safe = sanitize_label("Normal Label");
/// assert_eq!(safe, "Normal Label");
///
/// let unsafe_label = "Test\nNewline\"Quote";
/// let safe = sanitize_label(unsafe_label);
/// assert!(!safe.contains('\n'));
/// assert!(!safe.contains('"'));
/// ```
pub fn sanitize_label(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | ':'))
        .take(MAX_LABEL_LEN)
        .collect()
}

/// Validates and sanitizes a rule label.
///
/// # Errors
///
/// Returns `Err` if:
/// - Label is blank
/// - Label exceeds 64 characters
/// - Label becomes empty after sanitization (all invalid chars)
pub fn validate_label(input: &str) -> Result<String, String> {
    if input.trim().is_empty() {
        return Err("Rule name cannot be empty".to_string());
    }

    if input.len() > MAX_LABEL_LEN {
        return Err(format!("Rule name too long (max {MAX_LABEL_LEN} characters)"));
    }

    let sanitized = sanitize_label(input);

    if sanitized.trim().is_empty() {
        return Err("Rule name contains only invalid characters".to_string());
    }

    Ok(sanitized)
}

/// Validates a single port number.
///
/// # Errors
///
/// Returns `Err` if port is 0 (reserved).
pub fn validate_port(port: u16) -> Result<u16, String> {
    if port == 0 {
        Err(format!("Port must be between {MIN_PORT} and {MAX_PORT}"))
    } else {
        Ok(port)
    }
}

/// Validates a port range.
///
/// # Errors
///
/// Returns `Err` if:
/// - Either port is 0
/// - Start port is greater than end port
pub fn validate_port_range(start: u16, end: u16) -> Result<(u16, u16), String> {
    validate_port(start)?;
    validate_port(end)?;

    if start > end {
        Err(format!(
            "Port range {start}-{end} is invalid: start must be less than or equal to end"
        ))
    } else {
        Ok((start, end))
    }
}

/// Validates a full port specification (single, range, or comma list).
///
/// Wildcards (`""`, `*`, `all`) are valid and mean "any port".
///
/// # Errors
///
/// Returns one message per offending token.
pub fn validate_port_spec(spec: &str) -> Result<(), Vec<String>> {
    let spans = ports::parse_ports(spec).map_err(|e| vec![e.to_string()])?;
    let errors: Vec<String> = spans
        .into_iter()
        .filter_map(|span| span.to_port_range().err())
        .collect();

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Validates an IPv4 address with an optional `/0`-`/32` CIDR suffix.
///
/// # Errors
///
/// Returns `Err` if the address is not a dotted quad or the mask is out of range.
///
/// # Examples
///
/// ```
/// use vmfw::validators::validate_ipv4_cidr;
///
/// assert!(validate_ipv4_cidr("10.0.0.0/8").is_ok());
/// assert!(validate_ipv4_cidr("192.168.1.10").is_ok());
/// assert!(validate_ipv4_cidr("10.0.0.0/33").is_err());
/// assert!(validate_ipv4_cidr("10.0.0").is_err());
/// ```
pub fn validate_ipv4_cidr(input: &str) -> Result<Ipv4Network, String> {
    let input = input.trim();
    let (addr, prefix) = match input.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (input, None),
    };

    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|_| format!("'{input}' is not a valid IPv4 address"))?;

    let prefix = match prefix {
        None => 32,
        Some(p) if !p.is_empty() && p.len() <= 2 && p.bytes().all(|b| b.is_ascii_digit()) => p
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| format!("CIDR mask /{p} is out of range (/0-/32)"))?,
        Some(p) => return Err(format!("CIDR mask /{p} is out of range (/0-/32)")),
    };

    Ipv4Network::new(addr, prefix).map_err(|e| format!("Invalid network '{input}': {e}"))
}

/// Result of [`validate_rule`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Messages in check order
    pub errors: Vec<String>,
    /// The same messages keyed by field
    pub field_errors: FieldErrors,
}

impl ValidationResult {
    fn push(&mut self, field: &str, message: String) {
        self.field_errors.add(field, message.clone());
        self.errors.push(message);
    }
}

/// Validates a single rule draft, accumulating every applicable error.
///
/// Checks, in order: name, action, direction, protocol, port bounds, source and
/// destination address syntax. Action and direction accept either vocabulary.
pub fn validate_rule(rule: &RuleDraft) -> ValidationResult {
    let mut result = ValidationResult::default();

    if let Some(ref name) = rule.name
        && let Err(msg) = validate_label(name)
    {
        result.push("name", msg);
    }

    if rule.action.trim().is_empty() {
        result.push("action", "Action is required".to_string());
    } else if Action::from_term(&rule.action).is_none() {
        result.push(
            "action",
            format!(
                "Invalid action '{}' (expected allow, deny or reject)",
                rule.action
            ),
        );
    }

    if rule.direction.trim().is_empty() {
        result.push("direction", "Direction is required".to_string());
    } else if Direction::from_term(&rule.direction).is_none() {
        result.push(
            "direction",
            format!(
                "Invalid direction '{}' (expected inbound, outbound or bidirectional)",
                rule.direction
            ),
        );
    }

    if let Some(ref protocol) = rule.protocol
        && !protocol.trim().is_empty()
        && !matches!(
            protocol.trim().to_ascii_lowercase().as_str(),
            "tcp" | "udp" | "icmp"
        )
    {
        result.push(
            "protocol",
            format!("Invalid protocol '{protocol}' (expected tcp, udp or icmp)"),
        );
    }

    if let Some(ref port) = rule.port
        && let Err(messages) = validate_port_spec(port)
    {
        for message in messages {
            result.push("port", message);
        }
    }

    for (field, label, value) in [
        ("source", "source", &rule.source),
        ("destination", "destination", &rule.destination),
    ] {
        if let Some(value) = value
            && !value.trim().is_empty()
            && let Err(msg) = validate_ipv4_cidr(value)
        {
            result.push(field, format!("Invalid {label} address: {msg}"));
        }
    }

    result.is_valid = result.errors.is_empty();
    result
}

/// Checks if a port is well-known and returns informational message.
///
/// This is informational only and does not block saving.
pub fn check_well_known_port(port: u16) -> Option<String> {
    if port <= 1024 {
        let name = match port {
            22 => "SSH",
            23 => "Telnet",
            80 => "HTTP",
            443 => "HTTPS",
            53 => "DNS",
            25 => "SMTP",
            21 => "FTP",
            445 => "SMB",
            _ => return Some(format!("Privileged port {port}")),
        };
        Some(format!("Port {port}: {name}"))
    } else {
        match port {
            3389 => Some("Port 3389: RDP".to_string()),
            5900 => Some("Port 5900: VNC".to_string()),
            _ => None,
        }
    }
}

/// Checks if a network is in a reserved range and returns informational warning.
///
/// This is informational only and does not block saving.
pub fn check_reserved_ip(net: Ipv4Network) -> Option<String> {
    let octets = net.ip().octets();

    if net.prefix() == 0 {
        return Some("Matches every IPv4 address (0.0.0.0/0)".to_string());
    }

    // RFC 1918 private ranges
    if octets[0] == 10
        || (octets[0] == 172 && (16..=31).contains(&octets[1]))
        || (octets[0] == 192 && octets[1] == 168)
    {
        return Some("Private IP range (RFC 1918) - internal network".to_string());
    }

    if octets[0] == 127 {
        return Some("Loopback range (127.x) - never leaves the VM".to_string());
    }

    if octets[0] == 169 && octets[1] == 254 {
        return Some("Link-local range (169.254.x.x) - APIPA addresses".to_string());
    }

    None
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_sanitize_label_never_exceeds_64_chars(input in "\\PC*") {
            prop_assert!(sanitize_label(&input).len() <= 64);
        }

        #[test]
        fn test_sanitize_label_no_dangerous_chars(input in "\\PC*") {
            let sanitized = sanitize_label(&input);
            prop_assert!(!sanitized.contains('"'));
            prop_assert!(!sanitized.contains('\''));
            prop_assert!(!sanitized.contains('$'));
            prop_assert!(!sanitized.contains(';'));
        }

        #[test]
        fn test_validate_port_range_consistency(start in 1u16..=65535, end in 1u16..=65535) {
            let result = validate_port_range(start, end);
            prop_assert_eq!(result.is_ok(), start <= end);
        }

        #[test]
        fn test_any_valid_prefix_accepted(a in any::<u8>(), b in any::<u8>(), prefix in 0u8..=32) {
            let input = format!("{a}.{b}.0.0/{prefix}");
            prop_assert!(validate_ipv4_cidr(&input).is_ok());
        }

        #[test]
        fn test_prefix_above_32_rejected(prefix in 33u32..=999) {
            let input = format!("10.0.0.0/{prefix}");
            prop_assert!(validate_ipv4_cidr(&input).is_err());
        }

        #[test]
        fn test_validate_rule_never_panics(
            action in "\\PC*",
            direction in "\\PC*",
            port in "\\PC*",
            source in "\\PC*",
        ) {
            let rule = RuleDraft {
                action,
                direction,
                port: Some(port),
                source: Some(source),
                ..RuleDraft::default()
            };
            let result = validate_rule(&rule);
            prop_assert_eq!(result.is_valid, result.errors.is_empty());
        }
    }
}
