//! Rule constraint functions for firewall rules
//!
//! This module centralizes business logic about valid field combinations.
//! It's used by draft resolution, catalog loading and the wizard's custom
//! service step so all three agree on what a well-formed rule looks like.
//!
//! # Examples
//!
//! ```
//! use vmfw::core::firewall::Protocol;
//! use vmfw::core::rule_constraints::*;
//!
//! assert!(protocol_supports_ports(Protocol::Tcp));
//! assert!(!protocol_supports_ports(Protocol::Icmp));
//!
//! assert_eq!(effective_protocol(None, true), Protocol::Tcp);
//! assert_eq!(effective_protocol(None, false), Protocol::All);
//! ```

use super::firewall::Protocol;
use super::ports::PortRange;

// ═══════════════════════════════════════════════════════════════════════════
// Protocol Constraints
// ═══════════════════════════════════════════════════════════════════════════

/// Returns `true` if the protocol supports port filtering.
///
/// Only TCP and UDP use ports. ICMP and "all" rules cannot carry a port
/// constraint.
///
/// # Examples
///
/// ```
/// use vmfw::core::firewall::Protocol;
/// use vmfw::core::rule_constraints::protocol_supports_ports;
///
/// assert!(protocol_supports_ports(Protocol::Tcp));
/// assert!(protocol_supports_ports(Protocol::Udp));
/// assert!(!protocol_supports_ports(Protocol::All));
/// assert!(!protocol_supports_ports(Protocol::Icmp));
/// ```
#[inline]
pub fn protocol_supports_ports(protocol: Protocol) -> bool {
    matches!(protocol, Protocol::Tcp | Protocol::Udp)
}

/// Resolves the protocol a rule will actually match.
///
/// An explicit protocol always wins. Without one, a rule that names ports
/// is TCP and a rule without ports matches every protocol.
#[inline]
pub fn effective_protocol(protocol: Option<Protocol>, has_ports: bool) -> Protocol {
    match protocol {
        Some(protocol) => protocol,
        None if has_ports => Protocol::Tcp,
        None => Protocol::All,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Fragment Constraints
// ═══════════════════════════════════════════════════════════════════════════

/// Checks a catalog or custom fragment's protocol/port pairing.
///
/// # Errors
///
/// Returns `Err` when ports are attached to a protocol without ports.
///
/// # Examples
///
/// ```
/// use vmfw::core::firewall::Protocol;
/// use vmfw::core::ports::PortRange;
/// use vmfw::core::rule_constraints::check_fragment;
///
/// assert!(check_fragment(Protocol::Udp, Some(PortRange::single(53))).is_ok());
/// assert!(check_fragment(Protocol::Icmp, None).is_ok());
/// assert!(check_fragment(Protocol::Icmp, Some(PortRange::single(7))).is_err());
/// ```
pub fn check_fragment(protocol: Protocol, ports: Option<PortRange>) -> Result<(), String> {
    match ports {
        Some(range) if !protocol_supports_ports(protocol) => Err(format!(
            "Protocol {} cannot be combined with port {range}",
            protocol.display_name()
        )),
        Some(range) if range.start == 0 || range.start > range.end => {
            Err(format!("Port range {range} is invalid"))
        }
        _ => Ok(()),
    }
}
