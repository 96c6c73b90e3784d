//! Firewall rule data structures
//!
//! Three rule shapes flow through the engine:
//!
//! - [`RuleDraft`]: raw user-vocabulary strings collected by the wizard, pre-validation
//! - [`TemplateRule`]: typed output of template expansion, still user vocabulary
//! - [`ConcreteRule`]: validated, backend-vocabulary rule with exactly one port range
//!
//! Only [`ConcreteRule`] crosses to the Rule Store. The sole way to build one from
//! user input is [`RuleDraft::to_concrete_rules`], which runs the validator first.
//!
//! # Limits
//!
//! A scope holds at most [`MAX_RULES`] rules.
//!
//! # Example
//!
//! ```
//! use vmfw::core::firewall::{Protocol, RuleDraft};
//! use vmfw::core::vocabulary::{BackendAction, BackendDirection};
//!
//! let draft = RuleDraft::new("allow", "inbound")
//!     .with_protocol("tcp")
//!     .with_port("80, 443");
//!
//! let rules = draft.to_concrete_rules().unwrap();
//! assert_eq!(rules.len(), 2);
//! assert_eq!(rules[0].action, BackendAction::Accept);
//! assert_eq!(rules[0].direction, BackendDirection::In);
//! assert_eq!(rules[1].protocol, Protocol::Tcp);
//! ```

use crate::core::error::FieldErrors;
use crate::core::ports::{self, PortRange};
use crate::core::risk::{self, RiskAssessment};
use crate::core::rule_constraints::{effective_protocol, protocol_supports_ports};
use crate::core::vocabulary::{
    Action, BackendAction, BackendDirection, Direction, normalize_action, normalize_direction,
};
use crate::validators;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Maximum number of rules the Rule Store keeps per scope
pub const MAX_RULES: usize = 1000;

/// Priority given to drafts that do not set one
pub const DEFAULT_PRIORITY: i32 = 100;

/// Network protocol type for firewall rules
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Protocol {
    /// Transmission Control Protocol
    #[strum(serialize = "tcp")]
    Tcp,
    /// User Datagram Protocol
    #[strum(serialize = "udp")]
    Udp,
    /// Internet Control Message Protocol (IPv4)
    #[strum(serialize = "icmp")]
    Icmp,
    /// Match all protocols
    #[strum(serialize = "all")]
    All,
}

impl Protocol {
    pub const fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::All => "all",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Icmp => "ICMP",
            Protocol::All => "ANY",
        }
    }
}

/// Where a rule came from
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Origin {
    /// Authored by the user in the wizard
    #[default]
    Custom,
    /// Produced by template expansion
    Template,
}

/// Read-only view shared by every rule shape
///
/// The Risk Scorer and Priority Sorter work on this trait so they accept drafts,
/// template rules and concrete rules alike. Terms may be in either vocabulary.
pub trait RuleFacts {
    fn action_term(&self) -> &str;
    fn direction_term(&self) -> &str;
    /// Raw port specification; empty means "any port"
    fn port_spec(&self) -> Cow<'_, str>;
    fn origin(&self) -> Origin;
}

/// User-vocabulary rule as entered, before validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleDraft {
    /// Optional identifying label; validated when present
    pub name: Option<String>,
    pub action: String,
    pub direction: String,
    pub protocol: Option<String>,
    /// Raw port specification (`"22"`, `"80,443"`, `"8000-8100"`, `"*"`)
    pub port: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub priority: i32,
    pub comment: Option<String>,
    pub origin: Origin,
}

impl Default for RuleDraft {
    fn default() -> Self {
        Self {
            name: None,
            action: String::new(),
            direction: String::new(),
            protocol: None,
            port: None,
            source: None,
            destination: None,
            priority: DEFAULT_PRIORITY,
            comment: None,
            origin: Origin::Custom,
        }
    }
}

impl RuleDraft {
    pub fn new(action: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            direction: direction.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Validates the draft and resolves it into backend-vocabulary rules.
    ///
    /// One [`ConcreteRule`] is produced per parsed port token, so `"22,80"` becomes
    /// two rules. A wildcard port produces one rule with no port constraint.
    ///
    /// # Errors
    ///
    /// Returns every validation problem, keyed by field. Ports combined with a
    /// protocol that has none (`icmp`) are rejected here too.
    pub fn to_concrete_rules(&self) -> Result<Vec<ConcreteRule>, FieldErrors> {
        let validation = validators::validate_rule(self);
        if !validation.is_valid {
            return Err(validation.field_errors);
        }

        let mut errors = FieldErrors::new();

        let action = Action::from_term(&self.action);
        if action.is_none() {
            errors.add("action", format!("Invalid action '{}'", self.action));
        }
        let direction = Direction::from_term(&self.direction);
        if direction.is_none() {
            errors.add("direction", format!("Invalid direction '{}'", self.direction));
        }

        let spans = match ports::parse_ports(self.port.as_deref().unwrap_or_default()) {
            Ok(spans) => spans,
            Err(e) => {
                errors.add("port", e.to_string());
                Vec::new()
            }
        };
        let mut ranges = Vec::with_capacity(spans.len());
        for span in spans {
            match span.to_port_range() {
                Ok(range) => ranges.push(range),
                Err(msg) => errors.add("port", msg),
            }
        }

        let protocol = match self.protocol.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.parse::<Protocol>().ok(),
            _ => None,
        };
        let protocol = effective_protocol(protocol, !ranges.is_empty());
        if !ranges.is_empty() && !protocol_supports_ports(protocol) {
            errors.add(
                "port",
                format!("Protocol {} does not use ports", protocol.display_name()),
            );
        }

        let source = parse_address(self.source.as_deref(), "source", &mut errors);
        let destination = parse_address(self.destination.as_deref(), "destination", &mut errors);

        let (Some(action), Some(direction)) = (action, direction) else {
            return Err(errors);
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        let comment = self
            .comment
            .as_deref()
            .or(self.name.as_deref())
            .map(validators::sanitize_label)
            .filter(|c| !c.trim().is_empty());

        let port_slots: Vec<Option<PortRange>> = if ranges.is_empty() {
            vec![None]
        } else {
            ranges.into_iter().map(Some).collect()
        };

        Ok(port_slots
            .into_iter()
            .map(|ports| ConcreteRule {
                action: action.to_backend(),
                direction: direction.to_backend(),
                protocol,
                ports,
                source,
                destination,
                priority: self.priority,
                comment: comment.clone(),
                origin: self.origin,
            })
            .collect())
    }
}

fn parse_address(value: Option<&str>, field: &str, errors: &mut FieldErrors) -> Option<Ipv4Network> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match validators::validate_ipv4_cidr(value) {
        Ok(net) => Some(net),
        Err(msg) => {
            errors.add(field, msg);
            None
        }
    }
}

impl RuleFacts for RuleDraft {
    fn action_term(&self) -> &str {
        &self.action
    }

    fn direction_term(&self) -> &str {
        &self.direction
    }

    fn port_spec(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.port.as_deref().unwrap_or_default())
    }

    fn origin(&self) -> Origin {
        self.origin
    }
}

/// Backend-vocabulary rule handed to the Rule Store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConcreteRule {
    pub action: BackendAction,
    pub direction: BackendDirection,
    pub protocol: Protocol,
    /// `None` matches any port
    pub ports: Option<PortRange>,
    pub source: Option<Ipv4Network>,
    pub destination: Option<Ipv4Network>,
    pub priority: i32,
    pub comment: Option<String>,
    pub origin: Origin,
}

impl ConcreteRule {
    /// Maps a stored rule back to user vocabulary for editing.
    pub fn to_draft(&self) -> RuleDraft {
        RuleDraft {
            name: None,
            action: normalize_action(Some(self.action.as_str())),
            direction: normalize_direction(Some(self.direction.as_str())),
            protocol: match (self.protocol, self.ports) {
                (Protocol::All, None) => None,
                (protocol, _) => Some(protocol.as_str().to_string()),
            },
            port: self.ports.map(|p| p.to_string()),
            source: self.source.map(|n| n.to_string()),
            destination: self.destination.map(|n| n.to_string()),
            priority: self.priority,
            comment: self.comment.clone(),
            origin: self.origin,
        }
    }
}

impl RuleFacts for ConcreteRule {
    fn action_term(&self) -> &str {
        self.action.as_str()
    }

    fn direction_term(&self) -> &str {
        self.direction.as_str()
    }

    fn port_spec(&self) -> Cow<'_, str> {
        match self.ports {
            Some(range) => Cow::Owned(range.to_string()),
            None => Cow::Borrowed(""),
        }
    }

    fn origin(&self) -> Origin {
        self.origin
    }
}

/// Which part of a template produced a [`TemplateRule`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Provenance {
    /// Expanded from the named service preset
    Preset(String),
    /// One of the template's own custom rules
    Custom,
}

/// One rule produced by template expansion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateRule {
    pub action: Action,
    pub direction: Direction,
    pub protocol: Protocol,
    pub ports: Option<PortRange>,
    pub priority: i32,
    pub description: String,
    pub provenance: Provenance,
}

impl TemplateRule {
    pub fn to_draft(&self) -> RuleDraft {
        RuleDraft {
            name: None,
            action: self.action.as_str().to_string(),
            direction: self.direction.as_str().to_string(),
            protocol: match self.protocol {
                Protocol::All => None,
                protocol => Some(protocol.as_str().to_string()),
            },
            port: self.ports.map(|p| p.to_string()),
            source: None,
            destination: None,
            priority: self.priority,
            comment: Some(self.description.clone()),
            origin: Origin::Template,
        }
    }
}

impl RuleFacts for TemplateRule {
    fn action_term(&self) -> &str {
        self.action.as_str()
    }

    fn direction_term(&self) -> &str {
        self.direction.as_str()
    }

    fn port_spec(&self) -> Cow<'_, str> {
        match self.ports {
            Some(range) => Cow::Owned(range.to_string()),
            None => Cow::Borrowed(""),
        }
    }

    fn origin(&self) -> Origin {
        Origin::Template
    }
}

/// A stored rule rendered in user vocabulary
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuleDisplay {
    pub action: String,
    pub direction: String,
    pub protocol: &'static str,
    pub ports: String,
    pub source: String,
    pub destination: String,
    pub priority: i32,
    pub comment: String,
    pub origin: Origin,
    pub risk: RiskAssessment,
    /// Informational hints (well-known ports, reserved ranges)
    pub notes: Vec<String>,
}

impl fmt::Display for RuleDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} port {} from {} to {} (priority {}) [{}]",
            self.action,
            self.direction,
            self.protocol,
            self.ports,
            self.source,
            self.destination,
            self.priority,
            self.risk.label
        )?;
        if !self.comment.is_empty() {
            write!(f, " - {}", self.comment)?;
        }
        Ok(())
    }
}

fn display_term(term: &str) -> String {
    let mut chars = term.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Renders a backend rule for the presentation layer.
///
/// Action and direction go through the normalizer, so the output never shows
/// backend vocabulary. Absent ports and addresses read `Any`.
pub fn format_rule_for_display(rule: &ConcreteRule) -> RuleDisplay {
    let direction = match rule.direction.to_user() {
        Direction::Bidirectional => Direction::Bidirectional.display_name().to_string(),
        _ => display_term(&normalize_direction(Some(rule.direction.as_str()))),
    };

    let mut notes = Vec::new();
    if let Some(range) = rule.ports
        && range.is_single()
        && let Some(note) = validators::check_well_known_port(range.start)
    {
        notes.push(note);
    }
    for net in [rule.source, rule.destination].into_iter().flatten() {
        if let Some(note) = validators::check_reserved_ip(net) {
            notes.push(note);
        }
    }

    RuleDisplay {
        action: display_term(&normalize_action(Some(rule.action.as_str()))),
        direction,
        protocol: rule.protocol.display_name(),
        ports: rule.ports.map_or_else(|| "Any".to_string(), |p| p.to_string()),
        source: rule.source.map_or_else(|| "Any".to_string(), |n| n.to_string()),
        destination: rule
            .destination
            .map_or_else(|| "Any".to_string(), |n| n.to_string()),
        priority: rule.priority,
        comment: rule.comment.clone().unwrap_or_default(),
        origin: rule.origin,
        risk: risk::calculate_risk_level(rule),
        notes,
    }
}
