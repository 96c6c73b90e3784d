//! Rule risk scoring
//!
//! An additive heuristic over normalized action, direction and port spec:
//!
//! | condition | weight |
//! |---|---|
//! | direction is inbound | +2 |
//! | action is allow | +2 |
//! | a single port from the commonly attacked set | +1 |
//! | port spec contains a range (`-`) | +2 |
//! | any port (empty, `*`, `all`) | +3 |
//!
//! Score ≥ 8 is high, ≥ 5 medium, ≥ 2 low, anything else minimal.
//!
//! # Example
//!
//! ```
//! use vmfw::core::firewall::RuleDraft;
//! use vmfw::core::risk::{calculate_risk_level, RiskLevel};
//!
//! let rule = RuleDraft::new("allow", "inbound").with_port("22");
//! let risk = calculate_risk_level(&rule);
//! assert_eq!(risk.score, 5);
//! assert_eq!(risk.level, RiskLevel::Medium);
//! ```

use crate::core::firewall::RuleFacts;
use crate::core::ports::is_wildcard;
use crate::core::vocabulary::{normalize_action, normalize_direction};
use serde::{Deserialize, Serialize};

/// Ports that see the most scanning and brute-force traffic
pub const COMMONLY_ATTACKED_PORTS: [u16; 6] = [22, 23, 80, 443, 3389, 5900];

const INBOUND_WEIGHT: u32 = 2;
const ALLOW_WEIGHT: u32 = 2;
const ATTACKED_PORT_WEIGHT: u32 = 1;
const RANGE_WEIGHT: u32 = 2;
const ANY_PORT_WEIGHT: u32 = 3;

const HIGH_THRESHOLD: u32 = 8;
const MEDIUM_THRESHOLD: u32 = 5;
const LOW_THRESHOLD: u32 = 2;

/// Discrete risk level, shared by rule scoring and catalog presets
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RiskLevel {
    #[default]
    Minimal,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn from_score(score: u32) -> Self {
        if score >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if score >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else if score >= LOW_THRESHOLD {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Minimal => "Minimal Risk",
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
        }
    }

    /// Badge color as a hex string
    pub const fn color(self) -> &'static str {
        match self {
            RiskLevel::Minimal => "#4caf50",
            RiskLevel::Low => "#8bc34a",
            RiskLevel::Medium => "#ff9800",
            RiskLevel::High => "#f44336",
        }
    }
}

/// Score plus presentation data for one rule
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub label: &'static str,
    pub color: &'static str,
}

impl RiskAssessment {
    pub const fn from_score(score: u32) -> Self {
        let level = RiskLevel::from_score(score);
        Self {
            score,
            level,
            label: level.label(),
            color: level.color(),
        }
    }
}

/// Raw additive score for a rule.
pub fn risk_score<R: RuleFacts + ?Sized>(rule: &R) -> u32 {
    let mut score = 0;

    if normalize_direction(Some(rule.direction_term())) == "inbound" {
        score += INBOUND_WEIGHT;
    }
    if normalize_action(Some(rule.action_term())) == "allow" {
        score += ALLOW_WEIGHT;
    }

    let spec = rule.port_spec();
    if is_wildcard(&spec) {
        score += ANY_PORT_WEIGHT;
    } else {
        let attacked = spec
            .split(',')
            .filter_map(|token| token.trim().parse::<u16>().ok())
            .any(|port| COMMONLY_ATTACKED_PORTS.contains(&port));
        if attacked {
            score += ATTACKED_PORT_WEIGHT;
        }
        if spec.contains('-') {
            score += RANGE_WEIGHT;
        }
    }

    score
}

/// Scores a rule and classifies it.
pub fn calculate_risk_level<R: RuleFacts + ?Sized>(rule: &R) -> RiskAssessment {
    RiskAssessment::from_score(risk_score(rule))
}
