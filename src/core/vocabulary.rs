//! Vocabulary normalization between the dashboard and the backend
//!
//! The dashboard speaks `allow`/`deny`/`reject` and `inbound`/`outbound`/`bidirectional`;
//! the Rule Store speaks `accept`/`drop`/`reject` and `in`/`out`/`inout`.
//!
//! | backend | user |
//! |---|---|
//! | accept | allow |
//! | drop | deny |
//! | reject | reject |
//! | in | inbound |
//! | out | outbound |
//! | inout | bidirectional |
//!
//! The string functions are total: unknown input passes through lower-cased so
//! display code keeps working when the backend grows new enum values. Callers that
//! need strictness use [`Action::from_term`] / [`Direction::from_term`] or the
//! validator.
//!
//! # Example
//!
//! ```
//! use vmfw::core::vocabulary::{denormalize_action, normalize_action, normalize_direction};
//!
//! assert_eq!(normalize_action(Some("ACCEPT")), "allow");
//! assert_eq!(denormalize_action(Some("deny")), "drop");
//! assert_eq!(normalize_direction(Some("inout")), "bidirectional");
//! assert_eq!(normalize_action(Some("Quarantine")), "quarantine");
//! ```

use serde::{Deserialize, Serialize};

/// Rule action in dashboard vocabulary
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
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Action {
    /// Let matching traffic through
    #[default]
    #[serde(rename = "allow", alias = "ALLOW", alias = "accept", alias = "ACCEPT")]
    #[strum(serialize = "allow")]
    Allow,
    /// Silently discard matching traffic
    #[serde(rename = "deny", alias = "DENY", alias = "drop", alias = "DROP")]
    #[strum(serialize = "deny")]
    Deny,
    /// Discard matching traffic and tell the sender
    #[serde(rename = "reject", alias = "REJECT")]
    #[strum(serialize = "reject")]
    Reject,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Deny => "deny",
            Action::Reject => "reject",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Action::Allow => "Allow",
            Action::Deny => "Deny",
            Action::Reject => "Reject",
        }
    }

    /// Deny and reject both block traffic
    pub const fn is_restrictive(self) -> bool {
        matches!(self, Action::Deny | Action::Reject)
    }

    /// Parses a term from either vocabulary, case-insensitively
    pub fn from_term(term: &str) -> Option<Self> {
        normalize_action(Some(term)).parse().ok()
    }

    pub const fn to_backend(self) -> BackendAction {
        match self {
            Action::Allow => BackendAction::Accept,
            Action::Deny => BackendAction::Drop,
            Action::Reject => BackendAction::Reject,
        }
    }
}

/// Rule action in Rule Store vocabulary
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
#[strum(ascii_case_insensitive)]
pub enum BackendAction {
    #[serde(rename = "accept", alias = "ACCEPT")]
    #[strum(serialize = "accept")]
    Accept,
    #[serde(rename = "drop", alias = "DROP")]
    #[strum(serialize = "drop")]
    Drop,
    #[serde(rename = "reject", alias = "REJECT")]
    #[strum(serialize = "reject")]
    Reject,
}

impl BackendAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendAction::Accept => "accept",
            BackendAction::Drop => "drop",
            BackendAction::Reject => "reject",
        }
    }

    pub const fn to_user(self) -> Action {
        match self {
            BackendAction::Accept => Action::Allow,
            BackendAction::Drop => Action::Deny,
            BackendAction::Reject => Action::Reject,
        }
    }
}

impl From<Action> for BackendAction {
    fn from(action: Action) -> Self {
        action.to_backend()
    }
}

impl From<BackendAction> for Action {
    fn from(action: BackendAction) -> Self {
        action.to_user()
    }
}

/// Traffic direction in dashboard vocabulary
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
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Direction {
    #[default]
    #[serde(rename = "inbound", alias = "INBOUND", alias = "in", alias = "IN")]
    #[strum(serialize = "inbound")]
    Inbound,
    #[serde(rename = "outbound", alias = "OUTBOUND", alias = "out", alias = "OUT")]
    #[strum(serialize = "outbound")]
    Outbound,
    #[serde(
        rename = "bidirectional",
        alias = "BIDIRECTIONAL",
        alias = "inout",
        alias = "INOUT"
    )]
    #[strum(serialize = "bidirectional")]
    Bidirectional,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
            Direction::Bidirectional => "bidirectional",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Direction::Inbound => "Inbound",
            Direction::Outbound => "Outbound",
            Direction::Bidirectional => "Both directions",
        }
    }

    /// Parses a term from either vocabulary, case-insensitively
    pub fn from_term(term: &str) -> Option<Self> {
        normalize_direction(Some(term)).parse().ok()
    }

    pub const fn to_backend(self) -> BackendDirection {
        match self {
            Direction::Inbound => BackendDirection::In,
            Direction::Outbound => BackendDirection::Out,
            Direction::Bidirectional => BackendDirection::InOut,
        }
    }
}

/// Traffic direction in Rule Store vocabulary
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
#[strum(ascii_case_insensitive)]
pub enum BackendDirection {
    #[serde(rename = "in", alias = "IN")]
    #[strum(serialize = "in")]
    In,
    #[serde(rename = "out", alias = "OUT")]
    #[strum(serialize = "out")]
    Out,
    #[serde(rename = "inout", alias = "INOUT")]
    #[strum(serialize = "inout")]
    InOut,
}

impl BackendDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendDirection::In => "in",
            BackendDirection::Out => "out",
            BackendDirection::InOut => "inout",
        }
    }

    pub const fn to_user(self) -> Direction {
        match self {
            BackendDirection::In => Direction::Inbound,
            BackendDirection::Out => Direction::Outbound,
            BackendDirection::InOut => Direction::Bidirectional,
        }
    }
}

impl From<Direction> for BackendDirection {
    fn from(direction: Direction) -> Self {
        direction.to_backend()
    }
}

impl From<BackendDirection> for Direction {
    fn from(direction: BackendDirection) -> Self {
        direction.to_user()
    }
}

fn lookup(value: Option<&str>, table: &[(&str, &'static str)]) -> String {
    let Some(raw) = value else {
        return String::new();
    };
    let key = raw.trim().to_lowercase();
    table
        .iter()
        .find(|(from, _)| *from == key)
        .map_or_else(|| raw.to_lowercase(), |(_, to)| (*to).to_string())
}

/// Backend → user action (`accept` → `allow`). User terms map to themselves.
pub fn normalize_action(value: Option<&str>) -> String {
    lookup(
        value,
        &[
            ("accept", "allow"),
            ("allow", "allow"),
            ("drop", "deny"),
            ("deny", "deny"),
            ("reject", "reject"),
        ],
    )
}

/// User → backend action (`allow` → `accept`). Backend terms map to themselves.
pub fn denormalize_action(value: Option<&str>) -> String {
    lookup(
        value,
        &[
            ("allow", "accept"),
            ("accept", "accept"),
            ("deny", "drop"),
            ("drop", "drop"),
            ("reject", "reject"),
        ],
    )
}

/// Backend → user direction (`in` → `inbound`). User terms map to themselves.
pub fn normalize_direction(value: Option<&str>) -> String {
    lookup(
        value,
        &[
            ("in", "inbound"),
            ("inbound", "inbound"),
            ("out", "outbound"),
            ("outbound", "outbound"),
            ("inout", "bidirectional"),
            ("bidirectional", "bidirectional"),
        ],
    )
}

/// User → backend direction (`inbound` → `in`). Backend terms map to themselves.
pub fn denormalize_direction(value: Option<&str>) -> String {
    lookup(
        value,
        &[
            ("inbound", "in"),
            ("in", "in"),
            ("outbound", "out"),
            ("out", "out"),
            ("bidirectional", "inout"),
            ("inout", "inout"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_mapping_table() {
        assert_eq!(normalize_action(Some("accept")), "allow");
        assert_eq!(normalize_action(Some("drop")), "deny");
        assert_eq!(normalize_action(Some("reject")), "reject");
        assert_eq!(normalize_direction(Some("in")), "inbound");
        assert_eq!(normalize_direction(Some("out")), "outbound");
        assert_eq!(normalize_direction(Some("inout")), "bidirectional");

        assert_eq!(denormalize_action(Some("allow")), "accept");
        assert_eq!(denormalize_action(Some("deny")), "drop");
        assert_eq!(denormalize_action(Some("reject")), "reject");
        assert_eq!(denormalize_direction(Some("inbound")), "in");
        assert_eq!(denormalize_direction(Some("outbound")), "out");
        assert_eq!(denormalize_direction(Some("bidirectional")), "inout");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(normalize_action(Some("ACCEPT")), "allow");
        assert_eq!(normalize_direction(Some("InOut")), "bidirectional");
        assert_eq!(denormalize_action(Some("Deny")), "drop");
        assert_eq!(denormalize_direction(Some("OUTBOUND")), "out");
    }

    #[test]
    fn test_unknown_passes_through_lowercased() {
        assert_eq!(normalize_action(Some("Quarantine")), "quarantine");
        assert_eq!(denormalize_action(Some("LOG")), "log");
        assert_eq!(normalize_direction(Some("Forward")), "forward");
        assert_eq!(denormalize_direction(Some("sideways")), "sideways");
    }

    #[test]
    fn test_empty_and_missing() {
        assert_eq!(normalize_action(None), "");
        assert_eq!(normalize_action(Some("")), "");
        assert_eq!(denormalize_direction(None), "");
    }

    #[test]
    fn test_typed_round_trip() {
        for action in Action::iter() {
            assert_eq!(action.to_backend().to_user(), action);
            assert_eq!(
                denormalize_action(Some(action.as_str())),
                action.to_backend().as_str()
            );
        }
        for direction in Direction::iter() {
            assert_eq!(direction.to_backend().to_user(), direction);
            assert_eq!(
                denormalize_direction(Some(direction.as_str())),
                direction.to_backend().as_str()
            );
        }
    }

    #[test]
    fn test_from_term_accepts_both_vocabularies() {
        assert_eq!(Action::from_term("accept"), Some(Action::Allow));
        assert_eq!(Action::from_term("Deny"), Some(Action::Deny));
        assert_eq!(Action::from_term("log"), None);
        assert_eq!(Direction::from_term("INOUT"), Some(Direction::Bidirectional));
        assert_eq!(Direction::from_term(""), None);
    }

    #[test]
    fn test_serde_accepts_backend_aliases() {
        let action: Action = serde_json::from_str("\"DROP\"").unwrap();
        assert_eq!(action, Action::Deny);
        let direction: BackendDirection = serde_json::from_str("\"INOUT\"").unwrap();
        assert_eq!(direction, BackendDirection::InOut);
        assert_eq!(serde_json::to_string(&Action::Allow).unwrap(), "\"allow\"");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_action_round_trip_is_idempotent(
            term in prop::sample::select(vec!["allow", "deny", "reject", "Allow", "DENY"])
        ) {
            let once = normalize_action(Some(term));
            let through_backend = normalize_action(Some(&denormalize_action(Some(term))));
            prop_assert_eq!(through_backend, once);
        }

        #[test]
        fn test_direction_round_trip_is_idempotent(
            term in prop::sample::select(vec!["inbound", "outbound", "bidirectional", "Inbound"])
        ) {
            let once = normalize_direction(Some(term));
            let through_backend = normalize_direction(Some(&denormalize_direction(Some(term))));
            prop_assert_eq!(through_backend, once);
        }

        #[test]
        fn test_normalizers_never_panic(input in "\\PC*") {
            let _ = normalize_action(Some(&input));
            let _ = denormalize_action(Some(&input));
            let _ = normalize_direction(Some(&input));
            let _ = denormalize_direction(Some(&input));
        }

        #[test]
        fn test_unknown_terms_lowercase(input in "[a-zA-Z]{8,16}") {
            let lower = input.to_lowercase();
            prop_assume!(!["bidirectional", "outbound"].contains(&lower.as_str()));
            prop_assert_eq!(normalize_action(Some(&input)), lower.clone());
            prop_assert_eq!(normalize_direction(Some(&input)), lower);
        }
    }
}
