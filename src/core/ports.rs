//! Port specification parsing
//!
//! Turns free-form port input (`"22"`, `"8000-8100"`, `"80, 443, 8080-8090"`) into
//! numeric spans. The parser only splits mechanically: it does not check the
//! 1-65535 bounds or `start <= end`. That is the validator's job, and
//! [`PortSpan::to_port_range`] is where a span becomes a checked [`PortRange`].
//!
//! Wildcards (empty, `*`, `all`) mean "any port" and parse to an empty list.
//!
//! # Example
//!
//! ```
//! use vmfw::core::ports::{parse_ports, parse_ports_for_single_range, PortSpan};
//!
//! let spans = parse_ports("80, 8000-8100").unwrap();
//! assert_eq!(spans, vec![PortSpan::new(80, 80), PortSpan::new(8000, 8100)]);
//!
//! assert!(parse_ports("*").unwrap().is_empty());
//! assert_eq!(parse_ports_for_single_range("443,80").unwrap(), Some(PortSpan::new(443, 443)));
//! assert!(parse_ports("http").is_err());
//! ```

use crate::core::error::PortParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest valid port number
pub const MIN_PORT: u32 = 1;

/// Highest valid port number
pub const MAX_PORT: u32 = 65_535;

/// Inclusive port range that has passed bounds checking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub const fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub const fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub const fn contains(&self, port: u16) -> bool {
        self.start <= port && port <= self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// One parsed token, exactly as written (no bounds checks yet)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpan {
    pub start: u32,
    pub end: u32,
}

impl PortSpan {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Bounds-checks the span into a [`PortRange`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if either end is outside 1-65535 or `start > end`.
    pub fn to_port_range(self) -> Result<PortRange, String> {
        let start = checked_port(self.start)?;
        let end = checked_port(self.end)?;
        let (start, end) = crate::validators::validate_port_range(start, end)?;
        Ok(PortRange { start, end })
    }
}

impl fmt::Display for PortSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl From<PortRange> for PortSpan {
    fn from(range: PortRange) -> Self {
        Self {
            start: u32::from(range.start),
            end: u32::from(range.end),
        }
    }
}

fn checked_port(port: u32) -> Result<u16, String> {
    u16::try_from(port)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| format!("Port {port} is out of range ({MIN_PORT}-{MAX_PORT})"))
}

/// How many spans a parse should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortParseMode {
    /// Every comma-separated token
    All,
    /// Only the first token (the whole spec is still checked for malformed tokens)
    First,
}

/// Returns `true` for the "any port" spellings: empty, `*`, `all`
pub fn is_wildcard(spec: &str) -> bool {
    let spec = spec.trim();
    spec.is_empty() || spec == "*" || spec.eq_ignore_ascii_case("all")
}

/// Parses a port specification in the requested mode.
///
/// # Errors
///
/// Returns [`PortParseError`] naming the first token that is not a number or a
/// `start-end` pair of numbers.
pub fn parse_port_spec(spec: &str, mode: PortParseMode) -> Result<Vec<PortSpan>, PortParseError> {
    if is_wildcard(spec) {
        return Ok(Vec::new());
    }

    let mut spans = Vec::new();
    for token in spec.split(',') {
        let span = parse_token(token.trim())?;
        spans.push(span);
    }

    if mode == PortParseMode::First {
        spans.truncate(1);
    }
    Ok(spans)
}

/// Parses every token of a port specification.
///
/// # Errors
///
/// Returns [`PortParseError`] for the first malformed token.
pub fn parse_ports(spec: &str) -> Result<Vec<PortSpan>, PortParseError> {
    parse_port_spec(spec, PortParseMode::All)
}

/// Parses a port specification down to its first span, for callers that accept
/// exactly one range per rule. `None` means "any port".
///
/// # Errors
///
/// Returns [`PortParseError`] for the first malformed token.
pub fn parse_ports_for_single_range(spec: &str) -> Result<Option<PortSpan>, PortParseError> {
    Ok(parse_port_spec(spec, PortParseMode::First)?.into_iter().next())
}

fn parse_token(token: &str) -> Result<PortSpan, PortParseError> {
    let malformed = || PortParseError {
        token: token.to_string(),
    };

    match token.split_once('-') {
        Some((start, end)) => {
            let start = parse_number(start.trim()).ok_or_else(malformed)?;
            let end = parse_number(end.trim()).ok_or_else(malformed)?;
            Ok(PortSpan { start, end })
        }
        None => {
            let port = parse_number(token).ok_or_else(malformed)?;
            Ok(PortSpan {
                start: port,
                end: port,
            })
        }
    }
}

// Digits only: rejects signs, blanks and a second '-'
fn parse_number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Joins spans back into a specification string (`*` for no constraint)
pub fn format_port_spans(spans: &[PortSpan]) -> String {
    if spans.is_empty() {
        return "*".to_string();
    }
    spans
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_span() -> impl Strategy<Value = PortSpan> {
        (1u32..=65_535, 0u32..=1000).prop_map(|(start, width)| {
            PortSpan::new(start, (start + width).min(MAX_PORT))
        })
    }

    proptest! {
        #[test]
        fn test_valid_specs_round_trip(spans in prop::collection::vec(valid_span(), 1..8)) {
            let spec = format_port_spans(&spans);
            let parsed = parse_ports(&spec).unwrap();
            prop_assert_eq!(&parsed, &spans);
            for span in parsed {
                let range = span.to_port_range().unwrap();
                prop_assert!(range.start >= 1);
                prop_assert!(range.start <= range.end);
            }
        }

        #[test]
        fn test_first_mode_is_prefix_of_all(spans in prop::collection::vec(valid_span(), 1..8)) {
            let spec = format_port_spans(&spans);
            let all = parse_ports(&spec).unwrap();
            let first = parse_ports_for_single_range(&spec).unwrap();
            prop_assert_eq!(first, all.first().copied());
        }

        #[test]
        fn test_parser_never_panics(input in "\\PC*") {
            let _ = parse_ports(&input);
        }

        #[test]
        fn test_letters_are_rejected(token in "[a-zA-Z]{1,8}") {
            prop_assume!(!token.eq_ignore_ascii_case("all"));
            prop_assert!(parse_ports(&token).is_err());
        }
    }
}
