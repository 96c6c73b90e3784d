use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Core error types for the rule engine
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input validation failed (one or more fields)
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// A referenced preset or template id is not in the catalog
    #[error("{kind} not found in catalog: {id}")]
    CatalogMiss { kind: CatalogKind, id: String },

    /// Catalog data could not be loaded
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// The Rule Store rejected a concrete rule
    #[error("Rule store rejected the submission: {message}")]
    Submission {
        message: String,
        /// Rules the store accepted before the failure
        created: Vec<Uuid>,
    },
}

/// A port token that is not a number or a `start-end` range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid port '{token}': expected a number or a range like 8000-8100")]
pub struct PortParseError {
    pub token: String,
}

/// Which registry a catalog lookup missed
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CatalogKind {
    #[strum(serialize = "Service preset")]
    ServicePreset,
    #[strum(serialize = "Firewall template")]
    FirewallTemplate,
}

/// Field-keyed validation messages
///
/// Every field keeps a list so all problems surface together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn extend_field(&mut self, field: &str, messages: impl IntoIterator<Item = String>) {
        for message in messages {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Converts into `Ok(())` when empty, `Err(Error::Validation)` otherwise
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// Known Rule Store rejection patterns
///
/// The store's message is always kept verbatim as `user_message`; patterns only
/// add suggestions for the review screen.
pub struct StoreErrorPattern;

impl StoreErrorPattern {
    /// Matches a store error message against known patterns.
    pub fn match_error(msg: &str) -> ErrorTranslation {
        let lower = msg.to_lowercase();
        let translation = ErrorTranslation::new(msg);

        if lower.contains("already exists") || lower.contains("duplicate") {
            return translation
                .with_suggestion("An identical rule is already attached to this scope")
                .with_suggestion("Change the port, address or action and submit again");
        }

        if lower.contains("permission") || lower.contains("forbidden") {
            return translation
                .with_suggestion("Your account may not manage rules for this VM or department")
                .with_suggestion("Ask an administrator to grant firewall access");
        }

        if lower.contains("limit") || lower.contains("too many") {
            return translation
                .with_suggestion("The scope has reached its rule limit")
                .with_suggestion("Remove unused rules or use a wider port range");
        }

        if lower.contains("not found") {
            return translation
                .with_suggestion("The VM, department or filter may have been deleted")
                .with_suggestion("Reload the page and start the wizard again");
        }

        if lower.contains("unavailable") || lower.contains("timeout") || lower.contains("timed out") {
            return translation
                .with_suggestion("The rule service did not respond")
                .with_suggestion("Submit again once the service is reachable");
        }

        translation.with_suggestion("Review the rules and submit again")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_accumulate() {
        let mut errors = FieldErrors::new();
        errors.add("port", "Port 0 is out of range (1-65535)");
        errors.add("port", "Port 70000 is out of range (1-65535)");
        errors.add("action", "Action is required");

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("port").map(<[String]>::len), Some(2));
        assert!(errors.contains("action"));
        assert!(!errors.contains("source"));
    }

    #[test]
    fn test_field_errors_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());

        let mut errors = FieldErrors::new();
        errors.add("direction", "Direction is required");
        let err = errors.into_result().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("direction: Direction is required"));
    }

    #[test]
    fn test_catalog_miss_message() {
        let err = Error::CatalogMiss {
            kind: CatalogKind::FirewallTemplate,
            id: "nope".to_string(),
        };
        assert_eq!(err.to_string(), "Firewall template not found in catalog: nope");
    }

    #[test]
    fn test_port_parse_error_names_token() {
        let err = PortParseError {
            token: "8o".to_string(),
        };
        assert!(err.to_string().contains("'8o'"));
    }

    #[test]
    fn test_store_error_keeps_message_verbatim() {
        let translation = StoreErrorPattern::match_error("Rule already exists for vm-12");
        assert_eq!(translation.user_message, "Rule already exists for vm-12");
        assert!(translation.suggestions.iter().any(|s| s.contains("identical")));
    }

    #[test]
    fn test_store_error_permission() {
        let translation = StoreErrorPattern::match_error("Forbidden: missing role");
        assert!(translation.suggestions.iter().any(|s| s.contains("administrator")));
    }

    #[test]
    fn test_store_error_fallback() {
        let translation = StoreErrorPattern::match_error("something odd");
        assert_eq!(translation.suggestions.len(), 1);
    }
}
