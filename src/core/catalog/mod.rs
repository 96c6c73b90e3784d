//! Service preset and firewall template registries
//!
//! A [`Catalog`] is immutable once built. Construct it once at startup with
//! [`Catalog::builtin`] or [`Catalog::from_json`] and share it as
//! `Arc<Catalog>`. Lookups return `Option` because callers routinely check for
//! optional membership; the `require_*` variants turn a miss into
//! [`Error::CatalogMiss`].
//!
//! # Example
//!
//! ```
//! use vmfw::core::catalog::{Catalog, ServiceCategory};
//!
//! let catalog = Catalog::builtin();
//! let ssh = catalog.get_service_preset("ssh").unwrap();
//! assert_eq!(ssh.rules[0].port.unwrap().start, 22);
//!
//! assert!(catalog.get_service_preset("gopher").is_none());
//! assert!(!catalog.get_service_presets_by_category(ServiceCategory::Database).is_empty());
//! ```

mod services;
mod templates;

use crate::core::error::{CatalogKind, Error, Result};
use crate::core::firewall::Protocol;
use crate::core::ports::PortRange;
use crate::core::risk::RiskLevel;
use crate::core::rule_constraints::check_fragment;
use crate::core::vocabulary::{Action, BackendDirection, Direction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

/// Service preset grouping for pickers
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
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ServiceCategory {
    Web,
    Remote,
    Database,
    Email,
    File,
    Other,
}

impl ServiceCategory {
    pub const fn display_name(self) -> &'static str {
        match self {
            ServiceCategory::Web => "Web",
            ServiceCategory::Remote => "Remote Access",
            ServiceCategory::Database => "Databases",
            ServiceCategory::Email => "Email",
            ServiceCategory::File => "File Sharing",
            ServiceCategory::Other => "Other",
        }
    }
}

/// Template grouping for pickers
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
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TemplateCategory {
    Web,
    Database,
    Email,
    Remote,
    File,
    Security,
    Development,
}

/// One protocol/port/direction tuple inside a preset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceRule {
    pub protocol: Protocol,
    /// `None` for portless protocols
    #[serde(default)]
    pub port: Option<PortRange>,
    pub direction: BackendDirection,
    pub description: String,
}

/// Named, reusable service definition (e.g. "SSH")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServicePreset {
    pub id: String,
    pub name: String,
    pub category: ServiceCategory,
    pub risk: RiskLevel,
    pub rules: Vec<ServiceRule>,
}

/// Custom rule carried by a template alongside its presets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateRuleFragment {
    pub action: Action,
    pub direction: Direction,
    pub protocol: Protocol,
    #[serde(default)]
    pub ports: Option<PortRange>,
    /// Overrides the template's base priority
    #[serde(default)]
    pub priority: Option<i32>,
    pub description: String,
}

/// Named bundle of presets plus custom rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirewallTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: TemplateCategory,
    /// Preset ids, expanded in this order
    pub services: Vec<String>,
    #[serde(default)]
    pub custom_rules: Vec<TemplateRuleFragment>,
    pub base_priority: i32,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    services: Vec<ServicePreset>,
    #[serde(default)]
    templates: Vec<FirewallTemplate>,
}

/// Immutable lookup tables for presets and templates
#[derive(Debug, Clone)]
pub struct Catalog {
    services: Vec<ServicePreset>,
    templates: Vec<FirewallTemplate>,
    service_index: HashMap<String, usize>,
    template_index: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate ids and malformed fragments.
    ///
    /// Templates that reference unknown presets are accepted (and logged):
    /// expansion skips the missing preset. A template left with no known
    /// preset and no custom rules is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCatalog`] describing the first problem found.
    pub fn new(services: Vec<ServicePreset>, templates: Vec<FirewallTemplate>) -> Result<Self> {
        let mut service_index = HashMap::with_capacity(services.len());
        for (i, preset) in services.iter().enumerate() {
            if preset.id.trim().is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "service preset #{i} has an empty id"
                )));
            }
            if preset.rules.is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "service preset '{}' has no rules",
                    preset.id
                )));
            }
            for rule in &preset.rules {
                check_fragment(rule.protocol, rule.port).map_err(|e| {
                    Error::InvalidCatalog(format!("service preset '{}': {e}", preset.id))
                })?;
            }
            match service_index.entry(preset.id.clone()) {
                Entry::Occupied(_) => {
                    return Err(Error::InvalidCatalog(format!(
                        "duplicate service preset id '{}'",
                        preset.id
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
            }
        }

        let mut template_index = HashMap::with_capacity(templates.len());
        for (i, template) in templates.iter().enumerate() {
            if template.id.trim().is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "firewall template #{i} has an empty id"
                )));
            }
            for rule in &template.custom_rules {
                check_fragment(rule.protocol, rule.ports).map_err(|e| {
                    Error::InvalidCatalog(format!("firewall template '{}': {e}", template.id))
                })?;
            }
            let mut resolvable = 0;
            for id in &template.services {
                if service_index.contains_key(id) {
                    resolvable += 1;
                } else {
                    warn!(
                        "Template '{}' references unknown service preset '{}'",
                        template.id, id
                    );
                }
            }
            if resolvable == 0 && template.custom_rules.is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "firewall template '{}' expands to no rules",
                    template.id
                )));
            }
            match template_index.entry(template.id.clone()) {
                Entry::Occupied(_) => {
                    return Err(Error::InvalidCatalog(format!(
                        "duplicate firewall template id '{}'",
                        template.id
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
            }
        }

        debug!(
            "Catalog loaded: {} service presets, {} templates",
            services.len(),
            templates.len()
        );

        Ok(Self {
            services,
            templates,
            service_index,
            template_index,
        })
    }

    /// The registry shipped with the engine
    pub fn builtin() -> Self {
        Self::indexed(services::builtin_services(), templates::builtin_templates())
    }

    /// Builds the id indexes without validating entries.
    pub(crate) fn indexed(services: Vec<ServicePreset>, templates: Vec<FirewallTemplate>) -> Self {
        let service_index = services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        let template_index = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        Self {
            services,
            templates,
            service_index,
            template_index,
        }
    }

    /// Parses a replacement registry from JSON (`{"services": [...], "templates": [...]}`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] for malformed JSON and
    /// [`Error::InvalidCatalog`] for duplicate ids, bad fragments or templates
    /// that expand to nothing.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.services, file.templates)
    }

    pub fn service_presets(&self) -> &[ServicePreset] {
        &self.services
    }

    pub fn firewall_templates(&self) -> &[FirewallTemplate] {
        &self.templates
    }

    pub fn get_service_preset(&self, id: &str) -> Option<&ServicePreset> {
        self.service_index.get(id).map(|&i| &self.services[i])
    }

    /// Presets in one category, in declaration order
    pub fn get_service_presets_by_category(&self, category: ServiceCategory) -> Vec<&ServicePreset> {
        self.services
            .iter()
            .filter(|s| s.category == category)
            .collect()
    }

    pub fn get_firewall_template(&self, id: &str) -> Option<&FirewallTemplate> {
        self.template_index.get(id).map(|&i| &self.templates[i])
    }

    /// Templates in one category, in declaration order
    pub fn get_firewall_templates_by_category(
        &self,
        category: TemplateCategory,
    ) -> Vec<&FirewallTemplate> {
        self.templates
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`Error::CatalogMiss`] if no preset has this id.
    pub fn require_service_preset(&self, id: &str) -> Result<&ServicePreset> {
        self.get_service_preset(id).ok_or_else(|| Error::CatalogMiss {
            kind: CatalogKind::ServicePreset,
            id: id.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::CatalogMiss`] if no template has this id.
    pub fn require_firewall_template(&self, id: &str) -> Result<&FirewallTemplate> {
        self.get_firewall_template(id)
            .ok_or_else(|| Error::CatalogMiss {
                kind: CatalogKind::FirewallTemplate,
                id: id.to_string(),
            })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
