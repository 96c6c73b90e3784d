//! Template expansion
//!
//! Turns a [`FirewallTemplate`] into an ordered list of [`TemplateRule`]s:
//! every fragment of every referenced preset first (catalog order, action
//! fixed to allow, template base priority), then the template's custom rules
//! verbatim. Presets only ever grant access; blocking comes from custom rules.
//!
//! # Example
//!
//! ```
//! use vmfw::core::catalog::Catalog;
//! use vmfw::core::expander::expand_template_to_rules;
//! use vmfw::core::firewall::Provenance;
//!
//! let catalog = Catalog::builtin();
//! let template = catalog.get_firewall_template("web-server").unwrap();
//! let rules = expand_template_to_rules(&catalog, template);
//!
//! assert_eq!(rules.len(), 5);
//! assert_eq!(rules.last().unwrap().provenance, Provenance::Custom);
//! ```

use crate::core::catalog::{Catalog, FirewallTemplate, ServicePreset};
use crate::core::error::Result;
use crate::core::firewall::{Provenance, TemplateRule};
use crate::core::vocabulary::Action;
use tracing::{debug, warn};

/// Expands one preset's fragments as allow rules at `priority`.
pub fn expand_service_preset(preset: &ServicePreset, priority: i32) -> Vec<TemplateRule> {
    preset
        .rules
        .iter()
        .map(|rule| TemplateRule {
            action: Action::Allow,
            direction: rule.direction.to_user(),
            protocol: rule.protocol,
            ports: rule.port,
            priority,
            description: format!("{}: {}", preset.name, rule.description),
            provenance: Provenance::Preset(preset.id.clone()),
        })
        .collect()
}

/// Expands a template through the catalog.
///
/// Unknown preset ids are skipped with a warning so one bad reference never
/// blocks the rest of the template.
pub fn expand_template_to_rules(catalog: &Catalog, template: &FirewallTemplate) -> Vec<TemplateRule> {
    let mut rules = Vec::new();

    for id in &template.services {
        match catalog.get_service_preset(id) {
            Some(preset) => rules.extend(expand_service_preset(preset, template.base_priority)),
            None => warn!(
                "Template '{}': skipping unknown service preset '{}'",
                template.id, id
            ),
        }
    }

    rules.extend(template.custom_rules.iter().map(|fragment| TemplateRule {
        action: fragment.action,
        direction: fragment.direction,
        protocol: fragment.protocol,
        ports: fragment.ports,
        priority: fragment.priority.unwrap_or(template.base_priority),
        description: fragment.description.clone(),
        provenance: Provenance::Custom,
    }));

    debug!("Template '{}' expanded to {} rules", template.id, rules.len());
    rules
}

/// Looks up a template by id and expands it.
///
/// # Errors
///
/// Returns [`crate::core::error::Error::CatalogMiss`] if the template id is unknown.
pub fn expand_template_by_id(catalog: &Catalog, id: &str) -> Result<Vec<TemplateRule>> {
    let template = catalog.require_firewall_template(id)?;
    Ok(expand_template_to_rules(catalog, template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{TemplateCategory, TemplateRuleFragment};
    use crate::core::firewall::Protocol;
    use crate::core::ports::PortRange;
    use crate::core::vocabulary::Direction;

    fn bare_template(services: &[&str], custom_rules: Vec<TemplateRuleFragment>) -> FirewallTemplate {
        FirewallTemplate {
            id: "t".to_string(),
            name: "T".to_string(),
            description: String::new(),
            category: TemplateCategory::Security,
            services: services.iter().map(|s| (*s).to_string()).collect(),
            custom_rules,
            base_priority: 70,
        }
    }

    #[test]
    fn test_web_server_expansion() {
        let catalog = Catalog::builtin();
        let rules = expand_template_by_id(&catalog, "web-server").unwrap();

        assert_eq!(rules.len(), 5);
        let provenance: Vec<_> = rules.iter().map(|r| r.provenance.clone()).collect();
        assert_eq!(
            provenance,
            [
                Provenance::Preset("https".to_string()),
                Provenance::Preset("dns".to_string()),
                Provenance::Preset("dns".to_string()),
                Provenance::Preset("ssh".to_string()),
                Provenance::Custom,
            ]
        );

        for rule in &rules[..4] {
            assert_eq!(rule.action, Action::Allow);
            assert_eq!(rule.priority, 100);
        }
        let custom = &rules[4];
        assert_eq!(custom.action, Action::Deny);
        assert_eq!(custom.ports, Some(PortRange::single(80)));
        assert_eq!(custom.priority, 90);
    }

    #[test]
    fn test_preset_direction_converted() {
        let catalog = Catalog::builtin();
        let rules = expand_template_by_id(&catalog, "web-server").unwrap();
        assert_eq!(rules[0].direction, Direction::Inbound);
        assert_eq!(rules[1].direction, Direction::Outbound);
        assert_eq!(rules[1].protocol, Protocol::Udp);
    }

    #[test]
    fn test_base_priority_flows_without_override() {
        let catalog = Catalog::builtin();
        let rules = expand_template_by_id(&catalog, "database-server").unwrap();
        assert!(rules.iter().all(|r| r.priority == 200));
    }

    #[test]
    fn test_unknown_preset_skipped() {
        let catalog = Catalog::builtin();
        let template = bare_template(&["ssh", "gopher", "ntp"], Vec::new());
        let rules = expand_template_to_rules(&catalog, &template);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].provenance, Provenance::Preset("ssh".to_string()));
        assert_eq!(rules[1].provenance, Provenance::Preset("ntp".to_string()));
    }

    #[test]
    fn test_custom_only_template_not_empty() {
        let catalog = Catalog::builtin();
        let template = bare_template(
            &[],
            vec![TemplateRuleFragment {
                action: Action::Reject,
                direction: Direction::Outbound,
                protocol: Protocol::Tcp,
                ports: Some(PortRange::single(25)),
                priority: None,
                description: "No outbound mail".to_string(),
            }],
        );
        let rules = expand_template_to_rules(&catalog, &template);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].priority, 70);
    }

    #[test]
    fn test_every_builtin_template_expands() {
        let catalog = Catalog::builtin();
        for template in catalog.firewall_templates() {
            let rules = expand_template_to_rules(&catalog, template);
            let fragments: usize = template
                .services
                .iter()
                .filter_map(|id| catalog.get_service_preset(id))
                .map(|p| p.rules.len())
                .sum();
            assert_eq!(rules.len(), fragments + template.custom_rules.len());
            assert!(!rules.is_empty());
        }
    }

    #[test]
    fn test_unknown_template_id() {
        let catalog = Catalog::builtin();
        assert!(expand_template_by_id(&catalog, "kiosk").is_err());
    }
}
