//! Wizard step controller
//!
//! A linear four-step flow: `Direction → Service → Customization → Review`.
//! Each forward transition validates its input; on failure the session stays on
//! the current step with field-keyed errors and the submitted values kept for
//! re-display. Nothing leaves the session until [`WizardSession::complete`].
//!
//! Completion pipeline:
//!
//! 1. build drafts (one per preset fragment, template rule, or custom service)
//! 2. resolve every draft with [`RuleDraft::to_concrete_rules`]; any failure aborts
//! 3. drop exact duplicates, then sort into evaluation order
//! 4. score each rule
//! 5. one `create_rule` call per rule; the first store error stops the submission
//!
//! # Example
//!
//! ```
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use std::sync::Arc;
//! use vmfw::core::catalog::Catalog;
//! use vmfw::core::store::{MemoryRuleStore, RuleScope};
//! use vmfw::core::wizard::{Customization, ServiceSelection, StepInput, WizardSession, WizardStep};
//!
//! let store = MemoryRuleStore::new();
//! let mut wizard = WizardSession::new(Arc::new(Catalog::builtin()), RuleScope::Vm("vm-7".into()));
//!
//! wizard.advance(WizardStep::Direction, StepInput::Direction("inbound".into())).unwrap();
//! wizard.advance(WizardStep::Service, StepInput::Service(ServiceSelection::Preset("ssh".into()))).unwrap();
//! wizard
//!     .advance(
//!         WizardStep::Customization,
//!         StepInput::Customization(Customization::with_action("allow")),
//!     )
//!     .unwrap();
//!
//! let receipt = wizard.complete(&store).await.unwrap();
//! assert_eq!(receipt.rule_ids.len(), 1);
//! # });
//! ```

use crate::core::catalog::Catalog;
use crate::core::error::{Error, FieldErrors, Result};
use crate::core::expander::expand_template_by_id;
use crate::core::firewall::{ConcreteRule, DEFAULT_PRIORITY, Origin, Protocol, RuleDraft};
use crate::core::ports::is_wildcard;
use crate::core::priority::sort_rules_in_place;
use crate::core::risk::{RiskAssessment, RiskLevel, calculate_risk_level};
use crate::core::rule_constraints::protocol_supports_ports;
use crate::core::store::{RuleId, RuleScope, RuleStore};
use crate::core::vocabulary::{Action, Direction};
use crate::validators::{validate_ipv4_cidr, validate_label, validate_port_spec};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on rules created by one wizard submission
pub const MAX_RULES_PER_SUBMISSION: usize = 100;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum WizardStep {
    #[default]
    Direction,
    Service,
    Customization,
    Review,
}

impl WizardStep {
    pub const fn next(self) -> Option<Self> {
        match self {
            WizardStep::Direction => Some(WizardStep::Service),
            WizardStep::Service => Some(WizardStep::Customization),
            WizardStep::Customization => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    pub const fn previous(self) -> Option<Self> {
        match self {
            WizardStep::Direction => None,
            WizardStep::Service => Some(WizardStep::Direction),
            WizardStep::Customization => Some(WizardStep::Service),
            WizardStep::Review => Some(WizardStep::Customization),
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            WizardStep::Direction => "Traffic Direction",
            WizardStep::Service => "Service",
            WizardStep::Customization => "Customize",
            WizardStep::Review => "Review",
        }
    }
}

/// What the service step picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceSelection {
    /// A catalog preset by id
    Preset(String),
    /// A catalog template by id
    Template(String),
    /// A hand-entered protocol and port spec
    Custom { protocol: String, port: String },
}

/// Values collected on the customization step
///
/// On the template path only `source`, `destination` and `comment` apply;
/// `action`, `port` and `priority` are rejected there since templates keep
/// their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Customization {
    pub action: Option<String>,
    /// Replaces the preset or custom service ports
    pub port: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub comment: Option<String>,
    pub priority: Option<i32>,
}

impl Customization {
    pub fn with_action(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Self::default()
        }
    }
}

/// Input for one [`WizardSession::advance`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    Direction(String),
    Service(ServiceSelection),
    Customization(Customization),
}

impl StepInput {
    const fn step(&self) -> WizardStep {
        match self {
            StepInput::Direction(_) => WizardStep::Direction,
            StepInput::Service(_) => WizardStep::Service,
            StepInput::Customization(_) => WizardStep::Customization,
        }
    }
}

/// Everything entered so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardValues {
    pub direction: Option<String>,
    pub service: Option<ServiceSelection>,
    pub customization: Customization,
}

/// Concrete rules a submission would create, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPlan {
    pub rules: Vec<ConcreteRule>,
    /// Parallel to `rules`
    pub risks: Vec<RiskAssessment>,
}

impl SubmissionPlan {
    pub fn highest_risk(&self) -> RiskLevel {
        self.risks
            .iter()
            .map(|r| r.level)
            .max()
            .unwrap_or_default()
    }
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub scope: RuleScope,
    pub rule_ids: Vec<RuleId>,
    pub plan: SubmissionPlan,
}

/// One user's in-progress wizard
#[derive(Debug, Clone)]
pub struct WizardSession {
    catalog: Arc<Catalog>,
    scope: RuleScope,
    default_priority: i32,
    step: WizardStep,
    values: WizardValues,
    errors: FieldErrors,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl WizardSession {
    pub fn new(catalog: Arc<Catalog>, scope: RuleScope) -> Self {
        Self {
            catalog,
            scope,
            default_priority: DEFAULT_PRIORITY,
            step: WizardStep::Direction,
            values: WizardValues::default(),
            errors: FieldErrors::new(),
        }
    }

    /// Priority for preset and custom rules when the user sets none
    #[must_use]
    pub fn with_default_priority(mut self, priority: i32) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn values(&self) -> &WizardValues {
        &self.values
    }

    /// Errors from the last rejected transition
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn scope(&self) -> &RuleScope {
        &self.scope
    }

    /// Validates `input` for the current step and moves forward.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `step` is not the current step, when
    /// the input belongs to another step, or when any field is invalid. The
    /// session stays on the current step.
    pub fn advance(&mut self, step: WizardStep, input: StepInput) -> Result<WizardStep> {
        let mut errors = FieldErrors::new();

        if step != self.step || input.step() != self.step {
            errors.add(
                "step",
                format!("Expected input for the {} step", self.step.title()),
            );
            return self.reject(errors);
        }

        match input {
            StepInput::Direction(direction) => {
                Self::validate_direction(&direction, &mut errors);
                self.values.direction = Some(direction);
            }
            StepInput::Service(selection) => {
                self.validate_service(&selection, &mut errors);
                self.values.service = Some(selection);
            }
            StepInput::Customization(customization) => {
                self.validate_customization(&customization, &mut errors);
                self.values.customization = customization;
                if errors.is_empty()
                    && let Err(Error::Validation(plan_errors)) = self.plan()
                {
                    errors = plan_errors;
                }
            }
        }

        if !errors.is_empty() {
            return self.reject(errors);
        }

        self.errors = FieldErrors::new();
        if let Some(next) = self.step.next() {
            debug!("Wizard {}: {} -> {}", self.scope, self.step, next);
            self.step = next;
        }
        Ok(self.step)
    }

    fn reject(&mut self, errors: FieldErrors) -> Result<WizardStep> {
        debug!("Wizard {}: {} step rejected: {}", self.scope, self.step, errors);
        self.errors = errors.clone();
        Err(Error::Validation(errors))
    }

    /// Moves back one step, keeping entered values.
    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            debug!("Wizard {}: {} -> {}", self.scope, self.step, previous);
            self.step = previous;
        }
        self.errors = FieldErrors::new();
        self.step
    }

    /// Discards everything entered and returns to the first step.
    pub fn cancel(&mut self) {
        debug!("Wizard {}: cancelled at {}", self.scope, self.step);
        self.reset();
    }

    fn reset(&mut self) {
        self.step = WizardStep::Direction;
        self.values = WizardValues::default();
        self.errors = FieldErrors::new();
    }

    fn validate_direction(direction: &str, errors: &mut FieldErrors) {
        if direction.trim().is_empty() {
            errors.add("direction", "Direction is required");
        } else if Direction::from_term(direction).is_none() {
            errors.add(
                "direction",
                format!("Invalid direction '{direction}' (expected inbound, outbound or bidirectional)"),
            );
        }
    }

    fn validate_service(&self, selection: &ServiceSelection, errors: &mut FieldErrors) {
        match selection {
            ServiceSelection::Preset(id) => {
                if let Err(e) = self.catalog.require_service_preset(id) {
                    errors.add("service", e.to_string());
                }
            }
            ServiceSelection::Template(id) => {
                if let Err(e) = self.catalog.require_firewall_template(id) {
                    errors.add("service", e.to_string());
                }
            }
            ServiceSelection::Custom { protocol, port } => {
                match protocol.trim().parse::<Protocol>() {
                    Ok(p @ (Protocol::Tcp | Protocol::Udp | Protocol::Icmp)) => {
                        if !protocol_supports_ports(p) && !is_wildcard(port) {
                            errors.add(
                                "port",
                                format!("Protocol {} does not use ports", p.display_name()),
                            );
                        }
                    }
                    _ => errors.add(
                        "protocol",
                        format!("Invalid protocol '{protocol}' (expected tcp, udp or icmp)"),
                    ),
                }
                if let Err(messages) = validate_port_spec(port) {
                    errors.extend_field("port", messages);
                }
            }
        }
    }

    fn validate_customization(&self, customization: &Customization, errors: &mut FieldErrors) {
        let template_path = matches!(self.values.service, Some(ServiceSelection::Template(_)));

        match non_blank(customization.action.as_deref()) {
            Some(_) if template_path => errors.add("action", "Templates keep their own actions"),
            Some(action) => {
                if Action::from_term(action).is_none() {
                    errors.add(
                        "action",
                        format!("Invalid action '{action}' (expected allow, deny or reject)"),
                    );
                }
            }
            None if !template_path => errors.add("action", "Action is required"),
            None => {}
        }

        if let Some(port) = non_blank(customization.port.as_deref()) {
            if template_path {
                errors.add("port", "Templates keep their own ports");
            } else if let Err(messages) = validate_port_spec(port) {
                errors.extend_field("port", messages);
            }
        }

        for (field, value) in [
            ("source", customization.source.as_deref()),
            ("destination", customization.destination.as_deref()),
        ] {
            if let Some(value) = non_blank(value)
                && let Err(msg) = validate_ipv4_cidr(value)
            {
                errors.add(field, msg);
            }
        }

        if let Some(comment) = non_blank(customization.comment.as_deref())
            && let Err(msg) = validate_label(comment)
        {
            errors.add("comment", msg);
        }

        if let Some(priority) = customization.priority {
            if template_path {
                errors.add("priority", "Templates keep their own priorities");
            } else if priority < 0 {
                errors.add("priority", "Priority cannot be negative");
            }
        }
    }

    /// Builds user-vocabulary drafts from the collected values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a step has not been filled in, or
    /// [`Error::CatalogMiss`] if the selection is no longer in the catalog.
    pub fn drafts(&self) -> Result<Vec<RuleDraft>> {
        let mut missing = FieldErrors::new();
        let direction = non_blank(self.values.direction.as_deref());
        if direction.is_none() {
            missing.add("direction", "Direction is required");
        }
        if self.values.service.is_none() {
            missing.add("service", "Choose a service, template or custom port");
        }
        let (Some(direction), Some(service)) = (direction, self.values.service.as_ref()) else {
            return Err(Error::Validation(missing));
        };

        let custom = &self.values.customization;
        let action = custom.action.clone().unwrap_or_default();
        let port_override = non_blank(custom.port.as_deref());
        let priority = custom.priority.unwrap_or(self.default_priority);

        let apply_addresses = |mut draft: RuleDraft| {
            draft.source = non_blank(custom.source.as_deref()).map(str::to_string);
            draft.destination = non_blank(custom.destination.as_deref()).map(str::to_string);
            if let Some(comment) = non_blank(custom.comment.as_deref()) {
                draft.comment = Some(comment.to_string());
            }
            draft
        };

        let drafts = match service {
            ServiceSelection::Preset(id) => {
                let preset = self.catalog.require_service_preset(id)?;
                preset
                    .rules
                    .iter()
                    .map(|rule| {
                        let mut draft = RuleDraft::new(action.clone(), direction)
                            .with_priority(priority)
                            .with_comment(format!("{}: {}", preset.name, rule.description));
                        if rule.protocol != Protocol::All {
                            draft.protocol = Some(rule.protocol.as_str().to_string());
                        }
                        draft.port = port_override
                            .map(str::to_string)
                            .or_else(|| rule.port.map(|p| p.to_string()));
                        apply_addresses(draft)
                    })
                    .collect()
            }
            ServiceSelection::Template(id) => expand_template_by_id(&self.catalog, id)?
                .iter()
                .map(|rule| apply_addresses(rule.to_draft()))
                .collect(),
            ServiceSelection::Custom { protocol, port } => {
                let draft = RuleDraft::new(action, direction)
                    .with_protocol(protocol.trim())
                    .with_port(port_override.unwrap_or(port))
                    .with_priority(priority)
                    .with_origin(Origin::Custom);
                vec![apply_addresses(draft)]
            }
        };

        Ok(drafts)
    }

    /// Resolves, deduplicates, orders and scores the rules this session would
    /// submit, without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with errors keyed `rules[i].field` when any
    /// draft fails, or keyed `rules` when the submission is empty or exceeds
    /// [`MAX_RULES_PER_SUBMISSION`].
    pub fn plan(&self) -> Result<SubmissionPlan> {
        let drafts = self.drafts()?;

        let mut errors = FieldErrors::new();
        let mut rules: Vec<ConcreteRule> = Vec::new();
        for (i, draft) in drafts.iter().enumerate() {
            match draft.to_concrete_rules() {
                Ok(resolved) => {
                    for rule in resolved {
                        if !rules.contains(&rule) {
                            rules.push(rule);
                        }
                    }
                }
                Err(draft_errors) => {
                    for (field, messages) in draft_errors.iter() {
                        errors.extend_field(&format!("rules[{i}].{field}"), messages.to_vec());
                    }
                }
            }
        }
        errors.into_result()?;

        if rules.is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("rules", "Submission would create no rules");
            return Err(Error::Validation(errors));
        }

        if rules.len() > MAX_RULES_PER_SUBMISSION {
            let mut errors = FieldErrors::new();
            errors.add(
                "rules",
                format!(
                    "Submission would create {} rules (max {MAX_RULES_PER_SUBMISSION})",
                    rules.len()
                ),
            );
            return Err(Error::Validation(errors));
        }

        sort_rules_in_place(&mut rules);
        let risks = rules.iter().map(calculate_risk_level).collect();
        Ok(SubmissionPlan { rules, risks })
    }

    /// Submits the reviewed rules to the store, one call per rule.
    ///
    /// On success the session resets to the first step. On failure it stays on
    /// the review step with every value intact.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if not on the review step or a draft is invalid
    /// - [`Error::Submission`] with the store's message verbatim and the ids of
    ///   rules created before the failure
    pub async fn complete(&mut self, store: &dyn RuleStore) -> Result<SubmissionReceipt> {
        if self.step != WizardStep::Review {
            let mut errors = FieldErrors::new();
            errors.add("step", "Finish every step before submitting");
            self.errors = errors.clone();
            return Err(Error::Validation(errors));
        }

        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                if let Error::Validation(ref errors) = e {
                    self.errors = errors.clone();
                }
                return Err(e);
            }
        };

        for (rule, risk) in plan.rules.iter().zip(&plan.risks) {
            if risk.level == RiskLevel::High {
                warn!(
                    "High-risk rule for {}: {:?} {:?} {:?} (score {})",
                    self.scope, rule.action, rule.direction, rule.ports, risk.score
                );
            } else {
                debug!("Rule risk for {}: {} (score {})", self.scope, risk.label, risk.score);
            }
        }

        let mut created = Vec::with_capacity(plan.rules.len());
        for rule in &plan.rules {
            match store.create_rule(&self.scope, rule).await {
                Ok(id) => created.push(id),
                Err(e) => {
                    let message = e.to_string();
                    warn!(
                        "Rule store rejected rule {} of {} for {}: {}",
                        created.len() + 1,
                        plan.rules.len(),
                        self.scope,
                        message
                    );
                    let mut errors = FieldErrors::new();
                    errors.add("submission", message.clone());
                    self.errors = errors;
                    return Err(Error::Submission { message, created });
                }
            }
        }

        info!(
            "Created {} rules for {} (highest risk: {})",
            created.len(),
            self.scope,
            plan.highest_risk()
        );

        let receipt = SubmissionReceipt {
            scope: self.scope.clone(),
            rule_ids: created,
            plan,
        };
        self.reset();
        Ok(receipt)
    }
}
