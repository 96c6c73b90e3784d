//! Shared test utilities for core module tests
//!
//! Provides common test helpers to avoid duplication across test suites.
//! This module is only compiled in test mode.

use crate::core::catalog::Catalog;
use crate::core::firewall::{ConcreteRule, RuleDraft};
use crate::core::store::{MemoryRuleStore, RuleId, RuleScope, RuleStore, StoreError, StoredRule};
use crate::core::wizard::{
    Customization, ServiceSelection, StepInput, WizardSession, WizardStep,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

/// Built-in catalog shared by every test
pub static CATALOG: LazyLock<Arc<Catalog>> = LazyLock::new(|| Arc::new(Catalog::builtin()));

/// Scope used by wizard tests
pub fn test_scope() -> RuleScope {
    RuleScope::Vm("vm-test".to_string())
}

/// Creates a draft with the given vocabulary terms and port spec.
pub fn create_test_draft(action: &str, direction: &str, port: &str) -> RuleDraft {
    RuleDraft::new(action, direction)
        .with_protocol("tcp")
        .with_port(port)
}

/// Resolves a single-token draft into its concrete rule.
///
/// # Panics
///
/// Panics if the draft does not resolve to exactly one rule.
pub fn create_test_rule(action: &str, direction: &str, port: &str) -> ConcreteRule {
    let mut rules = create_test_draft(action, direction, port)
        .to_concrete_rules()
        .expect("test draft should be valid");
    assert_eq!(rules.len(), 1, "test draft should produce one rule");
    rules.remove(0)
}

/// Drives a new session through every step up to review.
///
/// # Panics
///
/// Panics if any step is rejected.
pub fn session_at_review(
    direction: &str,
    service: ServiceSelection,
    customization: Customization,
) -> WizardSession {
    let mut session = WizardSession::new(Arc::clone(&CATALOG), test_scope());
    session
        .advance(WizardStep::Direction, StepInput::Direction(direction.to_string()))
        .expect("direction step");
    session
        .advance(WizardStep::Service, StepInput::Service(service))
        .expect("service step");
    session
        .advance(
            WizardStep::Customization,
            StepInput::Customization(customization),
        )
        .expect("customization step");
    assert_eq!(session.step(), WizardStep::Review);
    session
}

/// Store that accepts `accept` rules and then rejects everything with `message`.
pub struct FlakyStore {
    inner: MemoryRuleStore,
    remaining: AtomicUsize,
    message: String,
}

impl FlakyStore {
    pub fn new(accept: usize, message: &str) -> Self {
        Self {
            inner: MemoryRuleStore::new(),
            remaining: AtomicUsize::new(accept),
            message: message.to_string(),
        }
    }

    pub async fn stored(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl RuleStore for FlakyStore {
    async fn create_rule(&self, scope: &RuleScope, rule: &ConcreteRule) -> Result<RuleId, StoreError> {
        let accepted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if accepted {
            self.inner.create_rule(scope, rule).await
        } else {
            Err(StoreError::Rejected(self.message.clone()))
        }
    }

    async fn list_rules(&self, scope: &RuleScope) -> Result<Vec<StoredRule>, StoreError> {
        self.inner.list_rules(scope).await
    }

    async fn delete_rule(&self, id: RuleId) -> Result<(), StoreError> {
        self.inner.delete_rule(id).await
    }
}
