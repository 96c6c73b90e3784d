//! Integration tests for VMFW
//!
//! These tests drive the public API end to end: catalog lookups, template
//! expansion, draft resolution, and full wizard submissions against an
//! in-memory Rule Store and a store that fails on demand.
//!
//! ```bash
//! cargo test --test integration_tests
//! ```

#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use vmfw::core::catalog::Catalog;
use vmfw::core::firewall::{ConcreteRule, Origin, Protocol, RuleDraft};
use vmfw::core::ports::PortRange;
use vmfw::core::priority::sort_rules_by_priority;
use vmfw::core::store::{MemoryRuleStore, RuleId, RuleScope, RuleStore, StoreError, StoredRule};
use vmfw::core::vocabulary::{BackendAction, BackendDirection};
use vmfw::core::wizard::{
    Customization, ServiceSelection, StepInput, WizardSession, WizardStep,
};
use vmfw::Error;

/// Store that records every call and rejects the Nth create
struct RecordingStore {
    calls: Mutex<Vec<ConcreteRule>>,
    fail_at: Option<usize>,
    attempts: AtomicUsize,
}

impl RecordingStore {
    fn new(fail_at: Option<usize>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_at,
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RuleStore for RecordingStore {
    async fn create_rule(&self, _scope: &RuleScope, rule: &ConcreteRule) -> Result<RuleId, StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if Some(attempt) == self.fail_at {
            return Err(StoreError::Rejected("Too many rules for this VM".to_string()));
        }
        self.calls.lock().await.push(rule.clone());
        Ok(uuid::Uuid::new_v4())
    }

    async fn list_rules(&self, _scope: &RuleScope) -> Result<Vec<StoredRule>, StoreError> {
        Ok(Vec::new())
    }

    async fn delete_rule(&self, id: RuleId) -> Result<(), StoreError> {
        Err(StoreError::NotFound(id))
    }
}

fn new_session(scope: RuleScope) -> WizardSession {
    WizardSession::new(Arc::new(Catalog::builtin()), scope)
}

fn walk(session: &mut WizardSession, direction: &str, service: ServiceSelection, custom: Customization) {
    session
        .advance(WizardStep::Direction, StepInput::Direction(direction.to_string()))
        .unwrap();
    session
        .advance(WizardStep::Service, StepInput::Service(service))
        .unwrap();
    session
        .advance(WizardStep::Customization, StepInput::Customization(custom))
        .unwrap();
}

#[tokio::test]
async fn test_template_submission_one_call_per_rule() {
    let store = RecordingStore::new(None);
    let mut session = new_session(RuleScope::Department("web".to_string()));
    walk(
        &mut session,
        "inbound",
        ServiceSelection::Template("web-server".to_string()),
        Customization::default(),
    );

    let receipt = session.complete(&store).await.unwrap();
    assert_eq!(receipt.rule_ids.len(), 5);

    let calls = store.calls.lock().await;
    assert_eq!(calls.len(), 5);
    assert_eq!(calls[0].action, BackendAction::Drop);
    assert!(calls.iter().all(|r| r.origin == Origin::Template));
    assert_eq!(*calls, receipt.plan.rules);
}

#[tokio::test]
async fn test_discontiguous_ports_become_separate_calls() {
    let store = RecordingStore::new(None);
    let mut session = new_session(RuleScope::Vm("vm-9".to_string()));
    walk(
        &mut session,
        "inbound",
        ServiceSelection::Custom {
            protocol: "tcp".to_string(),
            port: "22, 80, 9000-9100".to_string(),
        },
        Customization::with_action("allow"),
    );

    session.complete(&store).await.unwrap();
    let calls = store.calls.lock().await;
    let ports: Vec<_> = calls.iter().map(|r| r.ports).collect();
    assert_eq!(
        ports,
        [
            Some(PortRange::single(22)),
            Some(PortRange::single(80)),
            Some(PortRange::new(9000, 9100)),
        ]
    );
}

#[tokio::test]
async fn test_failure_midway_keeps_review_state() {
    let store = RecordingStore::new(Some(2));
    let mut session = new_session(RuleScope::Vm("vm-9".to_string()));
    walk(
        &mut session,
        "outbound",
        ServiceSelection::Template("mail-server".to_string()),
        Customization {
            comment: Some("Mail relay".to_string()),
            ..Customization::default()
        },
    );

    match session.complete(&store).await {
        Err(Error::Submission { message, created }) => {
            assert_eq!(message, "Too many rules for this VM");
            assert_eq!(created.len(), 2);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(session.step(), WizardStep::Review);
    assert!(session.plan().is_ok());
}

#[tokio::test]
async fn test_memory_store_round_trip_through_display_vocabulary() {
    let store = MemoryRuleStore::new();
    let scope = RuleScope::Filter("default".to_string());
    let mut session = new_session(scope.clone());
    walk(
        &mut session,
        "bidirectional",
        ServiceSelection::Preset("ping".to_string()),
        Customization {
            source: Some("192.168.0.0/16".to_string()),
            ..Customization::with_action("reject")
        },
    );
    session.complete(&store).await.unwrap();

    let stored = store.list_rules(&scope).await.unwrap();
    assert_eq!(stored.len(), 1);
    let rule = &stored[0].rule;
    assert_eq!(rule.protocol, Protocol::Icmp);
    assert_eq!(rule.direction, BackendDirection::InOut);

    let draft = rule.to_draft();
    assert_eq!(draft.action, "reject");
    assert_eq!(draft.direction, "bidirectional");
    assert_eq!(draft.source.as_deref(), Some("192.168.0.0/16"));

    store.delete_rule(stored[0].id).await.unwrap();
    assert!(store.list_rules(&scope).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_rules_never_reach_store() {
    let store = RecordingStore::new(None);
    let mut session = new_session(RuleScope::Vm("vm-1".to_string()));
    session
        .advance(WizardStep::Direction, StepInput::Direction("inbound".to_string()))
        .unwrap();
    session
        .advance(
            WizardStep::Service,
            StepInput::Service(ServiceSelection::Preset("ssh".to_string())),
        )
        .unwrap();
    let result = session.advance(
        WizardStep::Customization,
        StepInput::Customization(Customization {
            source: Some("10.0.0.0/99".to_string()),
            ..Customization::with_action("allow")
        }),
    );
    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(session.complete(&store).await.is_err());
    assert!(store.calls.lock().await.is_empty());
}

#[test]
fn test_sorted_template_matches_first_match_semantics() {
    let catalog = Catalog::builtin();
    let template = catalog.get_firewall_template("lockdown").unwrap();
    let drafts: Vec<RuleDraft> = vmfw::core::expander::expand_template_to_rules(&catalog, template)
        .iter()
        .map(|r| r.to_draft())
        .collect();
    let sorted = sort_rules_by_priority(&drafts);

    assert_eq!(sorted[0].action, "deny");
    assert_eq!(sorted[0].port, None);
}
