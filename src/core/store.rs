//! Rule Store collaborator
//!
//! The engine hands [`ConcreteRule`]s to a [`RuleStore`] at wizard completion,
//! one `create_rule` call per rule. Persistence is the store's business;
//! [`MemoryRuleStore`] is the in-process implementation used by the CLI and tests.

use crate::core::firewall::{ConcreteRule, MAX_RULES};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

pub type RuleId = Uuid;

/// Which filter, department or VM a rule attaches to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum RuleScope {
    Filter(String),
    Department(String),
    Vm(String),
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleScope::Filter(id) => write!(f, "filter:{id}"),
            RuleScope::Department(id) => write!(f, "department:{id}"),
            RuleScope::Vm(id) => write!(f, "vm:{id}"),
        }
    }
}

/// A rule as the store keeps it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRule {
    pub id: RuleId,
    pub scope: RuleScope,
    pub rule: ConcreteRule,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store refused the rule; the message is shown to the user verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("Rule {0} not found")]
    NotFound(RuleId),
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn create_rule(&self, scope: &RuleScope, rule: &ConcreteRule) -> Result<RuleId, StoreError>;
    async fn list_rules(&self, scope: &RuleScope) -> Result<Vec<StoredRule>, StoreError>;
    async fn delete_rule(&self, id: RuleId) -> Result<(), StoreError>;
}

/// In-memory store keyed by scope
#[derive(Debug)]
pub struct MemoryRuleStore {
    rules: RwLock<HashMap<RuleScope, Vec<StoredRule>>>,
    max_rules: usize,
}

impl Default for MemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::with_limit(MAX_RULES)
    }

    pub fn with_limit(max_rules: usize) -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            max_rules,
        }
    }

    /// Total rules across all scopes
    pub async fn len(&self) -> usize {
        self.rules.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn create_rule(&self, scope: &RuleScope, rule: &ConcreteRule) -> Result<RuleId, StoreError> {
        let mut rules = self.rules.write().await;
        let existing = rules.entry(scope.clone()).or_default();

        if existing.iter().any(|stored| stored.rule == *rule) {
            return Err(StoreError::Rejected(format!(
                "Rule already exists in {scope}"
            )));
        }
        if existing.len() >= self.max_rules {
            return Err(StoreError::Rejected(format!(
                "Rule limit reached for {scope} (max {})",
                self.max_rules
            )));
        }

        let id = Uuid::new_v4();
        existing.push(StoredRule {
            id,
            scope: scope.clone(),
            rule: rule.clone(),
            created_at: Utc::now(),
        });
        debug!("Stored rule {id} in {scope}");
        Ok(id)
    }

    async fn list_rules(&self, scope: &RuleScope) -> Result<Vec<StoredRule>, StoreError> {
        Ok(self
            .rules
            .read()
            .await
            .get(scope)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_rule(&self, id: RuleId) -> Result<(), StoreError> {
        let mut rules = self.rules.write().await;
        for stored in rules.values_mut() {
            if let Some(pos) = stored.iter().position(|r| r.id == id) {
                stored.remove(pos);
                info!("Deleted rule {id}");
                return Ok(());
            }
        }
        Err(StoreError::NotFound(id))
    }
}
