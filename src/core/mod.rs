//! Core rule engine functionality
//!
//! Leaf modules first:
//!
//! - [`vocabulary`]: User ↔ backend action/direction mapping
//! - [`ports`]: Port specification parsing
//! - [`firewall`]: Rule data structures (drafts, template rules, concrete rules)
//! - [`catalog`]: Service preset and template registries
//! - [`expander`]: Template expansion
//! - [`risk`]: Rule risk scoring
//! - [`priority`]: Evaluation ordering
//! - [`wizard`]: Step controller and submission pipeline
//! - [`store`]: Rule Store collaborator interface
//! - [`error`]: Error types for engine operations
//! - [`rule_constraints`]: Business rules for valid field combinations

pub mod catalog;
pub mod error;
pub mod expander;
pub mod firewall;
pub mod ports;
pub mod priority;
pub mod risk;
pub mod rule_constraints;
pub mod store;
pub mod vocabulary;
pub mod wizard;

#[cfg(test)]
pub mod test_helpers;
