//! VMFW - VM Firewall policy engine
//!
//! Turns a catalog of named services and policy templates, plus free-form user
//! input, into validated, risk-scored, deterministically ordered firewall rules
//! for VMs and departments.
//!
//! # Architecture
//!
//! - [`core`] - Rule model, parsing, catalog, expansion, scoring, ordering and the wizard
//! - [`validators`] - Input validation and sanitization
//! - [`config`] - Configuration persistence
//! - [`utils`] - Utility functions (XDG directories, etc.)
//!
//! # Guarantees
//!
//! - Only validated, backend-vocabulary rules reach the Rule Store
//! - Every public entry point returns a result or an error list, never panics on user input
//! - Rule ordering matches first-match-wins evaluation
//! - Atomic config writes with owner-only permissions

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod core;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use core::catalog::Catalog;
pub use core::error::{Error, Result};
pub use core::firewall::{ConcreteRule, Protocol, RuleDraft};
pub use core::wizard::WizardSession;
