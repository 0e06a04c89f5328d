//! # Role Mapping Rules
//!
//! The boolean rule-tree model behind access-control role mappings. A role
//! mapping grants roles to users whose attributes satisfy its rules; the rules
//! are a tree of `any`/`all` groups over `field` matches, any of which may be
//! negated with `except`.
//!
//! ## Features
//!
//! - **Rule Model**: owned rule trees with value semantics and bounds-checked mutation
//! - **Wire Format**: lossless conversion to and from the JSON rule document
//! - **Editor Session**: path-addressed edits with change notification and a JSON mode
//! - **Evaluation**: match rule trees against user attributes and resolve roles
//! - **Persistence**: load and save role mappings in memory or over HTTP
//!
//! ## Quick Start
//!
//! ```rust
//! use role_mapping_rules::{FieldRule, Rule, RuleGroup, RuleTree};
//! use serde_json::json;
//!
//! let rule: Rule = RuleGroup::any(vec![
//!     FieldRule::new("realm.name", ["ldap1"]).into(),
//! ])
//! .with_negated(true)
//! .into();
//!
//! assert_eq!(
//!     rule.to_raw(),
//!     json!({ "except": { "any": [{ "field": { "realm.name": "ldap1" } }] } })
//! );
//!
//! let tree = RuleTree::from_raw(&rule.to_raw()).unwrap();
//! assert_eq!(tree.root(), Some(&rule));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod core;
pub mod editor;
pub mod error;
pub mod integration;
pub mod role_mapping;
pub mod rules;
pub mod store;
pub mod telemetry;

// Re-export main types for convenience
pub use config::Config;
pub use core::{Evaluator, UserAttributes};
pub use editor::RuleEditor;
pub use error::{Error, Result};
pub use integration::RoleMappingsClient;
pub use role_mapping::{RoleMapping, RoleMappingDocument, RoleTemplate};
pub use rules::{
    FieldRule, FieldValue, GroupOperator, Rule, RuleGroup, RuleKind, RuleTree, UserField,
    VISUAL_MAX_RULE_DEPTH,
};
pub use store::{InMemoryRoleMappingStore, RoleMappingStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
