//! Role mapping definitions.
//!
//! A role mapping associates a rule tree with the roles to grant when the tree
//! matches a user. Everything except `rules` is pass-through configuration.

mod document;
mod template;

pub use document::RoleMappingDocument;
pub use template::{RoleTemplate, TemplateFormat, TemplateSource};

use crate::error::ErrorContext;
use crate::rules::RuleTree;
use serde::{Deserialize, Serialize};

/// A stored role mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMapping {
    /// Unique name of the mapping
    pub name: String,
    /// Whether this mapping is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Roles granted when the rules match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Templates producing role names when the rules match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_templates: Vec<RoleTemplate>,
    /// The rule tree; `{}` on the wire when empty
    #[serde(default)]
    pub rules: RuleTree,
    /// Arbitrary metadata
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl RoleMapping {
    /// Create a new enabled mapping with no roles and no rules.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            roles: Vec::new(),
            role_templates: Vec::new(),
            rules: RuleTree::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a role mapping builder.
    pub fn builder(name: impl Into<String>) -> RoleMappingBuilder {
        RoleMappingBuilder::new(name)
    }

    /// Parse stringified role templates into their structured form.
    pub fn normalize_templates(&mut self) {
        for template in &mut self.role_templates {
            template.normalize();
        }
    }

    /// Check if the mapping can be submitted.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::validation_field("Name is required", "name"));
        }

        if self.name.chars().any(char::is_whitespace) {
            return Err(crate::Error::validation_field(
                "Name cannot contain whitespace",
                "name",
            ));
        }

        if self.roles.is_empty() && self.role_templates.is_empty() {
            return Err(crate::Error::validation_field(
                "At least one role or role template is required",
                "roles",
            ));
        }

        if let Some(i) = self.roles.iter().position(|r| r.trim().is_empty()) {
            return Err(crate::Error::validation_field(
                "Role names cannot be empty",
                format!("roles[{}]", i),
            ));
        }

        for (i, template) in self.role_templates.iter().enumerate() {
            template
                .validate()
                .with_field(format!("role_templates[{}]", i))?;
        }

        if self.rules.is_empty() {
            return Err(crate::Error::validation_field(
                "At least one rule is required",
                "rules",
            ));
        }

        self.rules.validate().map_err(|e| match e {
            crate::Error::Validation { message, field } => crate::Error::Validation {
                message,
                field: Some(match field {
                    Some(path) => format!("rules{}", path.trim_start_matches('$')),
                    None => "rules".to_string(),
                }),
            },
            other => other,
        })
    }
}

/// Builder for creating role mappings.
#[derive(Debug)]
pub struct RoleMappingBuilder {
    mapping: RoleMapping,
}

impl RoleMappingBuilder {
    /// Create a new builder with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            mapping: RoleMapping::new(name),
        }
    }

    /// Set whether the mapping is enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.mapping.enabled = enabled;
        self
    }

    /// Add a role.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.mapping.roles.push(role.into());
        self
    }

    /// Add multiple roles.
    pub fn roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.mapping.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Add a role template.
    pub fn role_template(mut self, template: RoleTemplate) -> Self {
        self.mapping.role_templates.push(template);
        self
    }

    /// Set the rules.
    pub fn rules(mut self, rules: impl Into<RuleTree>) -> Self {
        self.mapping.rules = rules.into();
        self
    }

    /// Set a metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.mapping.metadata.insert(key.into(), value);
        self
    }

    /// Build the mapping.
    pub fn build(self) -> RoleMapping {
        self.mapping
    }
}
