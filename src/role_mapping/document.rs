//! Loading role mappings from YAML and JSON documents.

use super::RoleMapping;
use crate::error::ErrorContext;
use crate::rules::RuleTree;
use serde_json::Value;
use std::path::Path;

/// A set of role mappings loaded from a file.
///
/// Three layouts are accepted:
/// - a single mapping object with a `name`
/// - a list of mapping objects
/// - an object keyed by mapping name, as returned by the backend's list API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleMappingDocument {
    /// The mappings, in document order
    pub role_mappings: Vec<RoleMapping>,
}

impl RoleMappingDocument {
    /// Create a document with the given mappings.
    pub fn with_mappings(role_mappings: Vec<RoleMapping>) -> Self {
        Self { role_mappings }
    }

    /// Build a document from a parsed value.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        let entries: Vec<(Option<String>, Value)> = match value {
            Value::Array(items) => items.into_iter().map(|item| (None, item)).collect(),
            Value::Object(object) if object.get("name").map_or(false, Value::is_string) => {
                vec![(None, Value::Object(object))]
            }
            Value::Object(object) => object
                .into_iter()
                .map(|(name, item)| (Some(name), item))
                .collect(),
            other => {
                return Err(crate::Error::validation(format!(
                    "Expected a role mapping, a list or a map of role mappings, but found {}",
                    type_name(&other)
                )))
            }
        };

        let role_mappings = entries
            .into_iter()
            .enumerate()
            .map(|(i, (key, item))| parse_mapping(i, key, item))
            .collect::<crate::Result<Vec<_>>>()?;

        tracing::debug!(count = role_mappings.len(), "Loaded role mapping document");
        Ok(Self { role_mappings })
    }

    /// Parse a document from YAML.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a document from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Load a document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Self::from_json(&content).or_else(|_| Self::from_yaml(&content)),
        }
    }

    /// Convert the document to a JSON list of mappings.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(&self.role_mappings).map_err(crate::Error::from)
    }

    /// Convert the document to a YAML list of mappings.
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(&self.role_mappings).map_err(crate::Error::from)
    }

    /// Validate every mapping in the document.
    pub fn validate(&self) -> crate::Result<()> {
        for mapping in &self.role_mappings {
            mapping.validate().map_err(|e| match e {
                crate::Error::Validation { message, field } => crate::Error::Validation {
                    message: format!("{}: {}", mapping.name, message),
                    field,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    /// Find a mapping by name.
    pub fn get(&self, name: &str) -> Option<&RoleMapping> {
        self.role_mappings.iter().find(|m| m.name == name)
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.role_mappings.len()
    }

    /// Whether the document holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.role_mappings.is_empty()
    }
}

/// Parse one mapping. The rules are parsed separately so that malformed rule
/// errors keep their structured path.
fn parse_mapping(index: usize, key: Option<String>, item: Value) -> crate::Result<RoleMapping> {
    let mut object = match item {
        Value::Object(object) => object,
        other => {
            return Err(crate::Error::validation(format!(
                "Expected a role mapping object at entry {}, but found {}",
                index,
                type_name(&other)
            )))
        }
    };

    if let Some(name) = &key {
        object
            .entry("name")
            .or_insert_with(|| Value::String(name.clone()));
    }

    let label = match object.get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => format!("[{}]", index),
    };

    let rules = object.remove("rules").unwrap_or(Value::Null);
    let rules = RuleTree::from_raw(&rules).within(&format!("{}.rules", label))?;

    let mut mapping: RoleMapping = serde_json::from_value(Value::Object(object))?;
    mapping.rules = rules;
    mapping.normalize_templates();
    Ok(mapping)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role_mapping::TemplateSource;
    use std::io::Write;

    const YAML_LIST: &str = r#"
- name: ldap-admins
  roles: [superuser]
  rules:
    all:
      - field: { realm.name: ldap1 }
      - field: { groups: "cn=admins,dc=example,dc=com" }
- name: saml-users
  enabled: false
  role_templates:
    - template: '{"source":"{{#tojson}}groups{{/tojson}}"}'
      format: json
  rules:
    field: { realm.name: saml1 }
"#;

    #[test]
    fn test_load_yaml_list() {
        let document = RoleMappingDocument::from_yaml(YAML_LIST).unwrap();
        assert_eq!(document.len(), 2);

        let admins = document.get("ldap-admins").unwrap();
        assert_eq!(admins.rules.max_depth(), 2);

        let saml = document.get("saml-users").unwrap();
        assert!(!saml.enabled);
        assert!(matches!(
            saml.role_templates[0].template,
            TemplateSource::Inline { .. }
        ));
        assert!(document.validate().is_ok());
    }

    #[test]
    fn test_load_single_mapping() {
        let document = RoleMappingDocument::from_json(
            r#"{ "name": "one", "roles": ["viewer"], "rules": { "field": { "username": "*" } } }"#,
        )
        .unwrap();
        assert_eq!(document.len(), 1);
        assert_eq!(document.role_mappings[0].name, "one");
    }

    #[test]
    fn test_load_keyed_map() {
        let document = RoleMappingDocument::from_json(
            r#"{
                "first": { "enabled": true, "roles": ["a"], "rules": { "field": { "username": "a" } } },
                "second": { "enabled": true, "roles": ["b"], "rules": {} }
            }"#,
        )
        .unwrap();

        assert_eq!(document.len(), 2);
        assert!(document.get("first").is_some());
        assert!(document.get("second").unwrap().rules.is_empty());
    }

    #[test]
    fn test_malformed_rules_report_mapping_path() {
        let err = RoleMappingDocument::from_json(
            r#"[{ "name": "broken", "roles": ["a"], "rules": { "all": [{ "field": {} }] } }]"#,
        )
        .unwrap_err();

        match err {
            crate::Error::MalformedRule { path, .. } => {
                assert_eq!(path, "broken.rules.all[0].field");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_scalar_document() {
        assert!(RoleMappingDocument::from_json("42").is_err());
        assert!(RoleMappingDocument::from_json("[1]").is_err());
    }

    #[test]
    fn test_validate_names_the_mapping() {
        let document = RoleMappingDocument::from_json(
            r#"[{ "name": "norules", "roles": ["a"], "rules": {} }]"#,
        )
        .unwrap();
        let err = document.validate().unwrap_err();
        assert!(err.to_string().contains("norules"));
    }

    #[test]
    fn test_from_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML_LIST.as_bytes()).unwrap();

        let document = RoleMappingDocument::from_file(file.path()).unwrap();
        assert_eq!(document.len(), 2);
    }

    #[test]
    fn test_json_output_reloads() {
        let document = RoleMappingDocument::from_yaml(YAML_LIST).unwrap();
        let json = document.to_json().unwrap();
        let reloaded = RoleMappingDocument::from_json(&json).unwrap();
        assert_eq!(reloaded, document);
    }
}
