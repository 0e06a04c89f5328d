//! Rule evaluation against user attributes.

mod evaluator;

pub use evaluator::Evaluator;

use crate::rules::UserField;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The attributes of an authenticated user that field rules match against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAttributes {
    /// The principal's username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Distinguished name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn: Option<String>,
    /// Group memberships
    #[serde(default)]
    pub groups: Vec<String>,
    /// Name of the authenticating realm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    /// Realm-provided metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl UserAttributes {
    /// Create attributes for the given username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }

    /// Set the distinguished name.
    pub fn with_dn(mut self, dn: impl Into<String>) -> Self {
        self.dn = Some(dn.into());
        self
    }

    /// Set the groups.
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Set the realm name.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The values of an attribute, as a list.
    ///
    /// Single-valued attributes that are missing yield `[null]` so that a null
    /// field value matches them. Groups are always a list, possibly empty.
    /// Array-valued metadata is flattened.
    pub fn values_for(&self, field: &UserField) -> Vec<serde_json::Value> {
        let single = |value: Option<&String>| {
            vec![value
                .map(|v| serde_json::Value::String(v.clone()))
                .unwrap_or(serde_json::Value::Null)]
        };

        match field {
            UserField::Username => single(self.username.as_ref()),
            UserField::Dn => single(self.dn.as_ref()),
            UserField::Realm => single(self.realm.as_ref()),
            UserField::Groups => self
                .groups
                .iter()
                .map(|g| serde_json::Value::String(g.clone()))
                .collect(),
            UserField::Metadata(key) => match self.metadata.get(key) {
                Some(serde_json::Value::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
                None => vec![serde_json::Value::Null],
            },
            UserField::Other(_) => vec![serde_json::Value::Null],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_for() {
        let user = UserAttributes::new("alice")
            .with_groups(["a", "b"])
            .with_metadata("tags", json!(["x", "y"]));

        assert_eq!(user.values_for(&UserField::Username), vec![json!("alice")]);
        assert_eq!(user.values_for(&UserField::Dn), vec![json!(null)]);
        assert_eq!(user.values_for(&UserField::Groups), vec![json!("a"), json!("b")]);
        assert_eq!(
            user.values_for(&UserField::Metadata("tags".to_string())),
            vec![json!("x"), json!("y")]
        );
    }

    #[test]
    fn test_user_attributes_deserialize() {
        let user: UserAttributes = serde_json::from_value(json!({
            "username": "bob",
            "groups": ["ops"],
            "metadata": { "level": 2 }
        }))
        .unwrap();

        assert_eq!(user.username.as_deref(), Some("bob"));
        assert_eq!(user.groups, vec!["ops"]);
        assert_eq!(user.metadata.get("level"), Some(&json!(2)));
    }
}
