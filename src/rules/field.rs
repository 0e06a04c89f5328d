//! Field rule definitions.

use super::wrap_negated;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A leaf rule matching a user attribute against one or more literal values.
///
/// The rule is satisfied when the attribute equals any of its values.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    field: String,
    values: Vec<FieldValue>,
    negated: bool,
}

impl FieldRule {
    /// Create a field rule for the given attribute name.
    pub fn new<V: Into<FieldValue>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// Set whether this rule is negated (`exceptField`).
    pub fn with_negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    /// The attribute name exactly as written in the rule document.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The attribute this rule matches against.
    pub fn user_field(&self) -> UserField {
        UserField::from(self.field.as_str())
    }

    /// The values this rule accepts.
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Whether this rule is negated.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Set the negation flag.
    pub fn set_negated(&mut self, negated: bool) {
        self.negated = negated;
    }

    /// Change the attribute name.
    pub fn set_field(&mut self, field: impl Into<String>) {
        self.field = field.into();
    }

    /// Replace all values.
    pub fn set_values(&mut self, values: Vec<FieldValue>) {
        self.values = values;
    }

    /// Append a value.
    pub fn add_value(&mut self, value: impl Into<FieldValue>) {
        self.values.push(value.into());
    }

    /// Remove the value at `index`.
    pub fn remove_value(&mut self, index: usize) -> crate::Result<FieldValue> {
        if index >= self.values.len() {
            return Err(crate::Error::index_out_of_range(index, self.values.len()));
        }
        Ok(self.values.remove(index))
    }

    /// Serialize to the wire format.
    ///
    /// A single value is written as a bare scalar; the backend grammar tells a
    /// scalar match from a list match only by JSON shape.
    pub fn to_raw(&self) -> serde_json::Value {
        let value = match self.values.as_slice() {
            [single] => single.to_json(),
            values => serde_json::Value::Array(values.iter().map(FieldValue::to_json).collect()),
        };

        let mut field = serde_json::Map::new();
        field.insert(self.field.clone(), value);

        let mut raw = serde_json::Map::new();
        raw.insert("field".to_string(), serde_json::Value::Object(field));

        wrap_negated(serde_json::Value::Object(raw), self.negated)
    }

    /// Validate the rule for submission.
    pub(crate) fn validate_at(&self, path: &str) -> crate::Result<()> {
        if self.field.trim().is_empty() {
            return Err(crate::Error::validation_field("Field rule requires a field name", path));
        }
        if self.values.is_empty() {
            return Err(crate::Error::validation_field(
                format!("Field rule for `{}` requires at least one value", self.field),
                path,
            ));
        }
        Ok(())
    }
}

/// The user attribute named by a field rule.
///
/// The set of attributes is open-ended: names that are not recognized are kept
/// as [`UserField::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserField {
    /// The principal's username
    Username,
    /// The distinguished name
    Dn,
    /// Group memberships (multi-valued)
    Groups,
    /// Name of the authenticating realm (`realm` or `realm.name`)
    Realm,
    /// A key in the user's metadata (`metadata.<key>`)
    Metadata(String),
    /// Any other attribute name
    Other(String),
}

impl From<&str> for UserField {
    fn from(field: &str) -> Self {
        match field {
            "username" => UserField::Username,
            "dn" => UserField::Dn,
            "groups" => UserField::Groups,
            "realm" | "realm.name" => UserField::Realm,
            other => match other.strip_prefix("metadata.") {
                Some(key) if !key.is_empty() => UserField::Metadata(key.to_string()),
                _ => UserField::Other(other.to_string()),
            },
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserField::Username => write!(f, "username"),
            UserField::Dn => write!(f, "dn"),
            UserField::Groups => write!(f, "groups"),
            UserField::Realm => write!(f, "realm.name"),
            UserField::Metadata(key) => write!(f, "metadata.{}", key),
            UserField::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A literal value in a field rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    /// String value, may carry a wildcard or `/regex/` pattern
    String(String),
    /// Numeric value
    Number(serde_json::Number),
    /// Null value
    Null,
}

impl FieldValue {
    /// Convert to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::Value::Number(n.clone()),
            FieldValue::Null => serde_json::Value::Null,
        }
    }

    /// Convert from a JSON scalar. Returns `None` for booleans, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(FieldValue::String(s.clone())),
            serde_json::Value::Number(n) => Some(FieldValue::Number(n.clone())),
            serde_json::Value::Null => Some(FieldValue::Null),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(i64::from(n).into())
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}
