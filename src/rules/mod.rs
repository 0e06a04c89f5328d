//! Rule tree data structures and their wire format.
//!
//! A rule is either a [`FieldRule`] leaf or a [`RuleGroup`] combining children
//! with `any`/`all` semantics. Either may be negated. In memory negation is a
//! flag on the node; on the wire it is an `except` wrapper one level up.

mod field;
mod group;
mod raw;
mod tree;

pub use field::{FieldRule, FieldValue, UserField};
pub use group::{GroupOperator, RuleGroup};
pub use tree::RuleTree;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Deepest rule tree the structured editor handles. Deeper trees must be
/// edited as raw JSON.
pub const VISUAL_MAX_RULE_DEPTH: usize = 5;

/// Discriminates the rule variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    /// Field match
    Field,
    /// Logical OR of children
    Any,
    /// Logical AND of children
    All,
    /// Negated field match
    ExceptField,
    /// Negated OR
    ExceptAny,
    /// Negated AND
    ExceptAll,
}

impl RuleKind {
    /// All kinds, in menu order.
    pub const ALL: [RuleKind; 6] = [
        RuleKind::Field,
        RuleKind::Any,
        RuleKind::All,
        RuleKind::ExceptField,
        RuleKind::ExceptAny,
        RuleKind::ExceptAll,
    ];

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Field => "field",
            RuleKind::Any => "any",
            RuleKind::All => "all",
            RuleKind::ExceptField => "exceptField",
            RuleKind::ExceptAny => "exceptAny",
            RuleKind::ExceptAll => "exceptAll",
        }
    }

    /// Whether this kind is one of the `except*` kinds.
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            RuleKind::ExceptField | RuleKind::ExceptAny | RuleKind::ExceptAll
        )
    }

    /// Build the default rule of this kind, as the editor's "add rule" menu does.
    pub fn new_rule(&self) -> Rule {
        let rule = match self {
            RuleKind::Field | RuleKind::ExceptField => {
                Rule::Field(FieldRule::new("username", ["*"]))
            }
            RuleKind::Any | RuleKind::ExceptAny => Rule::Group(RuleGroup::any(Vec::new())),
            RuleKind::All | RuleKind::ExceptAll => Rule::Group(RuleGroup::all(Vec::new())),
        };
        rule.with_negated(self.is_negated())
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuleKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::Error::unsupported_rule_type(s))
    }
}

/// A single predicate node in the rule tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Leaf rule matching a user attribute
    Field(FieldRule),
    /// Composite rule
    Group(RuleGroup),
}

impl Rule {
    /// Parse a rule from its raw JSON document.
    ///
    /// An empty object is malformed here; use [`RuleTree::from_raw`] for
    /// documents where `{}` means "no rules".
    pub fn from_raw(raw: &serde_json::Value) -> crate::Result<Self> {
        raw::parse_rule(raw, "$")
    }

    /// Serialize to the wire format.
    pub fn to_raw(&self) -> serde_json::Value {
        match self {
            Rule::Field(field) => field.to_raw(),
            Rule::Group(group) => group.to_raw(),
        }
    }

    /// The kind of this rule.
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Field(field) if field.is_negated() => RuleKind::ExceptField,
            Rule::Field(_) => RuleKind::Field,
            Rule::Group(group) => match (group.operator(), group.is_negated()) {
                (GroupOperator::Any, false) => RuleKind::Any,
                (GroupOperator::All, false) => RuleKind::All,
                (GroupOperator::Any, true) => RuleKind::ExceptAny,
                (GroupOperator::All, true) => RuleKind::ExceptAll,
            },
        }
    }

    /// Whether this rule is negated.
    pub fn is_negated(&self) -> bool {
        match self {
            Rule::Field(field) => field.is_negated(),
            Rule::Group(group) => group.is_negated(),
        }
    }

    /// Set the negation flag.
    pub fn set_negated(&mut self, negated: bool) {
        match self {
            Rule::Field(field) => field.set_negated(negated),
            Rule::Group(group) => group.set_negated(negated),
        }
    }

    /// Return this rule with the given negation flag.
    pub fn with_negated(mut self, negated: bool) -> Self {
        self.set_negated(negated);
        self
    }

    /// Depth of this rule. A field rule has depth 1; a group is one deeper than
    /// its deepest child. Negation adds no depth.
    pub fn depth(&self) -> usize {
        match self {
            Rule::Field(_) => 1,
            Rule::Group(group) => 1 + group.iter().map(Rule::depth).max().unwrap_or(0),
        }
    }

    /// The field rule, if this is a leaf.
    pub fn as_field(&self) -> Option<&FieldRule> {
        match self {
            Rule::Field(field) => Some(field),
            Rule::Group(_) => None,
        }
    }

    /// The field rule, mutably.
    pub fn as_field_mut(&mut self) -> Option<&mut FieldRule> {
        match self {
            Rule::Field(field) => Some(field),
            Rule::Group(_) => None,
        }
    }

    /// The group, if this is a composite rule.
    pub fn as_group(&self) -> Option<&RuleGroup> {
        match self {
            Rule::Group(group) => Some(group),
            Rule::Field(_) => None,
        }
    }

    /// The group, mutably.
    pub fn as_group_mut(&mut self) -> Option<&mut RuleGroup> {
        match self {
            Rule::Group(group) => Some(group),
            Rule::Field(_) => None,
        }
    }

    /// Validate the rule for submission: every field rule needs a name and at
    /// least one value.
    pub fn validate(&self) -> crate::Result<()> {
        self.validate_at("$")
    }

    pub(crate) fn validate_at(&self, path: &str) -> crate::Result<()> {
        match self {
            Rule::Field(field) => field.validate_at(path),
            Rule::Group(group) => {
                for (i, child) in group.iter().enumerate() {
                    child.validate_at(&group.child_path(path, i))?;
                }
                Ok(())
            }
        }
    }
}

impl From<FieldRule> for Rule {
    fn from(rule: FieldRule) -> Self {
        Rule::Field(rule)
    }
}

impl From<RuleGroup> for Rule {
    fn from(group: RuleGroup) -> Self {
        Rule::Group(group)
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Rule::from_raw(&raw).map_err(serde::de::Error::custom)
    }
}

/// Wrap a raw rule in `except` when negated.
fn wrap_negated(raw: serde_json::Value, negated: bool) -> serde_json::Value {
    if !negated {
        return raw;
    }
    let mut wrapper = serde_json::Map::new();
    wrapper.insert("except".to_string(), raw);
    serde_json::Value::Object(wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_dispatch() {
        let field = Rule::Field(FieldRule::new("username", ["a"]));
        assert_eq!(field.kind(), RuleKind::Field);
        assert_eq!(field.clone().with_negated(true).kind(), RuleKind::ExceptField);

        let any = Rule::Group(RuleGroup::any(vec![]));
        assert_eq!(any.kind(), RuleKind::Any);
        assert_eq!(any.with_negated(true).kind(), RuleKind::ExceptAny);

        let all = Rule::Group(RuleGroup::all(vec![]));
        assert_eq!(all.kind(), RuleKind::All);
        assert_eq!(all.with_negated(true).kind(), RuleKind::ExceptAll);
    }

    #[test]
    fn test_kind_from_str() {
        for kind in RuleKind::ALL {
            assert_eq!(kind.as_str().parse::<RuleKind>().unwrap(), kind);
        }

        let err = "except".parse::<RuleKind>().unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedRuleType { ref rule_type } if rule_type == "except"));
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(serde_json::to_string(&RuleKind::ExceptAny).unwrap(), "\"exceptAny\"");
    }

    #[test]
    fn test_new_rule_for_kind() {
        for kind in RuleKind::ALL {
            assert_eq!(kind.new_rule().kind(), kind);
        }
    }

    #[test]
    fn test_negation_wrapping() {
        let rule = Rule::Group(
            RuleGroup::any(vec![FieldRule::new("realm", ["ldap1"]).into()]).with_negated(true),
        );
        assert_eq!(
            rule.to_raw(),
            json!({ "except": { "any": [{ "field": { "realm": "ldap1" } }] } })
        );
    }

    #[test]
    fn test_depth() {
        let leaf: Rule = FieldRule::new("username", ["a"]).into();
        assert_eq!(leaf.depth(), 1);
        assert_eq!(Rule::Group(RuleGroup::any(vec![])).depth(), 1);

        let nested = Rule::Group(RuleGroup::all(vec![
            leaf.clone(),
            Rule::Group(RuleGroup::any(vec![leaf.clone()]).with_negated(true)),
        ]));
        assert_eq!(nested.depth(), 3);
    }

    #[test]
    fn test_validate_reports_path_of_empty_field() {
        let rule = Rule::Group(RuleGroup::all(vec![
            FieldRule::new("username", ["a"]).into(),
            Rule::Group(
                RuleGroup::any(vec![FieldRule::new("groups", Vec::<FieldValue>::new()).into()])
                    .with_negated(true),
            ),
        ]));

        match rule.validate() {
            Err(crate::Error::Validation { field, .. }) => {
                assert_eq!(field.as_deref(), Some("$.all[1].except.any[0]"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_serde_uses_wire_format() {
        let rule: Rule = serde_json::from_value(json!({ "all": [{ "field": { "dn": "cn=a" } }] })).unwrap();
        assert_eq!(rule.kind(), RuleKind::All);
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({ "all": [{ "field": { "dn": "cn=a" } }] })
        );

        assert!(serde_json::from_value::<Rule>(json!({})).is_err());
    }
}
