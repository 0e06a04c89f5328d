//! The root of a role mapping's rules.

use super::Rule;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The rules of a role mapping: either empty or a single root rule.
///
/// On the wire an empty tree is `{}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTree {
    root: Option<Rule>,
}

impl RuleTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree with the given root.
    pub fn from_rule(rule: Rule) -> Self {
        Self { root: Some(rule) }
    }

    /// Parse a rules document. `{}` and `null` produce an empty tree.
    pub fn from_raw(raw: &serde_json::Value) -> crate::Result<Self> {
        let is_empty = match raw {
            serde_json::Value::Null => true,
            serde_json::Value::Object(object) => object.is_empty(),
            _ => false,
        };
        if is_empty {
            return Ok(Self::new());
        }

        let rule = Rule::from_raw(raw)?;
        tracing::debug!(kind = %rule.kind(), depth = rule.depth(), "Parsed rule tree");
        Ok(Self::from_rule(rule))
    }

    /// Serialize to the wire format.
    pub fn to_raw(&self) -> serde_json::Value {
        match &self.root {
            Some(rule) => rule.to_raw(),
            None => serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// The root rule, if any.
    pub fn root(&self) -> Option<&Rule> {
        self.root.as_ref()
    }

    /// The root rule, mutably.
    pub fn root_mut(&mut self) -> Option<&mut Rule> {
        self.root.as_mut()
    }

    /// Replace the root, returning the previous one.
    pub fn set_root(&mut self, rule: Option<Rule>) -> Option<Rule> {
        std::mem::replace(&mut self.root, rule)
    }

    /// Take the root, leaving the tree empty.
    pub fn take(&mut self) -> Option<Rule> {
        self.root.take()
    }

    /// Whether the tree has no rules.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Depth of the tree; 0 when empty.
    pub fn max_depth(&self) -> usize {
        self.root.as_ref().map(Rule::depth).unwrap_or(0)
    }

    /// Whether the structured editor can handle this tree, given its depth limit.
    pub fn can_use_visual_editor(&self, max_visual_depth: usize) -> bool {
        self.max_depth() < max_visual_depth
    }

    /// Validate every rule in the tree. An empty tree is valid here; role
    /// mappings require at least one rule separately.
    pub fn validate(&self) -> crate::Result<()> {
        match &self.root {
            Some(rule) => rule.validate(),
            None => Ok(()),
        }
    }
}

impl From<Rule> for RuleTree {
    fn from(rule: Rule) -> Self {
        Self::from_rule(rule)
    }
}

impl From<Option<Rule>> for RuleTree {
    fn from(root: Option<Rule>) -> Self {
        Self { root }
    }
}

impl Serialize for RuleTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        RuleTree::from_raw(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{FieldRule, FieldValue, GroupOperator, RuleGroup, VISUAL_MAX_RULE_DEPTH};
    use proptest::prelude::*;
    use serde_json::json;

    fn arb_value() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            "[a-z*]{1,8}".prop_map(FieldValue::from),
            any::<i64>().prop_map(FieldValue::from),
            Just(FieldValue::Null),
        ]
    }

    fn arb_field_rule() -> impl Strategy<Value = Rule> {
        (
            prop_oneof![
                Just("username".to_string()),
                Just("dn".to_string()),
                Just("groups".to_string()),
                Just("realm.name".to_string()),
                "metadata\\.[a-z]{1,6}",
                "[a-z_]{1,10}",
            ],
            prop::collection::vec(arb_value(), 0..4),
            any::<bool>(),
        )
            .prop_map(|(field, values, negated)| {
                Rule::Field(FieldRule::new(field, values).with_negated(negated))
            })
    }

    fn arb_rule() -> impl Strategy<Value = Rule> {
        arb_field_rule().prop_recursive(4, 48, 5, |inner| {
            (
                any::<bool>(),
                any::<bool>(),
                prop::collection::vec(inner, 0..5),
            )
                .prop_map(|(is_any, negated, rules)| {
                    let operator = if is_any {
                        GroupOperator::Any
                    } else {
                        GroupOperator::All
                    };
                    Rule::Group(RuleGroup::new(operator, rules).with_negated(negated))
                })
        })
    }

    /// Mutate the first group found (depth-first) or, failing that, the leaf.
    fn mutate(rule: &mut Rule) {
        match rule {
            Rule::Field(field) => field.add_value("mutated"),
            Rule::Group(group) => {
                if group.is_empty() {
                    group.add_rule(FieldRule::new("username", ["mutated"]).into());
                } else if let Some(child) = group.get_mut(0) {
                    mutate(child);
                }
            }
        }
    }

    proptest! {
        #[test]
        fn prop_round_trip(rule in arb_rule()) {
            let raw = rule.to_raw();
            let parsed = Rule::from_raw(&raw).unwrap();
            prop_assert_eq!(&parsed, &rule);
            prop_assert_eq!(parsed.to_raw(), raw);
        }

        #[test]
        fn prop_tree_round_trip_through_text(rule in arb_rule()) {
            let tree = RuleTree::from_rule(rule);
            let text = serde_json::to_string(&tree).unwrap();
            let parsed: RuleTree = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(parsed, tree);
        }

        #[test]
        fn prop_clone_is_independent(rule in arb_rule()) {
            let snapshot = rule.to_raw();
            let mut copy = rule.clone();
            mutate(&mut copy);

            prop_assert_eq!(rule.to_raw(), snapshot);
            prop_assert_ne!(copy, rule);
        }
    }

    #[test]
    fn test_empty_tree_serializes_as_empty_object() {
        let tree = RuleTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.to_raw(), json!({}));
        assert_eq!(tree.max_depth(), 0);
    }

    #[test]
    fn test_empty_document_produces_empty_tree() {
        assert!(RuleTree::from_raw(&json!({})).unwrap().is_empty());
        assert!(RuleTree::from_raw(&json!(null)).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        let err = RuleTree::from_raw(&json!({ "field": { "username": "a" }, "any": [] }));
        assert!(matches!(err, Err(crate::Error::MalformedRule { .. })));

        assert!(RuleTree::from_raw(&json!("username")).is_err());
    }

    #[test]
    fn test_visual_editor_depth_limit() {
        let mut rule: Rule = FieldRule::new("username", ["a"]).into();
        for _ in 0..3 {
            rule = RuleGroup::all(vec![rule]).into();
        }
        let tree = RuleTree::from_rule(rule.clone());
        assert_eq!(tree.max_depth(), 4);
        assert!(tree.can_use_visual_editor(VISUAL_MAX_RULE_DEPTH));

        let deeper = RuleTree::from_rule(RuleGroup::any(vec![rule]).into());
        assert_eq!(deeper.max_depth(), 5);
        assert!(!deeper.can_use_visual_editor(VISUAL_MAX_RULE_DEPTH));
    }

    #[test]
    fn test_set_root_and_take() {
        let mut tree = RuleTree::new();
        assert!(tree.set_root(Some(FieldRule::new("dn", ["x"]).into())).is_none());
        assert!(!tree.is_empty());

        let taken = tree.take();
        assert!(taken.is_some());
        assert!(tree.is_empty());
    }
}
