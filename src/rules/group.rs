//! Rule group definitions.

use super::{wrap_negated, Rule};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a group combines the results of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOperator {
    /// At least one child must match (logical OR)
    Any,
    /// Every child must match (logical AND)
    All,
}

impl GroupOperator {
    /// The wire-format key for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOperator::Any => "any",
            GroupOperator::All => "all",
        }
    }
}

impl fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A composite rule holding an ordered sequence of child rules.
///
/// The group exclusively owns its children. Accessors hand out shared borrows
/// or copies, never the live sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    operator: GroupOperator,
    negated: bool,
    rules: Vec<Rule>,
}

impl RuleGroup {
    /// Create a group with the given operator and children.
    pub fn new(operator: GroupOperator, rules: Vec<Rule>) -> Self {
        Self {
            operator,
            negated: false,
            rules,
        }
    }

    /// Create an `any` group.
    pub fn any(rules: Vec<Rule>) -> Self {
        Self::new(GroupOperator::Any, rules)
    }

    /// Create an `all` group.
    pub fn all(rules: Vec<Rule>) -> Self {
        Self::new(GroupOperator::All, rules)
    }

    /// Set whether this group is negated (`exceptAny` / `exceptAll`).
    pub fn with_negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    /// The group operator.
    pub fn operator(&self) -> GroupOperator {
        self.operator
    }

    /// Whether this group is negated.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Set the negation flag.
    pub fn set_negated(&mut self, negated: bool) {
        self.negated = negated;
    }

    /// An independent copy of the children.
    pub fn rules(&self) -> Vec<Rule> {
        self.rules.clone()
    }

    /// Iterate over the children.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Get the child at `index`.
    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Rule> {
        self.rules.get_mut(index)
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the group has no children.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append a child. Duplicates are permitted.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Remove and return the child at `index`.
    ///
    /// Fails with [`crate::Error::IndexOutOfRange`] and leaves the children
    /// unchanged when `index` is out of bounds.
    pub fn remove_rule(&mut self, index: usize) -> crate::Result<Rule> {
        self.check_index(index)?;
        Ok(self.rules.remove(index))
    }

    /// Replace the child at `index`, returning the previous child.
    pub fn replace_rule(&mut self, index: usize, rule: Rule) -> crate::Result<Rule> {
        self.check_index(index)?;
        Ok(std::mem::replace(&mut self.rules[index], rule))
    }

    /// Whether the editing layer may place `rule` directly in this group.
    ///
    /// Groups never admit `except*` children. This is advisory: `add_rule` and
    /// `replace_rule` do not consult it.
    pub fn can_contain_rule(&self, rule: &Rule) -> bool {
        !rule.is_negated()
    }

    /// Serialize to the wire format.
    pub fn to_raw(&self) -> serde_json::Value {
        let children = self.rules.iter().map(Rule::to_raw).collect();

        let mut raw = serde_json::Map::new();
        raw.insert(
            self.operator.as_str().to_string(),
            serde_json::Value::Array(children),
        );

        wrap_negated(serde_json::Value::Object(raw), self.negated)
    }

    /// Path of the child at `index`, given the path of this group.
    pub(crate) fn child_path(&self, path: &str, index: usize) -> String {
        let base = if self.negated {
            format!("{}.except", path)
        } else {
            path.to_string()
        };
        format!("{}.{}[{}]", base, self.operator.as_str(), index)
    }

    fn check_index(&self, index: usize) -> crate::Result<()> {
        if index >= self.rules.len() {
            return Err(crate::Error::index_out_of_range(index, self.rules.len()));
        }
        Ok(())
    }
}
