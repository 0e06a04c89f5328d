//! Rule evaluator implementation.

use super::UserAttributes;
use crate::role_mapping::RoleMapping;
use crate::rules::{FieldRule, FieldValue, GroupOperator, Rule, RuleTree, UserField};
use crate::Result;

use regex::Regex;
use serde_json::Value;

/// Evaluates rule trees against a user's attributes.
#[derive(Debug, Clone)]
pub struct Evaluator {
    /// Whether to compare distinguished names case-insensitively
    case_insensitive_dn: bool,
}

impl Evaluator {
    /// Create a new evaluator.
    pub fn new() -> Self {
        Self {
            case_insensitive_dn: true,
        }
    }

    /// Enable or disable case-insensitive DN matching.
    pub fn with_case_insensitive_dn(mut self, enabled: bool) -> Self {
        self.case_insensitive_dn = enabled;
        self
    }

    /// Evaluate a rule tree. An empty tree never matches.
    pub fn evaluate_tree(&self, tree: &RuleTree, user: &UserAttributes) -> Result<bool> {
        match tree.root() {
            Some(rule) => self.evaluate(rule, user),
            None => Ok(false),
        }
    }

    /// Evaluate a single rule.
    ///
    /// `all` with no children matches, `any` with no children does not.
    pub fn evaluate(&self, rule: &Rule, user: &UserAttributes) -> Result<bool> {
        let matched = match rule {
            Rule::Field(field) => self.evaluate_field(field, user)?,
            Rule::Group(group) => match group.operator() {
                GroupOperator::All => {
                    let mut matched = true;
                    for child in group.iter() {
                        if !self.evaluate(child, user)? {
                            matched = false;
                            break;
                        }
                    }
                    matched
                }
                GroupOperator::Any => {
                    let mut matched = false;
                    for child in group.iter() {
                        if self.evaluate(child, user)? {
                            matched = true;
                            break;
                        }
                    }
                    matched
                }
            },
        };

        Ok(matched != rule.is_negated())
    }

    /// Collect the roles granted to `user` by the enabled mappings whose rules match.
    ///
    /// Role templates need a template engine and are not expanded here.
    pub fn resolve_roles(&self, mappings: &[RoleMapping], user: &UserAttributes) -> Result<Vec<String>> {
        let mut roles = Vec::new();

        for mapping in mappings.iter().filter(|m| m.enabled) {
            if !self.evaluate_tree(&mapping.rules, user)? {
                continue;
            }

            tracing::debug!(mapping = %mapping.name, "Role mapping matched");
            if !mapping.role_templates.is_empty() {
                tracing::debug!(
                    mapping = %mapping.name,
                    templates = mapping.role_templates.len(),
                    "Skipping role templates"
                );
            }

            for role in &mapping.roles {
                if !roles.contains(role) {
                    roles.push(role.clone());
                }
            }
        }

        Ok(roles)
    }

    fn evaluate_field(&self, rule: &FieldRule, user: &UserAttributes) -> Result<bool> {
        let user_field = rule.user_field();
        let actual = user.values_for(&user_field);

        for expected in rule.values() {
            for value in &actual {
                if self.value_matches(&user_field, value, expected)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn value_matches(&self, field: &UserField, actual: &Value, expected: &FieldValue) -> Result<bool> {
        match (actual, expected) {
            (Value::Null, FieldValue::Null) => Ok(true),
            (Value::Number(a), FieldValue::Number(e)) => Ok(numbers_equal(a, e)),
            (Value::String(a), FieldValue::String(pattern)) => {
                let case_insensitive = self.case_insensitive_dn && *field == UserField::Dn;
                string_matches(a, pattern, case_insensitive)
            }
            _ => Ok(false),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn numbers_equal(a: &serde_json::Number, e: &serde_json::Number) -> bool {
    if let (Some(a), Some(e)) = (a.as_i64(), e.as_i64()) {
        return a == e;
    }
    if let (Some(a), Some(e)) = (a.as_u64(), e.as_u64()) {
        return a == e;
    }
    match (a.as_f64(), e.as_f64()) {
        (Some(a), Some(e)) => (a - e).abs() < f64::EPSILON,
        _ => false,
    }
}

/// Match a string against a literal, a `*`/`?` wildcard or a `/regex/` pattern.
fn string_matches(actual: &str, pattern: &str, case_insensitive: bool) -> Result<bool> {
    let is_regex = pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/');
    let has_wildcard = pattern.contains('*') || pattern.contains('?');

    if !is_regex && !has_wildcard {
        return Ok(if case_insensitive {
            actual.eq_ignore_ascii_case(pattern)
        } else {
            actual == pattern
        });
    }

    let body = if is_regex {
        pattern[1..pattern.len() - 1].to_string()
    } else {
        wildcard_to_regex(pattern)
    };
    let flags = if case_insensitive { "(?i)" } else { "" };
    let regex = Regex::new(&format!("{}^(?:{})$", flags, body)).map_err(|e| {
        crate::Error::expression_with_expr(format!("Invalid pattern: {}", e), pattern)
    })?;

    Ok(regex.is_match(actual))
}

fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out
}
