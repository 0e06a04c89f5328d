//! Parsing raw rule documents into rule trees.
//!
//! Every node of a rule document is an object with exactly one of the keys
//! `field`, `any`, `all` or `except`. Errors carry the path of the offending
//! node, starting at `$` for the document root.

use super::{FieldRule, FieldValue, GroupOperator, Rule, RuleGroup};
use crate::{Error, Result};
use serde_json::Value;

const RULE_KEYS: &str = "field, any, all, except";

/// Parse a rule document rooted at `path`.
pub(crate) fn parse_rule(raw: &Value, path: &str) -> Result<Rule> {
    let object = raw.as_object().ok_or_else(|| {
        Error::malformed(
            format!("Expected a rule object, but found {}", describe(raw)),
            path,
        )
    })?;

    let mut entries = object.iter();
    let (key, definition) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            let keys: Vec<&str> = object.keys().map(String::as_str).collect();
            return Err(Error::malformed(
                format!(
                    "Expected a single rule definition, but found {} [{}]",
                    keys.len(),
                    keys.join(", ")
                ),
                path,
            ));
        }
    };

    let child_path = format!("{}.{}", path, key);
    match key.as_str() {
        "field" => parse_field(definition, &child_path).map(Rule::Field),
        "any" => parse_group(GroupOperator::Any, definition, &child_path).map(Rule::Group),
        "all" => parse_group(GroupOperator::All, definition, &child_path).map(Rule::Group),
        "except" => parse_except(definition, &child_path),
        other => Err(Error::malformed(
            format!("Unknown rule type `{}`, expected one of [{}]", other, RULE_KEYS),
            path,
        )),
    }
}

fn parse_field(definition: &Value, path: &str) -> Result<FieldRule> {
    let object = definition.as_object().ok_or_else(|| {
        Error::malformed(
            format!("Expected an object, but found {}", describe(definition)),
            path,
        )
    })?;

    let mut entries = object.iter();
    let (field, raw_values) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(Error::malformed(
                format!("Expected a single field, but found {}", object.len()),
                path,
            ))
        }
    };

    let value_path = format!("{}.{}", path, field);
    let values = match raw_values {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_value(item, &format!("{}[{}]", value_path, i)))
            .collect::<Result<Vec<_>>>()?,
        scalar => vec![parse_value(scalar, &value_path)?],
    };

    Ok(FieldRule::new(field.as_str(), values))
}

fn parse_value(raw: &Value, path: &str) -> Result<FieldValue> {
    FieldValue::from_json(raw).ok_or_else(|| {
        Error::malformed(
            format!(
                "Invalid value type for field. Expected one of string, number or null, but found {}",
                describe(raw)
            ),
            path,
        )
    })
}

fn parse_group(operator: GroupOperator, definition: &Value, path: &str) -> Result<RuleGroup> {
    let items = definition.as_array().ok_or_else(|| {
        Error::malformed(
            format!("Expected an array of rules, but found {}", describe(definition)),
            path,
        )
    })?;

    let rules = items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_rule(item, &format!("{}[{}]", path, i)))
        .collect::<Result<Vec<_>>>()?;

    Ok(RuleGroup::new(operator, rules))
}

fn parse_except(definition: &Value, path: &str) -> Result<Rule> {
    let inner = parse_rule(definition, path)?;

    // Only an inner `except` sets the flag at this point.
    if inner.is_negated() {
        return Err(Error::malformed(
            "An `except` rule cannot directly wrap another `except` rule",
            path,
        ));
    }

    let mut rule = inner;
    rule.set_negated(true);
    Ok(rule)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
