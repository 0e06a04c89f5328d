//! Editor session over a rule tree.
//!
//! A [`RuleEditor`] exclusively owns the tree being edited. Rules are addressed
//! by a path of child indices from the root: `[]` is the root, `[1, 0]` is the
//! first child of the root's second child. Every mutation either succeeds and
//! notifies the change listeners, or fails and leaves the tree untouched.

use crate::config::EditorConfig;
use crate::rules::{FieldValue, Rule, RuleGroup, RuleKind, RuleTree, VISUAL_MAX_RULE_DEPTH};
use crate::{Error, Result};

use std::fmt;

type ChangeListener = Box<dyn FnMut(Option<&Rule>) + Send>;

/// An editing session for one role mapping's rules.
pub struct RuleEditor {
    tree: RuleTree,
    max_visual_depth: usize,
    listeners: Vec<ChangeListener>,
}

impl RuleEditor {
    /// Start a session over `tree`.
    pub fn new(tree: RuleTree) -> Self {
        Self {
            tree,
            max_visual_depth: VISUAL_MAX_RULE_DEPTH,
            listeners: Vec::new(),
        }
    }

    /// Start a session using the configured depth limit.
    pub fn from_config(tree: RuleTree, config: &EditorConfig) -> Self {
        Self::new(tree).with_max_visual_depth(config.max_visual_depth)
    }

    /// Override the visual editor depth limit.
    pub fn with_max_visual_depth(mut self, max_visual_depth: usize) -> Self {
        self.max_visual_depth = max_visual_depth;
        self
    }

    /// Register a callback invoked with the new root after every successful
    /// mutation.
    pub fn on_change(&mut self, listener: impl FnMut(Option<&Rule>) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// The tree being edited.
    pub fn tree(&self) -> &RuleTree {
        &self.tree
    }

    /// The root rule, if any.
    pub fn rules(&self) -> Option<&Rule> {
        self.tree.root()
    }

    /// End the session, returning the tree.
    pub fn into_tree(self) -> RuleTree {
        self.tree
    }

    /// The visual editor depth limit.
    pub fn max_visual_depth(&self) -> usize {
        self.max_visual_depth
    }

    /// Depth of the tree being edited.
    pub fn max_depth(&self) -> usize {
        self.tree.max_depth()
    }

    /// Whether the tree is shallow enough for the structured editor.
    pub fn can_use_visual_editor(&self) -> bool {
        self.tree.can_use_visual_editor(self.max_visual_depth)
    }

    /// The rule at `path`.
    pub fn rule_at(&self, path: &[usize]) -> Result<&Rule> {
        let root = self
            .tree
            .root()
            .ok_or_else(|| Error::index_out_of_range(path.first().copied().unwrap_or(0), 0))?;
        locate(root, path)
    }

    /// Replace the whole tree. `None` clears it.
    pub fn set_root(&mut self, rule: Option<Rule>) {
        self.tree.set_root(rule);
        self.notify();
    }

    /// Remove every rule.
    pub fn clear(&mut self) {
        self.set_root(None);
    }

    /// Add `rule` to the group at `group_path`. On an empty tree, an empty
    /// path makes `rule` the root.
    pub fn add_rule(&mut self, group_path: &[usize], rule: Rule) -> Result<()> {
        let mut next = self.tree.clone();
        if next.is_empty() {
            if let Some(&index) = group_path.first() {
                return Err(Error::index_out_of_range(index, 0));
            }
            next.set_root(Some(rule));
        } else {
            let group = group_in(&mut next, group_path)?;
            if !group.can_contain_rule(&rule) {
                return Err(Error::validation_field(
                    format!("A group cannot directly contain an `{}` rule", rule.kind()),
                    render_path(&self.tree, group_path),
                ));
            }
            group.add_rule(rule);
        }

        self.check_depth(&next, group_path)?;
        tracing::debug!(path = ?group_path, depth = next.max_depth(), "Added rule");
        self.commit(next);
        Ok(())
    }

    /// Add the default rule of the kind named `kind` (`field`, `any`,
    /// `exceptAll`, ...) to the group at `group_path`.
    pub fn add_rule_of_kind(&mut self, group_path: &[usize], kind: &str) -> Result<()> {
        let kind: RuleKind = kind.parse()?;
        self.add_rule(group_path, kind.new_rule())
    }

    /// Remove and return the rule at `path`. An empty path removes the root.
    pub fn remove_rule(&mut self, path: &[usize]) -> Result<Rule> {
        let mut next = self.tree.clone();
        let removed = match path.split_last() {
            None => next.take().ok_or_else(|| Error::index_out_of_range(0, 0))?,
            Some((&index, parent_path)) => {
                let parent = group_in(&mut next, parent_path)?;
                parent.remove_rule(index)?
            }
        };

        tracing::debug!(path = ?path, kind = %removed.kind(), "Removed rule");
        self.commit(next);
        Ok(removed)
    }

    /// Replace the rule at `path`, returning the previous rule. An empty path
    /// replaces the root.
    pub fn replace_rule(&mut self, path: &[usize], rule: Rule) -> Result<Rule> {
        let mut next = self.tree.clone();
        let previous = match path.split_last() {
            None => next
                .set_root(Some(rule))
                .ok_or_else(|| Error::index_out_of_range(0, 0))?,
            Some((&index, parent_path)) => {
                let parent = group_in(&mut next, parent_path)?;
                if !parent.can_contain_rule(&rule) {
                    return Err(Error::validation_field(
                        format!("A group cannot directly contain an `{}` rule", rule.kind()),
                        render_path(&self.tree, parent_path),
                    ));
                }
                parent.replace_rule(index, rule)?
            }
        };

        self.check_depth(&next, path)?;
        tracing::debug!(path = ?path, "Replaced rule");
        self.commit(next);
        Ok(previous)
    }

    /// Set the values of the field rule at `path`. Empty values are accepted
    /// here and rejected by [`RuleEditor::submit`].
    pub fn set_field_values(&mut self, path: &[usize], values: Vec<FieldValue>) -> Result<()> {
        let mut next = self.tree.clone();
        let root = next
            .root_mut()
            .ok_or_else(|| Error::index_out_of_range(path.first().copied().unwrap_or(0), 0))?;
        let field = locate_mut(root, path)?.as_field_mut().ok_or_else(|| {
            Error::validation_field("Rule is not a field rule", render_path(&self.tree, path))
        })?;
        field.set_values(values);

        self.commit(next);
        Ok(())
    }

    /// Negate or un-negate the rule at `path`.
    pub fn set_negated(&mut self, path: &[usize], negated: bool) -> Result<()> {
        let rule = self.rule_at(path)?.clone().with_negated(negated);
        if path.is_empty() {
            self.set_root(Some(rule));
            Ok(())
        } else {
            self.replace_rule(path, rule).map(|_| ())
        }
    }

    /// The tree as pretty-printed JSON, for the advanced editor.
    pub fn to_json_text(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.tree.to_raw()).map_err(Error::from)
    }

    /// Replace the tree with the document in `text`. Parse errors leave the
    /// current tree in place.
    pub fn apply_json_text(&mut self, text: &str) -> Result<()> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        let next = RuleTree::from_raw(&raw)?;

        tracing::debug!(depth = next.max_depth(), "Applied rules from JSON");
        self.commit(next);
        Ok(())
    }

    /// Validate the tree and return the document to submit.
    pub fn submit(&self) -> Result<serde_json::Value> {
        if self.tree.is_empty() {
            return Err(Error::validation_field("At least one rule is required", "$"));
        }
        self.tree.validate()?;
        Ok(self.tree.to_raw())
    }

    fn check_depth(&self, next: &RuleTree, path: &[usize]) -> Result<()> {
        if !next.can_use_visual_editor(self.max_visual_depth) {
            return Err(Error::validation_field(
                format!(
                    "Rules cannot be nested deeper than {} levels in the visual editor",
                    self.max_visual_depth.saturating_sub(1)
                ),
                render_path(&self.tree, path),
            ));
        }
        Ok(())
    }

    fn commit(&mut self, next: RuleTree) {
        self.tree = next;
        self.notify();
    }

    fn notify(&mut self) {
        let root = self.tree.root();
        for listener in self.listeners.iter_mut() {
            listener(root);
        }
    }
}

impl fmt::Debug for RuleEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleEditor")
            .field("tree", &self.tree)
            .field("max_visual_depth", &self.max_visual_depth)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn group_in<'a>(tree: &'a mut RuleTree, path: &[usize]) -> Result<&'a mut RuleGroup> {
    let root = tree
        .root_mut()
        .ok_or_else(|| Error::index_out_of_range(path.first().copied().unwrap_or(0), 0))?;
    locate_mut(root, path)?
        .as_group_mut()
        .ok_or_else(|| not_a_group(path))
}

fn locate<'a>(root: &'a Rule, path: &[usize]) -> Result<&'a Rule> {
    let mut current = root;
    for (depth, &index) in path.iter().enumerate() {
        let group = current
            .as_group()
            .ok_or_else(|| not_a_group(&path[..depth]))?;
        current = group
            .get(index)
            .ok_or_else(|| Error::index_out_of_range(index, group.len()))?;
    }
    Ok(current)
}

fn locate_mut<'a>(root: &'a mut Rule, path: &[usize]) -> Result<&'a mut Rule> {
    let mut current = root;
    for (depth, &index) in path.iter().enumerate() {
        match current {
            Rule::Group(group) => {
                let len = group.len();
                current = group
                    .get_mut(index)
                    .ok_or_else(|| Error::index_out_of_range(index, len))?;
            }
            Rule::Field(_) => return Err(not_a_group(&path[..depth])),
        }
    }
    Ok(current)
}

fn not_a_group(path: &[usize]) -> Error {
    Error::validation(format!("Rule at {:?} is not a group", path))
}

/// Render an index path as a document path such as `$.all[1].except.any[0]`.
/// Falls back to the raw indices when the path does not resolve.
fn render_path(tree: &RuleTree, path: &[usize]) -> String {
    let mut rendered = "$".to_string();
    let mut current = match tree.root() {
        Some(root) => root,
        None => return rendered,
    };
    for &index in path {
        let group = match current.as_group() {
            Some(group) => group,
            None => return format!("{:?}", path),
        };
        rendered = group.child_path(&rendered, index);
        current = match group.get(index) {
            Some(child) => child,
            None => return rendered,
        };
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FieldRule;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn sample_tree() -> RuleTree {
        RuleTree::from_raw(&json!({ "all": [
            { "field": { "realm.name": "ldap1" } },
            { "any": [
                { "field": { "groups": "admins" } },
                { "field": { "username": ["root", "admin"] } }
            ] }
        ] }))
        .unwrap()
    }

    fn counting_editor(tree: RuleTree) -> (RuleEditor, Arc<Mutex<usize>>) {
        let count = Arc::new(Mutex::new(0));
        let mut editor = RuleEditor::new(tree);
        let seen = Arc::clone(&count);
        editor.on_change(move |_| *seen.lock().unwrap() += 1);
        (editor, count)
    }

    #[test]
    fn test_add_root_to_empty_tree() {
        let (mut editor, count) = counting_editor(RuleTree::new());
        editor.add_rule_of_kind(&[], "all").unwrap();
        editor.add_rule_of_kind(&[], "field").unwrap();

        assert_eq!(
            editor.submit().unwrap(),
            json!({ "all": [{ "field": { "username": "*" } }] })
        );
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn test_add_to_nested_group() {
        let mut editor = RuleEditor::new(sample_tree());
        editor
            .add_rule(&[1], FieldRule::new("dn", ["cn=ops,dc=example,dc=com"]).into())
            .unwrap();

        let group = editor.rule_at(&[1]).unwrap().as_group().unwrap();
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_add_into_field_rule_fails() {
        let (mut editor, count) = counting_editor(sample_tree());
        let before = editor.tree().clone();

        assert!(editor.add_rule_of_kind(&[0], "field").is_err());
        assert_eq!(editor.tree(), &before);
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn test_unknown_kind_is_unsupported() {
        let mut editor = RuleEditor::new(sample_tree());
        assert!(matches!(
            editor.add_rule_of_kind(&[], "none"),
            Err(Error::UnsupportedRuleType { .. })
        ));
    }

    #[test]
    fn test_groups_reject_except_children() {
        let mut editor = RuleEditor::new(sample_tree());
        let err = editor.add_rule_of_kind(&[1], "exceptField").unwrap_err();
        match err {
            Error::Validation { field, .. } => assert_eq!(field.as_deref(), Some("$.all[1]")),
            other => panic!("unexpected error: {:?}", other),
        }

        let negated: Rule = FieldRule::new("username", ["x"]).with_negated(true).into();
        assert!(editor.replace_rule(&[0], negated).is_err());
    }

    #[test]
    fn test_except_root_is_allowed() {
        let mut editor = RuleEditor::new(RuleTree::new());
        editor.add_rule_of_kind(&[], "exceptAny").unwrap();
        assert_eq!(editor.submit().unwrap(), json!({ "except": { "any": [] } }));
    }

    #[test]
    fn test_depth_limit() {
        let mut editor = RuleEditor::new(RuleTree::new()).with_max_visual_depth(3);
        editor.add_rule_of_kind(&[], "all").unwrap();
        editor.add_rule_of_kind(&[], "any").unwrap();
        assert_eq!(editor.max_depth(), 2);

        let err = editor.add_rule_of_kind(&[0], "field").unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(editor.max_depth(), 2);
        assert!(editor.can_use_visual_editor());
    }

    #[test]
    fn test_remove_rule() {
        let (mut editor, count) = counting_editor(sample_tree());

        let removed = editor.remove_rule(&[1, 0]).unwrap();
        assert_eq!(removed, FieldRule::new("groups", ["admins"]).into());
        assert_eq!(editor.rule_at(&[1]).unwrap().as_group().unwrap().len(), 1);

        assert!(matches!(
            editor.remove_rule(&[1, 5]),
            Err(Error::IndexOutOfRange { index: 5, len: 1 })
        ));
        assert_eq!(*count.lock().unwrap(), 1);

        editor.remove_rule(&[]).unwrap();
        assert!(editor.tree().is_empty());
        assert!(editor.remove_rule(&[]).is_err());
    }

    #[test]
    fn test_replace_rule() {
        let mut editor = RuleEditor::new(sample_tree());
        let previous = editor
            .replace_rule(&[0], FieldRule::new("realm.name", ["ldap2"]).into())
            .unwrap();
        assert_eq!(previous, FieldRule::new("realm.name", ["ldap1"]).into());

        let root: Rule = RuleGroup::any(vec![]).into();
        editor.replace_rule(&[], root.clone()).unwrap();
        assert_eq!(editor.rules(), Some(&root));
    }

    #[test]
    fn test_set_field_values_and_submit() {
        let mut editor = RuleEditor::new(sample_tree());
        editor.set_field_values(&[1, 1], Vec::new()).unwrap();

        match editor.submit() {
            Err(Error::Validation { field, .. }) => {
                assert_eq!(field.as_deref(), Some("$.all[1].any[1]"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        editor
            .set_field_values(&[1, 1], vec![FieldValue::from("root")])
            .unwrap();
        assert!(editor.submit().is_ok());

        assert!(editor.set_field_values(&[1], Vec::new()).is_err());
    }

    #[test]
    fn test_set_negated() {
        let mut editor = RuleEditor::new(sample_tree());
        editor.set_negated(&[], true).unwrap();
        assert_eq!(editor.rules().unwrap().kind(), RuleKind::ExceptAll);

        assert!(editor.set_negated(&[0], true).is_err());
    }

    #[test]
    fn test_submit_empty_tree_fails() {
        let editor = RuleEditor::new(RuleTree::new());
        assert!(matches!(editor.submit(), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_json_text_round_trip() {
        let (mut editor, count) = counting_editor(sample_tree());
        let text = editor.to_json_text().unwrap();

        editor.clear();
        editor.apply_json_text(&text).unwrap();
        assert_eq!(editor.tree(), &sample_tree());
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn test_invalid_json_text_preserves_tree() {
        let (mut editor, count) = counting_editor(sample_tree());

        assert!(editor.apply_json_text("{ not json").is_err());
        assert!(matches!(
            editor.apply_json_text(r#"{ "any": [{ "bogus": 1 }] }"#),
            Err(Error::MalformedRule { .. })
        ));

        assert_eq!(editor.tree(), &sample_tree());
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn test_listener_sees_new_root() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut editor = RuleEditor::new(RuleTree::new());
        let sink = Arc::clone(&seen);
        editor.on_change(move |root| sink.lock().unwrap().push(root.map(Rule::kind)));

        editor.add_rule_of_kind(&[], "any").unwrap();
        editor.clear();

        assert_eq!(*seen.lock().unwrap(), vec![Some(RuleKind::Any), None]);
    }

    #[test]
    fn test_from_config() {
        let config = EditorConfig { max_visual_depth: 2 };
        let editor = RuleEditor::from_config(sample_tree(), &config);
        assert_eq!(editor.max_visual_depth(), 2);
        assert!(!editor.can_use_visual_editor());
    }
}
