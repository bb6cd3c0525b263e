//! Field mutation engine.
//!
//! walk -> recursive descent over the fetched document; one `Submission`
//! per mutable leaf, filtered through an exact-path `IgnoreSet`.
//! Helpers: mutate_leaf / payload_for / leaf_kind.
//! The `Submit` trait is the seam between traversal and transport.
//!
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::{log_debug, log_info};

/* ---- Ignore Set ---- */

/// Exact dot-joined field paths excluded from mutation.
///
/// Entries are matched literally: no trimming, no globbing. An entry that
/// matches no real path simply never fires.
#[derive(Debug, Default)]
pub struct IgnoreSet(HashSet<String>);

impl IgnoreSet {
    /// Build from a comma-separated list (the `--ignore-fields` value).
    pub fn from_list(raw: &str) -> Self {
        IgnoreSet(raw.split(',').map(str::to_string).collect())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/* ---- Leaf Mutation ---- */

/// Human-readable type tag for a JSON value (skip logs, `fields` table).
pub fn leaf_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Derive the probe value for a scalar leaf.
///
/// bool -> negation, integer -> +1, string -> `_modified` suffix.
/// Null and float leaves have no mutation. Incrementing past `u64::MAX`
/// is unrepresentable and also yields `None`.
pub fn mutate_leaf(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(!b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i.checked_add(1) {
                    Some(next) => Some(Value::from(next)),
                    // i64::MAX + 1 still fits on the u64 side
                    None => Some(Value::from(i as u64 + 1)),
                }
            } else if let Some(u) = n.as_u64() {
                u.checked_add(1).map(Value::from)
            } else {
                None
            }
        }
        Value::String(s) => Some(Value::String(format!("{s}_modified"))),
        _ => None,
    }
}

/// Rebuild the partial document for one mutated leaf: the path segments
/// folded into nested single-key objects around the new value. Array
/// levels never contributed a segment, so they collapse away here.
pub fn payload_for(path: &[String], mutated: Value) -> Value {
    let mut node = mutated;
    for key in path.iter().rev() {
        let mut wrapper = Map::new();
        wrapper.insert(key.clone(), node);
        node = Value::Object(wrapper);
    }
    node
}

/* ---- Submission Seam ---- */

/// One single-field probe: exactly one mutated leaf, reconstructed into a
/// minimal partial document.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Dot-joined path of the mutated leaf.
    pub path: String,
    /// Leaf value as fetched.
    pub original: Value,
    /// Leaf value after mutation.
    pub mutated: Value,
    /// Partial document carrying only this leaf.
    pub payload: Value,
}

/// Receives each submission as the walk produces it. Returns whether the
/// target accepted the mutation; transport failures propagate and abort
/// the walk (no retry).
pub trait Submit {
    fn submit(&mut self, submission: &Submission) -> Result<bool>;
}

/// Collects submissions without sending anything. Backs the `fields` dry
/// run and the walker tests.
#[derive(Debug, Default)]
pub struct RecordingSubmitter {
    pub submissions: Vec<Submission>,
}

impl Submit for RecordingSubmitter {
    fn submit(&mut self, submission: &Submission) -> Result<bool> {
        self.submissions.push(submission.clone());
        Ok(false)
    }
}

/* ---- Walk ---- */

/// Walk a top-level document, handing one `Submission` per mutable leaf to
/// `out`. Returns whether any submission was accepted.
///
/// The caller guarantees the document root is an object; everything below
/// may nest arbitrarily.
pub fn walk(doc: &Map<String, Value>, ignore: &IgnoreSet, out: &mut dyn Submit) -> Result<bool> {
    let mut path: Vec<String> = Vec::new();
    walk_object(doc, &mut path, ignore, out)
}

fn walk_object(
    map: &Map<String, Value>,
    path: &mut Vec<String>,
    ignore: &IgnoreSet,
    out: &mut dyn Submit,
) -> Result<bool> {
    let mut accepted = false;
    // Insertion order of the fetched JSON (serde_json preserve_order).
    for (key, value) in map {
        path.push(key.clone());
        let full = path.join(".");
        if ignore.contains(&full) {
            log_info!("field '{}' is ignored and won't be modified", full);
            path.pop();
            continue;
        }
        let result = walk_value(value, path, ignore, out);
        path.pop();
        accepted |= result?;
    }
    Ok(accepted)
}

fn walk_value(
    value: &Value,
    path: &mut Vec<String>,
    ignore: &IgnoreSet,
    out: &mut dyn Submit,
) -> Result<bool> {
    match value {
        Value::Object(map) => walk_object(map, path, ignore, out),
        Value::Array(items) => walk_array(items, path, ignore, out),
        leaf => submit_leaf(leaf, path, out),
    }
}

fn walk_array(
    items: &[Value],
    path: &mut Vec<String>,
    ignore: &IgnoreSet,
    out: &mut dyn Submit,
) -> Result<bool> {
    let mut accepted = false;
    // Indices do not extend the path: sibling elements share it, so a
    // single ignore entry covers every element.
    for item in items {
        accepted |= walk_value(item, path, ignore, out)?;
    }
    Ok(accepted)
}

fn submit_leaf(leaf: &Value, path: &[String], out: &mut dyn Submit) -> Result<bool> {
    let Some(mutated) = mutate_leaf(leaf) else {
        log_debug!(
            "skipping '{}' ({} leaves are not mutated)",
            path.join("."),
            leaf_kind(leaf)
        );
        return Ok(false);
    };
    let submission = Submission {
        path: path.join("."),
        original: leaf.clone(),
        mutated: mutated.clone(),
        payload: payload_for(path, mutated),
    };
    out.submit(&submission)
}

/* ---- Tests ---- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn record(value: Value, ignore: &IgnoreSet) -> Vec<Submission> {
        let mut rec = RecordingSubmitter::default();
        walk(&doc(value), ignore, &mut rec).unwrap();
        rec.submissions
    }

    #[test]
    fn flat_object_one_submission_per_leaf() {
        let subs = record(json!({"a": true, "b": 5, "c": "x"}), &IgnoreSet::default());
        assert_eq!(subs.len(), 3);
        assert_eq!(subs[0].payload, json!({"a": false}));
        assert_eq!(subs[1].payload, json!({"b": 6}));
        assert_eq!(subs[2].payload, json!({"c": "x_modified"}));
    }

    #[test]
    fn insertion_order_is_preserved() {
        let subs = record(json!({"z": 1, "a": 2, "m": 3}), &IgnoreSet::default());
        let paths: Vec<&str> = subs.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["z", "a", "m"]);
    }

    #[test]
    fn nested_leaf_payload_keeps_full_path() {
        let subs = record(json!({"a": {"b": true}}), &IgnoreSet::default());
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].path, "a.b");
        assert_eq!(subs[0].payload, json!({"a": {"b": false}}));
    }

    #[test]
    fn exact_ignore_suppresses_only_that_path() {
        let ignore = IgnoreSet::from_list("a.b");
        let subs = record(json!({"a": {"b": true, "c": 1}}), &ignore);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].path, "a.c");
    }

    #[test]
    fn ignoring_a_parent_suppresses_the_whole_subtree() {
        let ignore = IgnoreSet::from_list("a");
        let subs = record(json!({"a": {"b": true}, "d": 1}), &ignore);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].path, "d");
    }

    #[test]
    fn ignore_entry_for_nested_path_does_not_block_top_level() {
        // "a" blocks a top-level scalar a, but "a.b" must not.
        let ignore = IgnoreSet::from_list("a.b");
        let subs = record(json!({"a": true}), &ignore);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].path, "a");
    }

    #[test]
    fn array_elements_share_the_parent_path() {
        let subs = record(json!({"a": [{"b": 1}, {"b": 2}]}), &IgnoreSet::default());
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].path, "a.b");
        assert_eq!(subs[1].path, "a.b");
        assert_eq!(subs[0].payload, json!({"a": {"b": 2}}));
        assert_eq!(subs[1].payload, json!({"a": {"b": 3}}));
    }

    #[test]
    fn one_ignore_entry_covers_every_array_element() {
        let ignore = IgnoreSet::from_list("a.b");
        let subs = record(json!({"a": [{"b": 1}, {"b": 2}]}), &ignore);
        assert!(subs.is_empty());
    }

    #[test]
    fn scalar_array_elements_mutate_under_the_array_path() {
        let subs = record(json!({"tags": ["x", "y"]}), &IgnoreSet::default());
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].path, "tags");
        assert_eq!(subs[0].payload, json!({"tags": "x_modified"}));
        assert_eq!(subs[1].payload, json!({"tags": "y_modified"}));
    }

    #[test]
    fn null_and_float_leaves_are_skipped() {
        let subs = record(json!({"a": null, "b": 1.5, "c": 1}), &IgnoreSet::default());
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].path, "c");
    }

    #[test]
    fn accepted_flag_propagates_up() {
        struct AcceptAll;
        impl Submit for AcceptAll {
            fn submit(&mut self, _s: &Submission) -> Result<bool> {
                Ok(true)
            }
        }
        let accepted = walk(
            &doc(json!({"a": {"b": 1}})),
            &IgnoreSet::default(),
            &mut AcceptAll,
        )
        .unwrap();
        assert!(accepted);

        let accepted = walk(
            &doc(json!({"a": {"b": 1}})),
            &IgnoreSet::default(),
            &mut RecordingSubmitter::default(),
        )
        .unwrap();
        assert!(!accepted);
    }

    #[test]
    fn transport_error_aborts_the_walk() {
        struct FailSecond(usize);
        impl Submit for FailSecond {
            fn submit(&mut self, _s: &Submission) -> Result<bool> {
                self.0 += 1;
                if self.0 == 2 {
                    anyhow::bail!("connection reset");
                }
                Ok(false)
            }
        }
        let mut out = FailSecond(0);
        let err = walk(&doc(json!({"a": 1, "b": 2, "c": 3})), &IgnoreSet::default(), &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(out.0, 2, "third leaf must not be attempted");
    }

    #[test]
    fn mutate_bool_int_string() {
        assert_eq!(mutate_leaf(&json!(true)), Some(json!(false)));
        assert_eq!(mutate_leaf(&json!(false)), Some(json!(true)));
        assert_eq!(mutate_leaf(&json!(41)), Some(json!(42)));
        assert_eq!(mutate_leaf(&json!(-1)), Some(json!(0)));
        assert_eq!(mutate_leaf(&json!("v")), Some(json!("v_modified")));
    }

    #[test]
    fn mutate_unsupported_kinds() {
        assert_eq!(mutate_leaf(&json!(null)), None);
        assert_eq!(mutate_leaf(&json!(1.25)), None);
        assert_eq!(mutate_leaf(&json!([1])), None);
        assert_eq!(mutate_leaf(&json!({"k": 1})), None);
    }

    #[test]
    fn mutate_integer_boundaries() {
        assert_eq!(
            mutate_leaf(&json!(i64::MAX)),
            Some(json!(i64::MAX as u64 + 1))
        );
        assert_eq!(mutate_leaf(&json!(u64::MAX)), None);
    }

    #[test]
    fn payload_nesting_matches_path_depth() {
        let path = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(payload_for(&path, json!(7)), json!({"a": {"b": {"c": 7}}}));
    }

    #[test]
    fn ignore_list_is_literal() {
        let ignore = IgnoreSet::from_list("a, b");
        assert!(ignore.contains("a"));
        assert!(ignore.contains(" b"), "entries are not trimmed");
        assert!(!ignore.contains("b"));
    }

    #[test]
    fn leaf_kind_tags() {
        assert_eq!(leaf_kind(&json!(1)), "integer");
        assert_eq!(leaf_kind(&json!(1.0)), "float");
        assert_eq!(leaf_kind(&json!("s")), "string");
        assert_eq!(leaf_kind(&json!(null)), "null");
    }
}
