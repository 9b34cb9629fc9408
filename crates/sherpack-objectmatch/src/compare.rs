//! Comparison engine for canonical documents
//!
//! The default engine builds a JSON merge patch (RFC 7386) that would turn the
//! live document into the desired one, leaving out the deletions: fields the
//! live object has and the desired object does not mention (or sets to
//! `null`) are kept by the server as they are. Whatever is left is a real
//! change.

use serde_json::{Map, Value};
use similar::{ChangeTag, TextDiff};

use crate::error::{CompareError, Side};

/// Structural equality over two canonical byte blobs
///
/// `context` is the desired projection, passed through for diagnostics only.
/// Implementations must be safe to call from several threads at once.
pub trait JsonComparator: Send + Sync {
    fn match_json(&self, old: &[u8], new: &[u8], context: &Value) -> Result<bool, CompareError>;
}

/// Merge-patch based comparator
#[derive(Debug, Default, Clone, Copy)]
pub struct MergePatchComparator;

impl MergePatchComparator {
    pub fn new() -> Self {
        Self
    }

    /// Compute the merge patch from `old` to `new` without deletions
    ///
    /// An empty object means the desired document adds or changes nothing.
    /// Values taken over from `new` are copied as they are, nested `null`s
    /// included.
    pub fn patch(old: &Value, new: &Value) -> Value {
        create_merge_patch(old, new).unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Render a line diff of the pretty-printed documents
    pub fn render_diff(old: &Value, new: &Value) -> String {
        let old = serde_json::to_string_pretty(old).unwrap_or_default();
        let new = serde_json::to_string_pretty(new).unwrap_or_default();
        let diff = TextDiff::from_lines(&old, &new);

        let mut output = String::new();
        for change in diff.iter_all_changes() {
            let prefix = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            output.push_str(prefix);
            output.push_str(change.value().trim_end());
            output.push('\n');
        }
        output
    }
}

impl JsonComparator for MergePatchComparator {
    fn match_json(&self, old: &[u8], new: &[u8], context: &Value) -> Result<bool, CompareError> {
        let old: Value = serde_json::from_slice(old).map_err(|source| CompareError::InvalidJson {
            side: Side::Old,
            source,
        })?;
        let new: Value = serde_json::from_slice(new).map_err(|source| CompareError::InvalidJson {
            side: Side::New,
            source,
        })?;

        let patch = Self::patch(&old, &new);
        let matched = patch.as_object().is_some_and(Map::is_empty);

        if !matched {
            tracing::debug!(patch = %patch, object = %context, "objects do not match");
            tracing::trace!("diff:\n{}", Self::render_diff(&old, &new));
        }

        Ok(matched)
    }
}

/// RFC 7386 merge patch that turns `old` into `new`, minus deletions
///
/// `None` when nothing is added or changed. A key the desired side omits or
/// sets to `null` would be a deletion and is skipped here rather than written
/// as `null` and stripped afterwards. An empty object on the desired side adds
/// nothing either.
fn create_merge_patch(old: &Value, new: &Value) -> Option<Value> {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let mut patch = Map::new();

            for (key, new_value) in new_map {
                if is_no_opinion(new_value) {
                    continue;
                }
                match old_map.get(key) {
                    Some(old_value) if old_value == new_value => {}
                    Some(old_value @ Value::Object(_)) if new_value.is_object() => {
                        if let Some(nested) = create_merge_patch(old_value, new_value) {
                            patch.insert(key.clone(), nested);
                        }
                    }
                    _ => {
                        patch.insert(key.clone(), new_value.clone());
                    }
                }
            }

            (!patch.is_empty()).then_some(Value::Object(patch))
        }
        _ if old == new || is_no_opinion(new) => None,
        _ => Some(new.clone()),
    }
}

fn is_no_opinion(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(old: Value, new: Value) -> bool {
        MergePatchComparator
            .match_json(
                &serde_json::to_vec(&old).unwrap(),
                &serde_json::to_vec(&new).unwrap(),
                &new,
            )
            .unwrap()
    }

    #[test]
    fn test_identical_documents_match() {
        let doc = json!({"spec": {"replicas": 3, "paused": false}});
        assert!(matches(doc.clone(), doc));
    }

    #[test]
    fn test_live_only_fields_are_ignored() {
        let old = json!({"spec": {"replicas": 3, "minReadySeconds": 5}, "extra": {"a": 1}});
        let new = json!({"spec": {"replicas": 3}});
        assert!(matches(old, new));
    }

    #[test]
    fn test_changed_field_does_not_match() {
        let old = json!({"spec": {"replicas": 3}});
        let new = json!({"spec": {"replicas": 5}});
        assert!(!matches(old, new));
    }

    #[test]
    fn test_added_field_does_not_match() {
        let old = json!({"spec": {}});
        let new = json!({"spec": {"paused": true}});
        assert!(!matches(old, new));
    }

    #[test]
    fn test_arrays_are_replaced_whole() {
        let old = json!({"ports": [{"port": 80}, {"port": 443}]});
        let new = json!({"ports": [{"port": 80}]});
        assert!(!matches(old, new));
    }

    #[test]
    fn test_patch_has_no_deletions() {
        let old = json!({"a": {"b": 1, "c": 2}, "d": 3});
        let new = json!({"a": {"b": 1, "e": 4}});
        assert_eq!(MergePatchComparator::patch(&old, &new), json!({"a": {"e": 4}}));
    }

    #[test]
    fn test_nulls_inside_new_values_are_kept() {
        let old = json!({"a": 1});
        let new = json!({"a": {"b": null}});
        assert_eq!(MergePatchComparator::patch(&old, &new), json!({"a": {"b": null}}));
        assert!(!matches(old, new));
    }

    #[test]
    fn test_explicit_null_is_no_opinion() {
        let old = json!({"spec": {"replicas": 3, "paused": false}});
        let new = json!({"spec": {"replicas": 3, "paused": null}, "status": null});
        assert!(matches(old, new));
    }

    #[test]
    fn test_empty_object_adds_nothing() {
        let old = json!({"spec": {"replicas": 3}});
        let new = json!({"spec": {"replicas": 3, "template": {}}, "selector": {}});
        assert!(matches(old, new));
    }

    #[test]
    fn test_invalid_json_names_side() {
        let err = MergePatchComparator
            .match_json(b"{}", b"{not json", &Value::Null)
            .unwrap_err();
        assert!(matches!(err, CompareError::InvalidJson { side: Side::New, .. }));
    }

    #[test]
    fn test_render_diff() {
        let diff =
            MergePatchComparator::render_diff(&json!({"replicas": 3}), &json!({"replicas": 5}));
        assert!(diff.contains("-  \"replicas\": 3"));
        assert!(diff.contains("+  \"replicas\": 5"));
    }
}
