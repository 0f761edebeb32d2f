//! Field-level collection merge strategies (§4.2 Collection merge
//! strategies).

use serde_json::{Map, Value};

use crate::model::MergeStrategy;

const MERGE_BY_KEY_FIELDS: [&str; 5] = ["blocks", "tools", "folders", "identities", "policies"];

/// The default merge strategy for a field path, absent an explicit
/// `_merge` override. Tag/id-reference arrays (`tags`, `tool_ids`, ...) and
/// every other array default to `append`; only the named-object arrays
/// above default to `merge-by-key`.
#[must_use]
pub fn default_strategy_for(field: &str) -> MergeStrategy {
    if MERGE_BY_KEY_FIELDS.contains(&field) {
        MergeStrategy::MergeByKey
    } else {
        MergeStrategy::Append
    }
}

/// Merge a lower-precedence array with a higher-precedence one under
/// the given strategy.
#[must_use]
pub fn resolve_array(strategy: MergeStrategy, lower: &[Value], higher: &[Value]) -> Vec<Value> {
    match strategy {
        MergeStrategy::Replace => higher.to_vec(),
        MergeStrategy::Append => resolve_append(lower, higher),
        MergeStrategy::MergeByKey => resolve_merge_by_key(lower, higher),
    }
}

/// Concatenate then dedupe; a `!value` element in `higher` removes the
/// matching unprefixed element from the combined set (§4.2 Append
/// semantics).
fn resolve_append(lower: &[Value], higher: &[Value]) -> Vec<Value> {
    let mut result: Vec<Value> = lower.to_vec();
    for item in higher {
        if let Value::String(s) = item {
            if let Some(stripped) = s.strip_prefix('!') {
                result.retain(|v| v.as_str() != Some(stripped));
                continue;
            }
        }
        if !result.contains(item) {
            result.push(item.clone());
        }
    }
    result
}

fn object_key(obj: &Map<String, Value>) -> Option<String> {
    for field in ["id", "name", "label"] {
        if let Some(Value::String(s)) = obj.get(field) {
            return Some(s.clone());
        }
    }
    None
}

/// Merge each higher-precedence object element into the existing
/// lower-precedence element sharing its `id | name | label`; a higher
/// element with `_delete: true` removes the matching element instead
/// (§4.2 Merge-by-key semantics).
fn resolve_merge_by_key(lower: &[Value], higher: &[Value]) -> Vec<Value> {
    let mut result: Vec<Value> = lower.to_vec();

    for item in higher {
        let Value::Object(higher_obj) = item else {
            if !result.contains(item) {
                result.push(item.clone());
            }
            continue;
        };

        let Some(key) = object_key(higher_obj) else {
            result.push(item.clone());
            continue;
        };

        let delete = higher_obj.get("_delete").and_then(Value::as_bool).unwrap_or(false);
        let existing_idx = result.iter().position(|v| matches!(v, Value::Object(o) if object_key(o).as_deref() == Some(key.as_str())));

        if delete {
            if let Some(idx) = existing_idx {
                result.remove(idx);
            }
            continue;
        }

        match existing_idx {
            Some(idx) => {
                if let Value::Object(existing_obj) = &result[idx] {
                    result[idx] = Value::Object(merge_shallow(existing_obj, higher_obj));
                }
            }
            None => result.push(item.clone()),
        }
    }

    result
}

/// Shallow-merge two objects: higher-layer scalar fields win, and an
/// explicit `null` clears a lower-layer field (§4.2 Scalar fields).
fn merge_shallow(lower: &Map<String, Value>, higher: &Map<String, Value>) -> Map<String, Value> {
    let mut result = lower.clone();
    for (key, value) in higher {
        if key == "_delete" {
            continue;
        }
        if value.is_null() {
            result.remove(key);
        } else {
            result.insert(key.clone(), value.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_concatenates_and_dedupes() {
        let lower = vec![json!("a"), json!("b")];
        let higher = vec![json!("b"), json!("c")];
        let result = resolve_array(MergeStrategy::Append, &lower, &higher);
        assert_eq!(result, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn append_removes_bang_prefixed_elements() {
        let lower = vec![json!("a"), json!("b")];
        let higher = vec![json!("!a")];
        let result = resolve_array(MergeStrategy::Append, &lower, &higher);
        assert_eq!(result, vec![json!("b")]);
    }

    #[test]
    fn replace_returns_higher_outright() {
        let lower = vec![json!("a")];
        let higher = vec![json!("z")];
        assert_eq!(resolve_array(MergeStrategy::Replace, &lower, &higher), vec![json!("z")]);
    }

    #[test]
    fn merge_by_key_merges_matching_elements() {
        let lower = vec![json!({"name": "decisions", "value": "v1"})];
        let higher = vec![json!({"name": "decisions", "value": "v2"})];
        let result = resolve_array(MergeStrategy::MergeByKey, &lower, &higher);
        assert_eq!(result, vec![json!({"name": "decisions", "value": "v2"})]);
    }

    #[test]
    fn merge_by_key_appends_unmatched_elements() {
        let lower = vec![json!({"name": "a"})];
        let higher = vec![json!({"name": "b"})];
        let result = resolve_array(MergeStrategy::MergeByKey, &lower, &higher);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn merge_by_key_delete_removes_matching_element() {
        let lower = vec![json!({"name": "a", "value": "1"})];
        let higher = vec![json!({"name": "a", "_delete": true})];
        let result = resolve_array(MergeStrategy::MergeByKey, &lower, &higher);
        assert!(result.is_empty());
    }

    #[test]
    fn merge_by_key_null_field_clears_lower_value() {
        let lower = vec![json!({"name": "a", "description": "d"})];
        let higher = vec![json!({"name": "a", "description": null})];
        let result = resolve_array(MergeStrategy::MergeByKey, &lower, &higher);
        assert_eq!(result, vec![json!({"name": "a"})]);
    }

    #[test]
    fn default_strategy_classification() {
        assert_eq!(default_strategy_for("tags"), MergeStrategy::Append);
        assert_eq!(default_strategy_for("blocks"), MergeStrategy::MergeByKey);
        assert_eq!(default_strategy_for("anything_else"), MergeStrategy::Append);
    }
}
