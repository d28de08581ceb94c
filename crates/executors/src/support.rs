use std::time::Instant;

use iceos_core::NodeId;
use iceos_error::IceError;
use iceos_execution::NodeMetadata;
use iceos_expression::render_template;
use serde_json::{Map, Value};

/// Renders every string leaf of `value` as a template against `context`,
/// recursing through arrays and objects. Non-string leaves pass through
/// unchanged.
pub fn render_value(node_id: &NodeId, value: &Value, context: &Value) -> Result<Value, IceError> {
    match value {
        Value::String(s) => render_template(s, context)
            .map(Value::String)
            .map_err(|err| IceError::input_unresolved(node_id.to_string(), err.to_string())),
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(node_id, item, context))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, val) in map {
                out.insert(key.clone(), render_value(node_id, val, context)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Overlays `input`'s keys over `base` when both are JSON objects, matching
/// the "merges tool_args over runtime kwargs" rule; a non-object, non-null
/// `input` replaces `base` outright.
pub fn merge_over_input(base: Value, input: &Value) -> Value {
    match (base, input) {
        (Value::Object(mut base_map), Value::Object(input_map)) => {
            for (key, val) in input_map {
                base_map.insert(key.clone(), val.clone());
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, input) => input.clone(),
    }
}

/// Resolves a dotted path against an arbitrary JSON value (as opposed to
/// [`iceos_execution::RunContext::resolve_path`], which only walks a single
/// node's recorded output).
pub fn resolve_dotted<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() || path == "." {
        return Some(value);
    }
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[must_use]
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[must_use]
pub fn metadata(attempt: u32, start: Instant, cache_hit: bool) -> NodeMetadata {
    NodeMetadata { attempt, duration_ms: elapsed_ms(start), cache_hit }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_nested_object_templates() {
        let node_id = NodeId::new("n1");
        let ctx = json!({"n0": {"city": "nyc"}});
        let rendered = render_value(&node_id, &json!({"q": "weather in {{ n0.city }}"}), &ctx).unwrap();
        assert_eq!(rendered, json!({"q": "weather in nyc"}));
    }

    #[test]
    fn merge_prefers_input_object_keys() {
        let merged = merge_over_input(json!({"a": 1, "b": 2}), &json!({"b": 9}));
        assert_eq!(merged, json!({"a": 1, "b": 9}));
    }

    #[test]
    fn null_input_leaves_base_untouched() {
        let merged = merge_over_input(json!({"a": 1}), &Value::Null);
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn resolves_dotted_path_through_nested_objects() {
        let value = json!({"a": {"b": {"c": 5}}});
        assert_eq!(resolve_dotted(&value, "a.b.c"), Some(&json!(5)));
        assert_eq!(resolve_dotted(&value, "a.missing"), None);
    }
}
