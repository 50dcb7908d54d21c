use crate::scheme::VALUE_FIELD;
use serde_json::{Map, Value};

/// Collapses an evaluation result into its minimal form
///
/// - objects whose only key is `"value"` become that value
/// - single-element arrays become their element
/// - empty values (`null`, `""`, `[]`, `{}`) are dropped from arrays and objects
///
/// Empties are removed before the single-element collapse, which keeps the
/// pass idempotent: `shrink(&shrink(v)) == shrink(v)`.
///
/// # Example
///
/// ```
/// use scheme_scrape::extract::shrink;
/// use serde_json::json;
///
/// let raw = json!({"title": [{"value": ["Hello"]}], "missing": []});
/// assert_eq!(shrink(&raw), json!({"title": "Hello"}));
/// ```
pub fn shrink(value: &Value) -> Value {
    shrink_owned(value.clone())
}

/// Owned variant of [`shrink`]
pub fn shrink_owned(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut kept: Vec<Value> = items
                .into_iter()
                .map(shrink_owned)
                .filter(|item| !is_empty(item))
                .collect();
            if kept.len() == 1 {
                kept.swap_remove(0)
            } else {
                Value::Array(kept)
            }
        }
        Value::Object(map) => {
            let mut kept = Map::new();
            for (key, item) in map {
                let item = shrink_owned(item);
                if !is_empty(&item) {
                    kept.insert(key, item);
                }
            }
            if kept.len() == 1 {
                if let Some(inner) = kept.remove(VALUE_FIELD) {
                    return inner;
                }
            }
            Value::Object(kept)
        }
        other => other,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
