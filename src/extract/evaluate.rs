use super::matcher::match_tree;
use super::node::Node;
use super::value::{extract_values, MarkdownConverter};
use crate::scheme::{Scheme, VALUE_FIELD};
use serde_json::{Map, Value};

/// Applies a compiled scheme to `node`
///
/// Every field of the scheme appears in the result mapped to a JSON array.
/// Fields are processed in scheme order and matches in document order, and
/// the document is never modified, so the output is deterministic.
///
/// For each field:
/// - with a `tree`, the matched nodes are found by [`match_tree`]; without
///   one, the field works on `node` itself
/// - a `"value"` field extracts its rule against `node`. Without `children`,
///   or when nothing matched, the strings go straight into the result.
///   Otherwise each match yields an object carrying them under `"value"`
///   next to the evaluated children
/// - any other field with `children` yields one object per match, skipped
///   when it holds nothing
pub fn evaluate(node: Node<'_>, scheme: &Scheme, converter: &dyn MarkdownConverter) -> Map<String, Value> {
    let mut result = Map::new();

    for (name, entity) in &scheme.fields {
        let matches = match &entity.tree {
            Some(levels) => match_tree(node, levels).unwrap_or_default(),
            None => vec![node],
        };

        let value = entity
            .rule
            .as_ref()
            .filter(|_| name == VALUE_FIELD)
            .map(|rule| extract_values(&[node], rule, converter));

        let mut items = Vec::new();
        match &entity.children {
            Some(children) if !matches.is_empty() => {
                for matched in &matches {
                    let mut object = Map::new();
                    if let Some(strings) = &value {
                        object.insert(VALUE_FIELD.to_string(), strings_to_array(strings));
                    }
                    object.extend(evaluate(*matched, children, converter));

                    if object.values().any(|v| !is_empty_array(v)) {
                        items.push(Value::Object(object));
                    }
                }
            }
            _ => {
                if let Some(strings) = &value {
                    items.extend(strings.iter().cloned().map(Value::String));
                }
            }
        }

        result.insert(name.clone(), Value::Array(items));
    }

    result
}

fn strings_to_array(strings: &[String]) -> Value {
    Value::Array(strings.iter().cloned().map(Value::String).collect())
}

fn is_empty_array(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.is_empty())
}
