//! Helpers shared by the strategies.

use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use serde_json::{json, Value};

use recall_core::types::{memory_id_for, MemoryEntry};

/// List payload of a component answer: a bare array, or the `results` /
/// `items` array of an object.
pub(crate) fn result_list(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map
            .get("results")
            .or_else(|| map.get("items"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Id of a component result. Without an explicit id the id is derived from
/// the result's text, so equal text shares an id across producers and
/// different text never does. Text-less results fall back to `scope` and
/// their position.
pub(crate) fn item_id(item: &Value, scope: &str, position: usize) -> String {
    match item.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => match item_text(item) {
            Some(text) if !text.trim().is_empty() => memory_id_for(text),
            _ => format!("{}_{}", scope, position),
        },
    }
}

/// Text of a component result.
pub(crate) fn item_text(item: &Value) -> Option<&str> {
    ["content", "text", "document"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
}

/// Wire form of a stored entry inside a strategy payload.
pub(crate) fn entry_item(entry: &MemoryEntry, score: f32) -> Value {
    json!({
        "id": entry.id,
        "content": entry.content,
        "category": entry.category,
        "keywords": entry.keywords,
        "score": score,
    })
}

/// Descending score, then ascending id, so equal scores order deterministically.
pub(crate) fn by_score_then_id(a: (&str, f32), b: (&str, f32)) -> Ordering {
    OrderedFloat(b.1)
        .cmp(&OrderedFloat(a.1))
        .then_with(|| a.0.cmp(b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_list_shapes() {
        assert_eq!(result_list(&json!([1, 2])).len(), 2);
        assert_eq!(result_list(&json!({"results": [{"id": "a"}]})).len(), 1);
        assert_eq!(result_list(&json!({"items": []})).len(), 0);
        assert!(result_list(&json!("nope")).is_empty());
    }

    #[test]
    fn test_item_id_and_text() {
        assert_eq!(item_id(&json!({"id": 7}), "vector", 0), "7");
        assert_eq!(item_id(&json!({}), "vector", 3), "vector_3");
        assert_eq!(item_id(&json!({"text": "  "}), "keyword", 0), "keyword_0");

        let alpha = item_id(&json!({"content": "alpha document"}), "vector", 0);
        let beta = item_id(&json!({"content": "beta document"}), "keyword", 0);
        assert_ne!(alpha, beta);
        assert_eq!(alpha, memory_id_for("alpha document"));
        assert_eq!(item_id(&json!({"text": "Alpha  Document"}), "keyword", 5), alpha);
        assert_eq!(item_text(&json!({"text": "hi"})), Some("hi"));
    }

    #[test]
    fn test_ordering_breaks_ties_by_id() {
        let mut items = vec![("b", 0.5), ("a", 0.5), ("c", 0.9)];
        items.sort_by(|x, y| by_score_then_id(*x, *y));
        assert_eq!(items, vec![("c", 0.9), ("a", 0.5), ("b", 0.5)]);
    }
}
