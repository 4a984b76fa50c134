//! Merge per-strategy outputs into one result.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::types::AggregatedResults;
use crate::types::{normalize_content, StrategyKind, StrategyResult};

fn item_key(item: &serde_json::Value) -> Option<String> {
    if let Some(id) = item.get("id").and_then(|v| v.as_str()) {
        return Some(format!("id:{}", id));
    }
    ["content", "text", "name"]
        .iter()
        .find_map(|field| item.get(*field).and_then(|v| v.as_str()))
        .map(|text| format!("content:{}", normalize_content(text)))
}

/// Deduplicate items by id (else normalized content) and compute the
/// priority-weighted mean confidence of the successful strategies.
pub fn aggregate(
    results: &[StrategyResult],
    priorities: &HashMap<StrategyKind, f32>,
    max_items: usize,
) -> AggregatedResults {
    let mut aggregated = AggregatedResults::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut weighted = 0.0f32;
    let mut weight_total = 0.0f32;
    let mut payloads = BTreeMap::new();

    for result in results {
        let output = match (&result.output, result.success) {
            (Some(output), true) if output.success => output,
            _ => {
                aggregated.failed_strategies.push(result.strategy);
                continue;
            }
        };
        aggregated.successful_strategies.push(result.strategy);

        let priority = priorities.get(&result.strategy).copied().unwrap_or(1.0).max(0.0);
        weighted += priority * output.confidence;
        weight_total += priority;

        let items = output.items();
        if items.is_empty() {
            if !output.data.is_null() {
                payloads.insert(result.strategy.to_string(), output.data.clone());
            }
            continue;
        }

        for item in items {
            if let Some(key) = item_key(item) {
                if !seen.insert(key) {
                    continue;
                }
            }
            let mut item = item.clone();
            if let Some(obj) = item.as_object_mut() {
                obj.entry("strategy")
                    .or_insert_with(|| serde_json::Value::String(result.strategy.to_string()));
            }
            aggregated.items.push(item);
        }
    }

    aggregated.items.truncate(max_items);
    aggregated.payloads = payloads;
    aggregated.result_count = aggregated.items.len() + aggregated.payloads.len();
    aggregated.confidence_score = if weight_total > 0.0 {
        (weighted / weight_total).clamp(0.0, 1.0)
    } else {
        0.0
    };
    aggregated
}
