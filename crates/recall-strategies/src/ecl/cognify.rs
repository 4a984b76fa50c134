//! Cognify: relationships from sentence-level co-occurrence.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::extract::Entity;

static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+\s+|\n+").unwrap());

/// A relationship between two entities that share sentences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Entity key; `source < target`.
    pub source: String,
    pub target: String,
    pub co_occurrences: usize,
    /// `co_occurrences / sqrt(freq_source * freq_target)`, in [0, 1].
    pub strength: f32,
    /// `min(1, 0.5 + 0.1 * co_occurrences)`.
    pub confidence: f32,
}

fn mentions(sentence: &str, key: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = sentence[start..].find(key) {
        let begin = start + pos;
        let end = begin + key.len();
        let before = sentence[..begin].chars().next_back();
        let after = sentence[end..].chars().next();
        let boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric() && c != '_');
        if boundary(before) && boundary(after) {
            return true;
        }
        start = end;
    }
    false
}

/// Pairwise relationships for entities mentioned in the same sentence.
pub fn cognify(text: &str, entities: &[Entity]) -> Vec<Relationship> {
    let frequency: HashMap<&str, usize> = entities.iter().map(|e| (e.key.as_str(), e.frequency)).collect();
    let mut co_occurrences: BTreeMap<(String, String), usize> = BTreeMap::new();

    for sentence in SENTENCE_BREAK.split(text) {
        let lowered = sentence.to_lowercase();
        let mut present: Vec<&str> = entities
            .iter()
            .map(|e| e.key.as_str())
            .filter(|key| mentions(&lowered, key))
            .collect();
        present.sort_unstable();
        present.dedup();

        for (i, a) in present.iter().enumerate() {
            for b in &present[i + 1..] {
                *co_occurrences.entry((a.to_string(), b.to_string())).or_insert(0) += 1;
            }
        }
    }

    co_occurrences
        .into_iter()
        .map(|((source, target), cooc)| {
            let fa = frequency.get(source.as_str()).copied().unwrap_or(1).max(1);
            let fb = frequency.get(target.as_str()).copied().unwrap_or(1).max(1);
            Relationship {
                strength: (cooc as f32 / ((fa * fb) as f32).sqrt()).clamp(0.0, 1.0),
                confidence: (0.5 + 0.1 * cooc as f32).min(1.0),
                co_occurrences: cooc,
                source,
                target,
            }
        })
        .collect()
}
