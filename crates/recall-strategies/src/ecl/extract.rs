//! Extract: heuristic entity recognition.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use recall_core::text::is_stop_word;

/// Entity classes recognised by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityClass {
    Technology,
    Concept,
    Method,
    File,
    Tool,
}

/// An entity found in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Surface form of the first occurrence.
    pub name: String,
    /// Lowercased key used for co-occurrence and graph identity.
    pub key: String,
    pub class: EntityClass,
    pub frequency: usize,
}

static TYPED_PATTERNS: Lazy<Vec<(EntityClass, Regex)>> = Lazy::new(|| {
    vec![
        (
            EntityClass::File,
            Regex::new(r"\b[\w./-]+\.(?:rs|py|js|jsx|ts|tsx|go|java|rb|json|toml|ya?ml|md|sql|sh|css|html)\b").unwrap(),
        ),
        (
            EntityClass::Technology,
            Regex::new(
                r"(?i)\b(?:rust|python|javascript|typescript|java|golang|react|next\.js|node\.js|vue|svelte|django|flask|fastapi|tokio|axum|actix|serde|postgres(?:ql)?|mysql|sqlite|redis|mongodb|kafka|graphql|grpc|docker|kubernetes|aws|wasm|webassembly|linux|llvm)\b",
            )
            .unwrap(),
        ),
        (
            EntityClass::Tool,
            Regex::new(r"(?i)\b(?:cargo|rustc|clippy|git|npm|yarn|pnpm|pip|poetry|make|cmake|kubectl|terraform|webpack|vite|eslint|pytest|jest|curl|grep)\b").unwrap(),
        ),
        (
            EntityClass::Method,
            Regex::new(r"\b[a-z_][a-zA-Z0-9_]*(?:::[a-z_][a-zA-Z0-9_]*)*\(\)").unwrap(),
        ),
        (
            EntityClass::Concept,
            Regex::new(
                r"(?i)\b(?:circuit breaker|rate limit(?:ing|er)?|retry|backoff|timeout|cache|caching|concurrency|async|deadlock|race condition|memory leak|authentication|authorization|middleware|pipeline|dependency injection|ownership|borrow(?:ing| checker)|lifetime|trait|generics?|closure|recursion|serialization|deduplication|indexing|embedding|reranking|knowledge graph|microservices?|api)\b",
            )
            .unwrap(),
        ),
    ]
});

static CAPITALISED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-zA-Z0-9]{2,}\b").unwrap());

/// Entities in `text`, most frequent first.
///
/// Typed patterns need one occurrence; generic capitalised terms need
/// `min_generic_frequency`. Stop words and terms already claimed by a typed
/// pattern are dropped.
pub fn extract_entities(text: &str, min_generic_frequency: usize, max_entities: usize) -> Vec<Entity> {
    let mut found: HashMap<String, Entity> = HashMap::new();

    for (class, pattern) in TYPED_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let name = m.as_str().trim_end_matches("()");
            let key = name.to_lowercase();
            found
                .entry(key.clone())
                .and_modify(|e| e.frequency += 1)
                .or_insert_with(|| Entity {
                    name: name.to_string(),
                    key,
                    class: *class,
                    frequency: 1,
                });
        }
    }

    let mut generic: HashMap<String, (String, usize)> = HashMap::new();
    for m in CAPITALISED.find_iter(text) {
        let key = m.as_str().to_lowercase();
        if is_stop_word(&key) || found.contains_key(&key) {
            continue;
        }
        generic
            .entry(key)
            .and_modify(|(_, n)| *n += 1)
            .or_insert_with(|| (m.as_str().to_string(), 1));
    }
    for (key, (name, frequency)) in generic {
        if frequency >= min_generic_frequency.max(1) {
            found.insert(
                key.clone(),
                Entity {
                    name,
                    key,
                    class: EntityClass::Concept,
                    frequency,
                },
            );
        }
    }

    let mut entities: Vec<Entity> = found.into_values().collect();
    entities.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.key.cmp(&b.key)));
    entities.truncate(max_entities);
    entities
}
