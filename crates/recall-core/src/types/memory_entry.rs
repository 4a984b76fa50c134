//! Memory entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix for content-derived memory ids.
const ID_PREFIX: &str = "mem_";

/// A memory entry admitted to the corpus by the crosscheck engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    /// Content-derived identifier (`mem_` + MD5 of the normalized content).
    pub id: String,
    /// The memory content.
    pub content: String,
    /// Category label (e.g. "code", "preference", "fact").
    pub category: String,
    /// Extracted keywords, most frequent first.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Creation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Admission confidence (0.0-1.0).
    pub confidence: f32,
    /// Where the content came from.
    pub source: String,
    /// Highest similarity to the corpus at admission time (0.0-1.0).
    pub similarity_score: f32,
    /// Unique-value score at admission time (0.0-1.0).
    pub unique_value_score: f32,
    /// MD5 of the normalized original content.
    pub content_hash: String,
    /// Hashes of content merged into this entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_hashes: Vec<String>,
}

impl MemoryEntry {
    /// Create a new entry; the id and hash are derived from the content.
    pub fn new(content: impl Into<String>, category: impl Into<String>, source: impl Into<String>) -> Self {
        let content = content.into();
        let content_hash = content_hash(&content);
        Self {
            id: format!("{}{}", ID_PREFIX, content_hash),
            content,
            category: category.into(),
            keywords: Vec::new(),
            timestamp: Utc::now(),
            confidence: 0.5,
            source: source.into(),
            similarity_score: 0.0,
            unique_value_score: 0.0,
            content_hash,
            merged_hashes: Vec::new(),
        }
    }

    /// Set the keywords.
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Set the confidence (clamped to 0.0-1.0).
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }

    /// Set the similarity score (clamped to 0.0-1.0).
    pub fn with_similarity_score(mut self, score: f32) -> Self {
        self.similarity_score = clamp_unit(score);
        self
    }

    /// Set the unique-value score (clamped to 0.0-1.0).
    pub fn with_unique_value_score(mut self, score: f32) -> Self {
        self.unique_value_score = clamp_unit(score);
        self
    }

    /// Whether this entry owns the given content hash (original or merged).
    pub fn has_hash(&self, hash: &str) -> bool {
        self.content_hash == hash || self.merged_hashes.iter().any(|h| h == hash)
    }
}

/// Normalize content for identity checks: lowercase, collapsed whitespace.
pub fn normalize_content(content: &str) -> String {
    content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// MD5 hex digest of the normalized content.
pub fn content_hash(content: &str) -> String {
    format!("{:x}", md5::compute(normalize_content(content).as_bytes()))
}

/// Content-derived memory id.
pub fn memory_id_for(content: &str) -> String {
    format!("{}{}", ID_PREFIX, content_hash(content))
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_content_derived() {
        let a = MemoryEntry::new("Rust is fast", "fact", "test");
        let b = MemoryEntry::new("rust   is FAST", "fact", "other");
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("mem_"));
        assert_eq!(a.id, memory_id_for("Rust is fast"));
    }

    #[test]
    fn test_scores_are_clamped() {
        let entry = MemoryEntry::new("content", "fact", "test")
            .with_confidence(1.7)
            .with_similarity_score(-0.2)
            .with_unique_value_score(f32::NAN);
        assert_eq!(entry.confidence, 1.0);
        assert_eq!(entry.similarity_score, 0.0);
        assert_eq!(entry.unique_value_score, 0.0);
    }

    #[test]
    fn test_has_hash_includes_merged() {
        let mut entry = MemoryEntry::new("first", "fact", "test");
        let merged = content_hash("second");
        assert!(!entry.has_hash(&merged));
        entry.merged_hashes.push(merged.clone());
        assert!(entry.has_hash(&merged));
        assert!(entry.has_hash(&content_hash("FIRST")));
    }
}
