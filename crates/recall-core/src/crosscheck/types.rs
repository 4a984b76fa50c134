//! Crosscheck decision types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What to do with a candidate memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CrosscheckAction {
    Add,
    Merge,
    Skip,
}

/// Admission thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrosscheckConfig {
    /// Trimmed content shorter than this is skipped.
    pub min_content_length: usize,
    /// Similarity at or above which content is a duplicate.
    pub similarity_threshold: f32,
    /// Similarity at or above which content is merged into its closest entry.
    pub merge_threshold: f32,
    /// Minimum unique value for an add.
    pub unique_value_threshold: f32,
    /// Minimum confidence for an add.
    pub confidence_threshold: f32,
    /// Confidence assigned when content cannot be judged.
    pub low_confidence: f32,
    /// Confidence bump applied to a merge target.
    pub merge_confidence_boost: f32,
    /// Similar entries reported per decision.
    pub max_similar_entries: usize,
    /// Keywords kept per entry.
    pub max_keywords: usize,
}

impl Default for CrosscheckConfig {
    fn default() -> Self {
        Self {
            min_content_length: 10,
            similarity_threshold: 0.85,
            merge_threshold: 0.70,
            unique_value_threshold: 0.3,
            confidence_threshold: 0.5,
            low_confidence: 0.3,
            merge_confidence_boost: 0.1,
            max_similar_entries: 5,
            max_keywords: 10,
        }
    }
}

/// Where a candidate comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrosscheckContext {
    pub source: String,
    pub category: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Default for CrosscheckContext {
    fn default() -> Self {
        Self {
            source: "api".to_string(),
            category: "general".to_string(),
            metadata: HashMap::new(),
        }
    }
}

impl CrosscheckContext {
    pub fn new(source: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            category: category.into(),
            metadata: HashMap::new(),
        }
    }
}

/// An existing entry close to the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarEntry {
    pub id: String,
    pub similarity: f32,
    pub preview: String,
}

/// Outcome of `analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosscheckDecision {
    pub should_add: bool,
    pub action: CrosscheckAction,
    pub confidence: f32,
    /// Most similar first.
    pub similar_entries: Vec<SimilarEntry>,
    pub unique_value: f32,
    pub reasoning: String,
    /// Highest similarity against the corpus.
    #[serde(default)]
    pub max_similarity: f32,
    /// Entry to merge into (merge only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_target: Option<String>,
    /// Whether the candidate repeats stored content exactly.
    #[serde(default)]
    pub duplicate: bool,
}

impl CrosscheckDecision {
    pub(crate) fn skip(reasoning: impl Into<String>) -> Self {
        Self {
            should_add: false,
            action: CrosscheckAction::Skip,
            confidence: 1.0,
            similar_entries: Vec::new(),
            unique_value: 0.0,
            reasoning: reasoning.into(),
            max_similarity: 0.0,
            merge_target: None,
            duplicate: false,
        }
    }
}

/// Outcome of `execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub action: CrosscheckAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<String>,
    pub message: String,
}

/// Running counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrosscheckStats {
    pub analyses: u64,
    pub added: u64,
    pub merged: u64,
    pub skipped: u64,
    pub duplicates_prevented: u64,
}

/// Result of `submit`: the decision and what was done with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResult {
    pub decision: CrosscheckDecision,
    pub execution: ExecutionResult,
}
