//! Lexical/structural query analysis.
//!
//! Classification is a handful of regexes and counts, run synchronously
//! before any strategy is scheduled.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Complexity, QueryAnalysis, QueryFlags, QueryType};

static CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"```").unwrap(),
        Regex::new(r"(?m)^\s*(fn|def|class|struct|impl|function|func|interface|enum|import|from|use|const|let|var|pub)\s+\w+").unwrap(),
        Regex::new(r"=>|->|::|\{\s*$|^\s*\}|;\s*$|#include").unwrap(),
        Regex::new(r"\b\w+\([^)]*\)\s*[{:;]").unwrap(),
    ]
});

static ERROR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(error|exception|traceback|panic(ked)?|stack ?trace|segfault|crash(es|ed)?|fail(s|ed|ure|ing)?|undefined|null pointer|errno|E\d{4})\b",
    )
    .unwrap()
});

static QUESTION_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(what|how|why|where|when|which|who|can|could|does|do|is|are|should|would)\b").unwrap()
});

static MEMORY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(remember|recall|memor(y|ies)|previous(ly)?|last time|earlier|preferences?|prefer|told you|we discussed)\b",
    )
    .unwrap()
});

static SEARCH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(find|search|look ?up|locate|show me|list|where is|examples? of|docs?|documentation)\b").unwrap()
});

static CLAUSE_SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i);|\?\s+\S|\band then\b|\balso\b|\badditionally\b|\bas well as\b").unwrap()
});

/// Stateless query analyzer.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryAnalyzer;

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Classify type, complexity and structural flags.
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        let trimmed = query.trim();
        let token_count = trimmed.split_whitespace().count();
        let line_count = trimmed.lines().filter(|l| !l.trim().is_empty()).count();
        let clause_count = 1 + CLAUSE_SEPARATORS.find_iter(trimmed).count();

        let flags = QueryFlags {
            has_code: CODE_PATTERNS.iter().any(|re| re.is_match(trimmed)),
            has_error: ERROR_PATTERN.is_match(trimmed),
            is_question: trimmed.ends_with('?') || QUESTION_START.is_match(trimmed),
            mentions_memory: MEMORY_PATTERN.is_match(trimmed),
            multi_part: clause_count >= 2,
        };

        let query_type = if flags.has_error {
            QueryType::ErrorAnalysis
        } else if flags.has_code {
            QueryType::CodeAnalysis
        } else if flags.mentions_memory {
            QueryType::MemoryQuery
        } else if flags.is_question || SEARCH_PATTERN.is_match(trimmed) {
            QueryType::SearchQuery
        } else {
            QueryType::General
        };

        let mut score = 0;
        score += match token_count {
            n if n > 50 => 2,
            n if n > 20 => 1,
            _ => 0,
        };
        score += match line_count {
            n if n > 10 => 2,
            n if n > 3 => 1,
            _ => 0,
        };
        if flags.has_code {
            score += 1;
        }
        if clause_count >= 3 {
            score += 1;
        }

        let complexity = match score {
            s if s >= 4 => Complexity::High,
            s if s >= 2 => Complexity::Medium,
            _ => Complexity::Low,
        };

        QueryAnalysis {
            query_type,
            complexity,
            flags,
            token_count,
        }
    }
}
