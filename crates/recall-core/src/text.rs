//! Lexical text utilities shared by crosscheck and the local strategies.
//!
//! All scores here are heuristics over normalized text and always land in
//! [0, 1]. None of them pretend to be semantic similarity.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "if", "then", "else", "of", "to", "in", "on", "at",
        "by", "for", "with", "from", "into", "about", "as", "is", "are", "was", "were", "be",
        "been", "being", "it", "its", "this", "that", "these", "those", "i", "you", "he", "she",
        "we", "they", "me", "my", "our", "your", "their", "do", "does", "did", "have", "has",
        "had", "not", "no", "so", "can", "could", "should", "would", "will", "just", "very",
        "what", "which", "who", "when", "where", "why", "how", "all", "any", "some", "there",
        "here", "also", "than", "too", "up", "out",
    ]
    .into_iter()
    .collect()
});

static STRUCTURAL_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // code fences, inline code, or call syntax
        Regex::new(r"```|`[^`]+`|\w+\([^)]*\)").unwrap(),
        // list items
        Regex::new(r"(?m)^\s*(?:[-*•]|\d+[.)])\s+").unwrap(),
        // urls and paths
        Regex::new(r"https?://\S+|(?:\./|/)?\w+(?:/\w+)+\.\w+").unwrap(),
        // numbers and versions
        Regex::new(r"\b\d+(?:\.\d+)*\b").unwrap(),
        // technical identifiers: dotted, snake_case, camelCase
        Regex::new(r"\b\w+\.\w+\b|\b[a-z]+_[a-z_]+\b|\b[a-z]+[A-Z]\w*\b").unwrap(),
    ]
});

/// Lowercase word tokens. Any Unicode script counts.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether a token is a stop word.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Content tokens: no stop words, no single characters.
pub fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > 1 && !is_stop_word(t))
        .collect()
}

/// Keywords ordered by frequency, then first appearance.
pub fn extract_keywords(text: &str, max: usize) -> Vec<String> {
    let tokens = content_tokens(text);
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, token) in tokens.iter().enumerate() {
        counts.entry(token.as_str()).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> =
        counts.into_iter().map(|(t, (count, first))| (t, count, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(max)
        .map(|(t, _, _)| t.to_string())
        .collect()
}

/// Dice coefficient over token sets.
pub fn token_dice(a: &str, b: &str) -> f32 {
    let a: HashSet<String> = tokenize(a).into_iter().collect();
    let b: HashSet<String> = tokenize(b).into_iter().collect();
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    (2 * shared) as f32 / (a.len() + b.len()) as f32
}

fn bigrams(text: &str) -> HashMap<(char, char), usize> {
    let normalized: Vec<char> = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .collect();
    let mut grams = HashMap::new();
    for pair in normalized.windows(2) {
        *grams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    grams
}

/// Dice coefficient over character-bigram multisets.
pub fn bigram_dice(a: &str, b: &str) -> f32 {
    let a = bigrams(a);
    let b = bigrams(b);
    let total: usize = a.values().sum::<usize>() + b.values().sum::<usize>();
    if total == 0 {
        return 0.0;
    }
    let shared: usize = a
        .iter()
        .map(|(gram, count)| (*count).min(*b.get(gram).unwrap_or(&0)))
        .sum();
    (2 * shared) as f32 / total as f32
}

/// Mean of token Dice and character-bigram Dice.
pub fn text_similarity(a: &str, b: &str) -> f32 {
    ((token_dice(a, b) + bigram_dice(a, b)) / 2.0).clamp(0.0, 1.0)
}

/// Fraction of query content tokens present in the document.
pub fn term_overlap(query: &str, document: &str) -> f32 {
    let query: HashSet<String> = content_tokens(query).into_iter().collect();
    if query.is_empty() {
        return 0.0;
    }
    let doc: HashSet<String> = tokenize(document).into_iter().collect();
    query.iter().filter(|t| doc.contains(*t)).count() as f32 / query.len() as f32
}

/// Distinct content tokens over all tokens.
pub fn keyword_density(text: &str) -> f32 {
    let total = tokenize(text).len();
    if total == 0 {
        return 0.0;
    }
    let distinct: HashSet<String> = content_tokens(text).into_iter().collect();
    (distinct.len() as f32 / total as f32).min(1.0)
}

/// Fraction of structural marker kinds present, saturating at three kinds.
pub fn structural_marker_score(text: &str) -> f32 {
    let present = STRUCTURAL_MARKERS.iter().filter(|re| re.is_match(text)).count();
    (present as f32 / 3.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_and_keywords() {
        assert_eq!(tokenize("Next.js, React!"), vec!["next", "js", "react"]);
        let keywords = extract_keywords("rust rust tokio the a tokio rust serde", 2);
        assert_eq!(keywords, vec!["rust", "tokio"]);
    }

    #[test]
    fn test_tokenize_non_latin() {
        assert_eq!(tokenize("Поиск Документов"), vec!["поиск", "документов"]);
        assert_eq!(tokenize("Café naïve"), vec!["café", "naïve"]);
        assert_eq!(tokenize("缓存 系统"), vec!["缓存", "系统"]);
        assert_eq!(content_tokens("я люблю Rust"), vec!["люблю", "rust"]);
        assert!(tokenize("!!!! ???? ----").is_empty());
    }

    #[test]
    fn test_dice_bounds() {
        assert_eq!(token_dice("same words", "same words"), 1.0);
        assert_eq!(token_dice("alpha", "beta"), 0.0);
        assert_eq!(bigram_dice("", ""), 0.0);
        assert!((bigram_dice("Hello World", "hello   world") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_near_duplicate_similarity() {
        let a = "Next.js is a React framework for production applications";
        let b = "Next.js is a React framework for building production apps";
        let sim = text_similarity(a, b);
        assert!(sim >= 0.70, "similarity {}", sim);
        assert!(sim < 1.0);
        assert!(text_similarity(a, "Postgres vacuum tuning notes") < 0.3);
    }

    #[test]
    fn test_term_overlap() {
        assert_eq!(term_overlap("rust async", "Async Rust in depth"), 1.0);
        assert_eq!(term_overlap("the", "anything"), 0.0);
    }

    #[test]
    fn test_density_and_markers() {
        assert_eq!(keyword_density("the the the"), 0.0);
        assert!(keyword_density("tokio serde axum") > 0.9);
        assert_eq!(structural_marker_score("plain words only"), 0.0);
        assert!(structural_marker_score("call `foo()` in v1.2 of next.js") >= 2.0 / 3.0);
    }
}
