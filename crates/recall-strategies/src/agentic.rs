//! Code-pattern extraction.
//!
//! Input is split into code blocks. When the pattern-miner component answers,
//! each block is also matched against a local catalogue of structural
//! signatures and both sets of findings are merged. When the component is
//! unavailable the result degrades to a plain block listing.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum::Display;
use tracing::debug;

use recall_core::bridge::{Bridge, Operation};
use recall_core::config::AgenticConfig;
use recall_core::error::RecallResult;
use recall_core::traits::Strategy;
use recall_core::types::{QueryContext, StrategyKind, StrategyOutput};

use crate::support::result_list;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```([A-Za-z0-9_+#-]*)[ \t]*\r?\n(.*?)```").unwrap());

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

static CODE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:fn |pub |impl |struct |enum |trait |use |let |def |class |import |from \S+ import|function |const |var |return\b|if .*[:{]\s*$|for .*[:{]\s*$|#include|public |private |@\w+)|[{};]\s*$|=>",
    )
    .unwrap()
});

static NUMBER_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").unwrap());

static SIGNATURE_PARAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:fn|def|function)\s+\w+\s*(?:<[^>]*>)?\s*\(([^)]*)\)").unwrap());

/// Pattern families in the local catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PatternCategory {
    Creational,
    Structural,
    Architectural,
    Smell,
}

/// One code block found in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub index: usize,
    pub language: String,
    pub line_count: usize,
    #[serde(skip)]
    pub content: String,
}

/// A pattern found in a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub name: String,
    pub category: String,
    pub block_index: usize,
    pub confidence: f32,
    /// `local`, `miner`, or `both`.
    pub source: String,
}

struct Signature {
    name: &'static str,
    category: PatternCategory,
    markers: Vec<Regex>,
}

impl Signature {
    fn new(name: &'static str, category: PatternCategory, markers: &[&str]) -> Self {
        Self {
            name,
            category,
            markers: markers.iter().map(|m| Regex::new(m).unwrap()).collect(),
        }
    }

    /// 0.5 for the first marker, 0.2 for each further one.
    fn confidence(&self, code: &str) -> Option<f32> {
        let hits = self.markers.iter().filter(|m| m.is_match(code)).count();
        (hits > 0).then(|| (0.5 + 0.2 * (hits - 1) as f32).min(1.0))
    }
}

static CATALOGUE: Lazy<Vec<Signature>> = Lazy::new(|| {
    use PatternCategory::*;
    vec![
        Signature::new(
            "singleton",
            Creational,
            &[
                r"(?i)\binstance\b",
                r"\bstatic\s+\w*\s*(?:INSTANCE|instance|_instance)\b|_instance\s*=\s*None",
                r"(?i)\bget_?instance\b|OnceCell|Lazy<|OnceLock",
            ],
        ),
        Signature::new(
            "factory",
            Creational,
            &[r"(?i)\bfactory\b", r"(?i)\b(?:create|make|build)_?[A-Z_a-z]*\s*\(", r"match\s+\w+\s*\{[^}]*=>\s*(?:Box|Arc)::new"],
        ),
        Signature::new(
            "builder",
            Creational,
            &[
                r"(?i)builder\b",
                r"\.build\(\)|fn\s+build\s*\(\s*(?:mut\s+)?self",
                r"fn\s+\w+\s*\(\s*mut\s+self\b|return\s+self\b",
            ],
        ),
        Signature::new(
            "adapter",
            Structural,
            &[r"(?i)\badapter\b", r"(?i)\bwrap(?:s|ped|per)?\b", r"impl\s+\w+\s+for\s+\w+"],
        ),
        Signature::new(
            "decorator",
            Structural,
            &[r"(?i)\bdecorator\b", r"(?m)^\s*@\w+", r"(?i)\bwraps\s*\("],
        ),
        Signature::new(
            "facade",
            Structural,
            &[r"(?i)\bfacade\b", r"(?i)\b(?:subsystem|simplif)\w*"],
        ),
        Signature::new(
            "proxy",
            Structural,
            &[r"(?i)\bproxy\b", r"(?i)\b(?:real_subject|delegate|forward)\w*\b"],
        ),
        Signature::new(
            "repository",
            Architectural,
            &[
                r"(?i)\brepository\b|\brepo\b",
                r"(?i)\b(?:find_by|get_by|save|find_all|delete_by)\w*\s*\(",
            ],
        ),
        Signature::new(
            "service_layer",
            Architectural,
            &[r"\b\w+Service\b|(?i)\bservice\b", r"(?i)\b(?:use_?case|business|domain)\b"],
        ),
        Signature::new(
            "controller",
            Architectural,
            &[
                r"\b\w+Controller\b|(?i)\bcontroller\b|\bhandler\b",
                r"(?i)@(?:app\.)?(?:get|post|put|delete|route)|\b(?:Router|route)\s*\(",
                r"(?i)\b(?:request|response|req|res)\b",
            ],
        ),
    ]
});

/// Blocks of code in `input`: fenced blocks, else blank-line-separated chunks
/// where at least half the lines look like code.
pub fn split_blocks(input: &str) -> Vec<CodeBlock> {
    let fenced: Vec<(String, String)> = FENCE
        .captures_iter(input)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect();

    let chunks: Vec<(String, String)> = if fenced.is_empty() {
        BLANK_LINES
            .split(input)
            .filter(|chunk| looks_like_code(chunk))
            .map(|chunk| (String::new(), chunk.to_string()))
            .collect()
    } else {
        fenced
    };

    chunks
        .into_iter()
        .filter(|(_, code)| !code.trim().is_empty())
        .enumerate()
        .map(|(index, (tag, code))| CodeBlock {
            index,
            language: if tag.is_empty() { detect_language(&code).to_string() } else { tag.to_lowercase() },
            line_count: code.lines().filter(|l| !l.trim().is_empty()).count(),
            content: code,
        })
        .collect()
}

fn looks_like_code(chunk: &str) -> bool {
    let lines: Vec<&str> = chunk.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return false;
    }
    let code_lines = lines.iter().filter(|l| CODE_LINE.is_match(l)).count();
    code_lines * 2 >= lines.len()
}

/// Best-effort language guess for unfenced blocks.
pub fn detect_language(code: &str) -> &'static str {
    let rules: [(&str, &[&str]); 5] = [
        ("rust", &["fn ", "let mut ", "impl ", "pub struct", "::"]),
        ("python", &["def ", "self.", "import ", "elif ", "None"]),
        ("typescript", &["interface ", ": string", ": number", "export "]),
        ("javascript", &["function ", "const ", "=>", "require("]),
        ("java", &["public class", "private ", "void ", "@Override"]),
    ];
    rules
        .iter()
        .map(|(lang, markers)| (*lang, markers.iter().filter(|m| code.contains(*m)).count()))
        .filter(|(_, hits)| *hits > 0)
        .max_by_key(|(_, hits)| *hits)
        .map(|(lang, _)| lang)
        .unwrap_or("unknown")
}

/// Deepest brace or indentation nesting in a block.
fn nesting_depth(code: &str) -> usize {
    let mut depth: usize = 0;
    let mut max_brace = 0;
    for c in code.chars() {
        match c {
            '{' => {
                depth += 1;
                max_brace = max_brace.max(depth);
            }
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    let max_indent = code
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            let spaces = l.len() - l.trim_start().len();
            spaces / 4
        })
        .max()
        .unwrap_or(0);
    max_brace.max(max_indent)
}

fn smells(block: &CodeBlock) -> Vec<(&'static str, f32)> {
    let mut found = Vec::new();
    if block.line_count > 50 {
        found.push(("long_function", (0.5 + (block.line_count - 50) as f32 / 100.0).min(1.0)));
    }
    let depth = nesting_depth(&block.content);
    if depth > 4 {
        found.push(("deep_nesting", (0.5 + 0.1 * (depth - 4) as f32).min(1.0)));
    }
    let magic = NUMBER_LITERAL
        .find_iter(&block.content)
        .filter(|m| !matches!(m.as_str(), "0" | "1" | "2"))
        .count();
    if magic >= 3 {
        found.push(("magic_numbers", (0.4 + 0.1 * magic as f32).min(1.0)));
    }
    let max_params = SIGNATURE_PARAMS
        .captures_iter(&block.content)
        .map(|c| c[1].split(',').filter(|p| !p.trim().is_empty()).count())
        .max()
        .unwrap_or(0);
    if max_params > 5 {
        found.push(("too_many_parameters", (0.5 + 0.1 * (max_params - 5) as f32).min(1.0)));
    }
    found
}

/// Match one block against the local catalogue and smell checks.
pub fn match_catalogue(block: &CodeBlock, min_confidence: f32) -> Vec<PatternMatch> {
    let structural = CATALOGUE.iter().filter_map(|sig| {
        sig.confidence(&block.content)
            .map(|confidence| (sig.name, sig.category, confidence))
    });
    let smelly = smells(block)
        .into_iter()
        .map(|(name, confidence)| (name, PatternCategory::Smell, confidence));

    structural
        .chain(smelly)
        .filter(|(_, _, confidence)| *confidence >= min_confidence)
        .map(|(name, category, confidence)| PatternMatch {
            name: name.to_string(),
            category: category.to_string(),
            block_index: block.index,
            confidence,
            source: "local".to_string(),
        })
        .collect()
}

/// Merge local matches with the miner's, keyed by (block, pattern name).
fn merge_findings(local: Vec<PatternMatch>, reported: &[Value]) -> Vec<PatternMatch> {
    let mut merged: BTreeMap<(usize, String), PatternMatch> = local
        .into_iter()
        .map(|m| ((m.block_index, m.name.clone()), m))
        .collect();

    for item in reported {
        let Some(name) = item.get("name").or_else(|| item.get("pattern")).and_then(Value::as_str) else {
            continue;
        };
        let block_index = item.get("block_index").and_then(Value::as_u64).unwrap_or(0) as usize;
        let confidence = item
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| (c as f32).clamp(0.0, 1.0))
            .unwrap_or(0.5);
        let key = (block_index, name.to_lowercase());
        match merged.get_mut(&key) {
            Some(existing) => {
                existing.confidence = existing.confidence.max(confidence);
                existing.source = "both".to_string();
            }
            None => {
                merged.insert(
                    key.clone(),
                    PatternMatch {
                        name: key.1,
                        category: item
                            .get("category")
                            .and_then(Value::as_str)
                            .unwrap_or("reported")
                            .to_string(),
                        block_index,
                        confidence,
                        source: "miner".to_string(),
                    },
                );
            }
        }
    }
    merged.into_values().collect()
}

/// Extracts code blocks and the patterns in them.
pub struct AgenticExtractionStrategy {
    bridge: Arc<Bridge>,
    config: AgenticConfig,
    priority: f32,
}

impl AgenticExtractionStrategy {
    pub fn new(bridge: Arc<Bridge>, config: AgenticConfig) -> Self {
        Self {
            bridge,
            config,
            priority: 1.0,
        }
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl Strategy for AgenticExtractionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AgenticExtraction
    }

    fn priority(&self) -> f32 {
        self.priority
    }

    async fn execute(&self, query: &str, context: &QueryContext) -> RecallResult<StrategyOutput> {
        let mut blocks = split_blocks(query);
        blocks.truncate(self.config.max_blocks);
        if blocks.is_empty() {
            return Ok(StrategyOutput::success(json!({ "blocks": [], "patterns": [] }), 0.0));
        }

        let response = self
            .bridge
            .call_with_cancel(
                Operation::AnalyzePatterns {
                    blocks: blocks.iter().map(|b| b.content.clone()).collect(),
                },
                &context.cancel,
            )
            .await?;

        if response.fallback {
            debug!(blocks = blocks.len(), reason = ?response.fallback_reason, "Pattern miner unavailable, listing blocks");
            return Ok(StrategyOutput::success(json!({ "blocks": blocks, "patterns": [] }), 0.2)
                .with_fallback(true)
                .with_metadata("fallback_reason", json!(response.fallback_reason)));
        }

        let local: Vec<PatternMatch> = blocks
            .iter()
            .flat_map(|b| match_catalogue(b, self.config.min_confidence))
            .collect();
        let patterns = merge_findings(local, &result_list(&response.data));

        let confidence = if patterns.is_empty() {
            0.3
        } else {
            patterns.iter().map(|p| p.confidence).sum::<f32>() / patterns.len() as f32
        };
        debug!(blocks = blocks.len(), patterns = patterns.len(), "Pattern extraction complete");

        Ok(StrategyOutput::success(json!({ "blocks": blocks, "patterns": patterns }), confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bridge_with, WireStub};
    use recall_core::bridge::Component;

    const BUILDER: &str = "```rust\npub struct ConfigBuilder { port: u16 }\n\nimpl ConfigBuilder {\n    pub fn port(mut self, port: u16) -> Self { self.port = port; self }\n    pub fn build(self) -> Config { Config { port: self.port } }\n}\n```";

    #[test]
    fn test_split_fenced_blocks() {
        let input = format!("Look at this:\n{}\nand this:\n```\ndef f(x):\n    return x\n```", BUILDER);
        let blocks = split_blocks(&input);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, "rust");
        assert_eq!(blocks[1].language, "python");
        assert_eq!(blocks[1].line_count, 2);
    }

    #[test]
    fn test_split_unfenced_chunks() {
        let input = "Why does this fail?\n\nfn main() {\n    let x = 5;\n}\n\nThanks for any help.";
        let blocks = split_blocks(input);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "rust");
        assert!(split_blocks("just a sentence about cooking").is_empty());
    }

    #[test]
    fn test_catalogue_finds_builder() {
        let block = &split_blocks(BUILDER)[0];
        let matches = match_catalogue(block, 0.3);
        let builder = matches.iter().find(|m| m.name == "builder").unwrap();
        assert_eq!(builder.category, "creational");
        assert!(builder.confidence > 0.85);
    }

    #[test]
    fn test_smells() {
        let code = "fn f(a: i32, b: i32, c: i32, d: i32, e: i32, g: i32) -> i32 {\n    a * 42 + b * 17 + c * 99\n}";
        let block = CodeBlock {
            index: 0,
            language: "rust".into(),
            line_count: 3,
            content: code.into(),
        };
        let names: Vec<String> = match_catalogue(&block, 0.3).into_iter().map(|m| m.name).collect();
        assert!(names.contains(&"too_many_parameters".to_string()));
        assert!(names.contains(&"magic_numbers".to_string()));
    }

    #[test]
    fn test_merge_marks_agreement() {
        let local = vec![PatternMatch {
            name: "builder".into(),
            category: "creational".into(),
            block_index: 0,
            confidence: 0.7,
            source: "local".into(),
        }];
        let reported = vec![
            json!({"name": "Builder", "block_index": 0, "confidence": 0.9}),
            json!({"name": "observer", "block_index": 0}),
        ];
        let merged = merge_findings(local, &reported);
        assert_eq!(merged.len(), 2);
        let builder = merged.iter().find(|m| m.name == "builder").unwrap();
        assert_eq!(builder.source, "both");
        assert!((builder.confidence - 0.9).abs() < 1e-6);
        assert_eq!(merged.iter().find(|m| m.name == "observer").unwrap().source, "miner");
    }

    #[tokio::test]
    async fn test_fallback_is_block_listing() {
        let strategy = AgenticExtractionStrategy::new(bridge_with(WireStub::new(), &[]), AgenticConfig::default());
        let out = strategy.execute(BUILDER, &QueryContext::new("test")).await.unwrap();

        assert!(out.fallback);
        assert_eq!(out.data["patterns"], json!([]));
        let block = &out.data["blocks"][0];
        assert_eq!(block["index"], 0);
        assert_eq!(block["language"], "rust");
        assert!(block.get("content").is_none());
    }

    #[tokio::test]
    async fn test_real_answer_merges_local_catalogue() {
        let stub = WireStub::new().answer(
            "analyze_patterns",
            json!({"results": [{"name": "immutability", "block_index": 0, "confidence": 0.6}]}),
        );
        let strategy = AgenticExtractionStrategy::new(
            bridge_with(stub, &[Component::PatternMiner]),
            AgenticConfig::default(),
        );
        let out = strategy.execute(BUILDER, &QueryContext::new("test")).await.unwrap();

        assert!(!out.fallback);
        let names: Vec<&str> = out.data["patterns"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["name"].as_str())
            .collect();
        assert!(names.contains(&"builder"));
        assert!(names.contains(&"immutability"));
    }
}
