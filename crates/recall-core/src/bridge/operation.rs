//! Typed components and operations served over the bridge.

use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// External components reachable through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Component {
    VectorIndex,
    KeywordIndex,
    CrossEncoder,
    PatternMiner,
    KnowledgeGraph,
    PreferenceStore,
}

impl Component {
    /// Methods this component can serve.
    pub fn supported_methods(&self) -> &'static [&'static str] {
        match self {
            Self::VectorIndex => &["vector_search"],
            Self::KeywordIndex => &["keyword_search"],
            Self::CrossEncoder => &["cross_encode"],
            Self::PatternMiner => &["analyze_patterns"],
            Self::KnowledgeGraph => &["load_graph"],
            Self::PreferenceStore => &["lookup_preferences"],
        }
    }

    /// Whether `method` belongs to this component's capability interface.
    pub fn supports(&self, method: &str) -> bool {
        self.supported_methods().contains(&method)
    }

    /// All components.
    pub fn all() -> Vec<Component> {
        Component::iter().collect()
    }
}

/// A typed bridge operation. Each operation belongs to exactly one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Operation {
    VectorSearch { query: String, limit: usize },
    KeywordSearch { query: String, limit: usize },
    CrossEncode { query: String, documents: Vec<String> },
    AnalyzePatterns { blocks: Vec<String> },
    LoadGraph {
        entities: Vec<serde_json::Value>,
        relationships: Vec<serde_json::Value>,
    },
    LookupPreferences {
        user_id: Option<String>,
        query: String,
    },
}

impl Operation {
    /// The component that serves this operation.
    pub fn component(&self) -> Component {
        match self {
            Self::VectorSearch { .. } => Component::VectorIndex,
            Self::KeywordSearch { .. } => Component::KeywordIndex,
            Self::CrossEncode { .. } => Component::CrossEncoder,
            Self::AnalyzePatterns { .. } => Component::PatternMiner,
            Self::LoadGraph { .. } => Component::KnowledgeGraph,
            Self::LookupPreferences { .. } => Component::PreferenceStore,
        }
    }

    /// Wire method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::VectorSearch { .. } => "vector_search",
            Self::KeywordSearch { .. } => "keyword_search",
            Self::CrossEncode { .. } => "cross_encode",
            Self::AnalyzePatterns { .. } => "analyze_patterns",
            Self::LoadGraph { .. } => "load_graph",
            Self::LookupPreferences { .. } => "lookup_preferences",
        }
    }

    /// Arguments as a JSON object.
    pub fn args(&self) -> serde_json::Value {
        match self {
            Self::VectorSearch { query, limit } | Self::KeywordSearch { query, limit } => {
                json!({ "query": query, "limit": limit })
            }
            Self::CrossEncode { query, documents } => json!({ "query": query, "documents": documents }),
            Self::AnalyzePatterns { blocks } => json!({ "blocks": blocks }),
            Self::LoadGraph {
                entities,
                relationships,
            } => json!({ "entities": entities, "relationships": relationships }),
            Self::LookupPreferences { user_id, query } => json!({ "user_id": user_id, "query": query }),
        }
    }

    /// Request body sent to the component.
    pub fn to_request(&self) -> BridgeRequest {
        BridgeRequest {
            component: self.component(),
            method: self.method().to_string(),
            args: self.args(),
        }
    }
}

/// Wire request: `{"component", "method", "args"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub component: Component,
    pub method: String,
    pub args: serde_json::Value,
}

/// Wire response: `{"success", "result" | "error"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WireResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}
