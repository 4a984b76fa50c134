//! Stored memory listing.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use recall_core::traits::MemoryStore;
use recall_core::types::MemoryEntry;

use crate::error::ApiResult;
use crate::state::AppState;

/// Query parameters for listing memories.
#[derive(Debug, Deserialize)]
pub struct ListMemoriesQuery {
    pub category: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListMemoriesResponse {
    pub total: usize,
    pub results: Vec<MemoryEntry>,
}

/// List stored entries, newest first.
/// GET /memories
pub async fn list_memories(
    State(state): State<AppState>,
    Query(query): Query<ListMemoriesQuery>,
) -> ApiResult<Json<ListMemoriesResponse>> {
    let mut entries = state.store().list().await?;
    if let Some(category) = &query.category {
        entries.retain(|e| &e.category == category);
    }
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));

    let total = entries.len();
    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }

    Ok(Json(ListMemoriesResponse {
        total,
        results: entries,
    }))
}
