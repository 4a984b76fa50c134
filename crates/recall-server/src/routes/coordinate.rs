//! Coordination endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use recall_core::coordinator::RoutingAnalytics;
use recall_core::types::{QueryContext, RoutingDecision, StrategyKind};
use recall_core::{CoordinationResult, CoordinatorStatus};

use crate::error::ApiResult;
use crate::state::AppState;

/// Request body for a coordinated query.
#[derive(Debug, Deserialize)]
pub struct CoordinateRequest {
    /// The query text.
    pub query: String,
    /// Who is asking.
    pub source: Option<String>,
    /// Optional user scope.
    pub user_id: Option<String>,
    /// Strategies to include in addition to the routed ones.
    #[serde(default)]
    pub capabilities: Vec<StrategyKind>,
    /// Optional category hint.
    pub category: Option<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl CoordinateRequest {
    fn context(&self) -> QueryContext {
        let mut context = QueryContext::new(self.source.clone().unwrap_or_else(|| "api".to_string()));
        if let Some(user_id) = &self.user_id {
            context = context.with_user(user_id.clone());
        }
        if let Some(category) = &self.category {
            context = context.with_category(category.clone());
        }
        for kind in &self.capabilities {
            context = context.with_capability(*kind);
        }
        context.metadata = self.metadata.clone();
        context
    }
}

/// Coordinate a query across the registered strategies.
/// POST /coordinate
pub async fn coordinate(
    State(state): State<AppState>,
    Json(request): Json<CoordinateRequest>,
) -> ApiResult<Json<CoordinationResult>> {
    let context = request.context();
    let result = state.coordinator().coordinate(&request.query, context).await?;
    Ok(Json(result))
}

/// Latest coordinator status.
/// GET /status
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<CoordinatorStatus>> {
    Ok(Json(state.coordinator().status()))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Recent routing decisions to include.
    pub recent: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    #[serde(flatten)]
    pub analytics: RoutingAnalytics,
    pub recent_decisions: Vec<RoutingDecision>,
}

/// Routing analytics.
/// GET /analytics
pub async fn analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsResponse>> {
    let coordinator = state.coordinator();
    Ok(Json(AnalyticsResponse {
        analytics: coordinator.routing_analytics(),
        recent_decisions: coordinator.recent_decisions(query.recent.unwrap_or(10)),
    }))
}
