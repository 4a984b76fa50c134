//! Strategy trait.

use async_trait::async_trait;

use crate::error::RecallResult;
use crate::types::{QueryContext, StrategyKind, StrategyOutput};

/// Core Strategy trait - every retrieval/enrichment unit implements this.
///
/// Implementations must observe `context.cancel` around long-running work;
/// the coordinator additionally drops the future on timeout or cancellation.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Weight of this strategy's confidence in the aggregated score.
    fn priority(&self) -> f32 {
        1.0
    }

    /// Execute the strategy for a query.
    async fn execute(&self, query: &str, context: &QueryContext) -> RecallResult<StrategyOutput>;
}
