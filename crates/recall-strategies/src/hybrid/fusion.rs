//! Reciprocal Rank Fusion.
//!
//! Combines ranked lists without score calibration:
//! `score(d) = Σ 1 / (k + rank_i(d))` with 1-based ranks.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::support::by_score_then_id;

/// One fused result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedItem {
    pub id: String,
    pub score: f32,
    /// Present in more than one input list.
    pub boosted: bool,
    /// Names of the lists the item appeared in.
    pub sources: Vec<String>,
}

/// RRF with a configurable `k`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RrfFusion {
    /// Higher k flattens the contribution of top ranks. Default 60.
    pub k: f32,
}

impl Default for RrfFusion {
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

impl RrfFusion {
    pub fn new(k: f32) -> Self {
        Self { k }
    }

    /// Best possible score for an item ranked first in `lists` lists.
    pub fn max_score(&self, lists: usize) -> f32 {
        lists as f32 / (self.k + 1.0)
    }

    /// Fuse named ranked lists of ids (best first).
    ///
    /// The result is sorted by score descending with ties broken by id, so
    /// the same inputs always produce the same ranking. Duplicate ids within
    /// one list count once, at their best rank.
    pub fn fuse(&self, ranked_lists: &[(&str, Vec<String>)]) -> Vec<FusedItem> {
        let mut scores: BTreeMap<String, (f32, BTreeSet<String>)> = BTreeMap::new();

        for (source, ids) in ranked_lists {
            let mut seen = BTreeSet::new();
            for (rank, id) in ids.iter().enumerate() {
                if !seen.insert(id) {
                    continue;
                }
                let contribution = 1.0 / (self.k + rank as f32 + 1.0);
                let slot = scores.entry(id.clone()).or_insert_with(|| (0.0, BTreeSet::new()));
                slot.0 += contribution;
                slot.1.insert(source.to_string());
            }
        }

        let mut fused: Vec<FusedItem> = scores
            .into_iter()
            .map(|(id, (score, sources))| FusedItem {
                boosted: sources.len() > 1,
                sources: sources.into_iter().collect(),
                id,
                score,
            })
            .collect();
        fused.sort_by(|a, b| by_score_then_id((&a.id, a.score), (&b.id, b.score)));
        fused
    }
}
