//! Load: idempotent insert into an in-memory knowledge graph.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use super::cognify::Relationship;
use super::extract::{Entity, EntityClass};

/// Node data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityNode {
    pub key: String,
    pub name: String,
    pub class: EntityClass,
    /// Total mentions across every load.
    pub mentions: usize,
}

/// Edge data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEdge {
    pub strength: f32,
    pub confidence: f32,
    pub co_occurrences: usize,
}

/// What a load changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub entities_created: usize,
    pub entities_updated: usize,
    pub relationships_created: usize,
    pub relationships_updated: usize,
}

/// Knowledge graph keyed by normalized entity name.
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    graph: UnGraph<EntityNode, RelationEdge>,
    index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update entities and relationships.
    ///
    /// An entity key maps to exactly one node and an entity pair to exactly
    /// one edge, however often the same content is loaded.
    pub fn load(&mut self, entities: &[Entity], relationships: &[Relationship]) -> LoadReport {
        let mut report = LoadReport::default();

        for entity in entities {
            match self.index.get(&entity.key) {
                Some(&idx) => {
                    self.graph[idx].mentions += entity.frequency;
                    report.entities_updated += 1;
                }
                None => {
                    let idx = self.graph.add_node(EntityNode {
                        key: entity.key.clone(),
                        name: entity.name.clone(),
                        class: entity.class,
                        mentions: entity.frequency,
                    });
                    self.index.insert(entity.key.clone(), idx);
                    report.entities_created += 1;
                }
            }
        }

        for rel in relationships {
            let (Some(&a), Some(&b)) = (self.index.get(&rel.source), self.index.get(&rel.target)) else {
                continue;
            };
            match self.graph.find_edge(a, b) {
                Some(edge) => {
                    let data = &mut self.graph[edge];
                    data.co_occurrences += rel.co_occurrences;
                    data.strength = data.strength.max(rel.strength);
                    data.confidence = (0.5 + 0.1 * data.co_occurrences as f32).min(1.0);
                    report.relationships_updated += 1;
                }
                None => {
                    self.graph.add_edge(
                        a,
                        b,
                        RelationEdge {
                            strength: rel.strength,
                            confidence: rel.confidence,
                            co_occurrences: rel.co_occurrences,
                        },
                    );
                    report.relationships_created += 1;
                }
            }
        }

        report
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn entity(&self, key: &str) -> Option<&EntityNode> {
        self.index.get(key).map(|&idx| &self.graph[idx])
    }

    /// Neighbours of an entity with the connecting edge, strongest first.
    pub fn neighbors(&self, key: &str) -> Vec<(&EntityNode, &RelationEdge)> {
        let Some(&idx) = self.index.get(key) else {
            return Vec::new();
        };
        let mut out: Vec<(&EntityNode, &RelationEdge)> = self
            .graph
            .edges(idx)
            .map(|edge| {
                let other = if edge.source() == idx { edge.target() } else { edge.source() };
                (&self.graph[other], edge.weight())
            })
            .collect();
        out.sort_by(|a, b| b.1.strength.total_cmp(&a.1.strength).then_with(|| a.0.key.cmp(&b.0.key)));
        out
    }
}
