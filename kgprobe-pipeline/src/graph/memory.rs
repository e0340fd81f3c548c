use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::GraphStore;
use crate::errors::{PipelineError, PipelineResult};
use crate::models::{DatasetHandle, GraphEdge, GraphNode, Relation};

#[derive(Default)]
struct DatasetGraph {
    nodes: BTreeMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
}

/// In-process graph store keyed by dataset.
#[derive(Default)]
pub struct MemoryGraphStore {
    graphs: RwLock<HashMap<DatasetHandle, DatasetGraph>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node and edge counts for `dataset`.
    pub fn counts(&self, dataset: &DatasetHandle) -> (usize, usize) {
        let graphs = self.graphs.read().expect("graph store lock poisoned");
        graphs
            .get(dataset)
            .map(|g| (g.nodes.len(), g.edges.len()))
            .unwrap_or((0, 0))
    }
}

#[async_trait::async_trait]
impl GraphStore for MemoryGraphStore {
    fn provider(&self) -> &str {
        "memory"
    }

    async fn add_nodes(&self, dataset: &DatasetHandle, nodes: &[GraphNode]) -> PipelineResult<()> {
        let mut graphs = self.graphs.write().expect("graph store lock poisoned");
        let graph = graphs.entry(dataset.clone()).or_default();
        for node in nodes {
            graph.nodes.insert(node.id.clone(), node.clone());
        }
        Ok(())
    }

    async fn add_edges(&self, dataset: &DatasetHandle, edges: &[GraphEdge]) -> PipelineResult<()> {
        let mut graphs = self.graphs.write().expect("graph store lock poisoned");
        let graph = graphs.entry(dataset.clone()).or_default();
        for edge in edges {
            for endpoint in [&edge.source, &edge.target] {
                if !graph.nodes.contains_key(endpoint) {
                    return Err(PipelineError::Graph(format!("unknown node '{endpoint}'")));
                }
            }
            if !graph.edges.contains(edge) {
                graph.edges.push(edge.clone());
            }
        }
        Ok(())
    }

    async fn neighbors(
        &self,
        dataset: &DatasetHandle,
        node_id: &str,
        limit: usize,
    ) -> PipelineResult<Vec<Relation>> {
        let graphs = self.graphs.read().expect("graph store lock poisoned");
        let Some(graph) = graphs.get(dataset) else {
            return Ok(Vec::new());
        };
        let name_of = |id: &str| {
            graph
                .nodes
                .get(id)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        Ok(graph
            .edges
            .iter()
            .filter(|e| e.source == node_id || e.target == node_id)
            .take(limit)
            .map(|e| Relation {
                source: name_of(&e.source),
                relation: e.relation.clone(),
                target: name_of(&e.target),
            })
            .collect())
    }

    async fn delete_all(&self) -> PipelineResult<()> {
        let mut graphs = self.graphs.write().expect("graph store lock poisoned");
        graphs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            name: name.to_string(),
            kind: "Thing".to_string(),
            description: String::new(),
        }
    }

    fn edge(source: &str, relation: &str, target: &str) -> GraphEdge {
        GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            relation: relation.to_string(),
        }
    }

    #[tokio::test]
    async fn neighbors_resolve_names_in_both_directions() {
        let store = MemoryGraphStore::new();
        let ds = DatasetHandle::parse("ds1").unwrap();
        store
            .add_nodes(
                &ds,
                &[
                    node("minimax", "MiniMax"),
                    node("llm", "language model"),
                    node("china", "China"),
                ],
            )
            .await
            .unwrap();
        store
            .add_edges(
                &ds,
                &[
                    edge("minimax", "provides", "llm"),
                    edge("minimax", "based_in", "china"),
                    edge("minimax", "provides", "llm"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.counts(&ds), (3, 2));
        let relations = store.neighbors(&ds, "llm", 10).await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].to_string(), "MiniMax --provides--> language model");
        assert_eq!(store.neighbors(&ds, "minimax", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn edges_need_known_endpoints_and_datasets_are_isolated() {
        let store = MemoryGraphStore::new();
        let a = DatasetHandle::parse("a").unwrap();
        let b = DatasetHandle::parse("b").unwrap();
        store.add_nodes(&a, &[node("x", "X")]).await.unwrap();

        let err = store
            .add_edges(&a, &[edge("x", "knows", "y")])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Graph(_)));
        assert_eq!(store.counts(&b), (0, 0));

        store.delete_all().await.unwrap();
        assert_eq!(store.counts(&a), (0, 0));
    }
}
