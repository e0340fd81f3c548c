//! Graph store seam and its adapters.

mod cypher;
mod memgraph;
mod memory;
mod neo4j;

use crate::errors::PipelineResult;
use crate::models::{DatasetHandle, GraphEdge, GraphNode, Relation};

pub use memgraph::MemgraphStore;
pub use memory::MemoryGraphStore;
pub use neo4j::Neo4jStore;

#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    /// Provider name, as used in the backend registry.
    fn provider(&self) -> &str;

    /// Insert or update nodes by id.
    async fn add_nodes(&self, dataset: &DatasetHandle, nodes: &[GraphNode]) -> PipelineResult<()>;

    /// Insert edges between existing nodes; duplicates are merged.
    async fn add_edges(&self, dataset: &DatasetHandle, edges: &[GraphEdge]) -> PipelineResult<()>;

    /// Relations touching `node_id`, in either direction.
    async fn neighbors(
        &self,
        dataset: &DatasetHandle,
        node_id: &str,
        limit: usize,
    ) -> PipelineResult<Vec<Relation>>;

    async fn delete_all(&self) -> PipelineResult<()>;
}
