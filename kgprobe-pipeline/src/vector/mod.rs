//! Vector store seam: the trait the pipeline indexes through and its adapters.

mod memory;
mod qdrant;

use serde_json::Value;

use crate::errors::PipelineResult;

pub use memory::MemoryVectorStore;
pub use qdrant::{QdrantClientError, QdrantStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
}

/// Shape of a collection with a single named vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub vector_name: String,
    pub size: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    pub fn cosine(vector_name: impl Into<String>, size: usize) -> Self {
        Self {
            vector_name: vector_name.into(),
            size,
            distance: Distance::Cosine,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Provider name, as used in the backend registry.
    fn provider(&self) -> &str;

    async fn list_collections(&self) -> PipelineResult<Vec<String>>;

    async fn collection_exists(&self, name: &str) -> PipelineResult<bool>;

    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> PipelineResult<()>;

    async fn delete_collection(&self, name: &str) -> PipelineResult<()>;

    async fn upsert(
        &self,
        collection: &str,
        vector_name: &str,
        points: Vec<VectorPoint>,
    ) -> PipelineResult<()>;

    async fn search(
        &self,
        collection: &str,
        vector_name: &str,
        query: &[f32],
        limit: usize,
    ) -> PipelineResult<Vec<ScoredPoint>>;
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
