use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{CollectionSpec, Distance, ScoredPoint, VectorPoint, VectorStore, cosine_similarity};
use crate::errors::{PipelineError, PipelineResult};

struct Collection {
    spec: CollectionSpec,
    points: BTreeMap<String, VectorPoint>,
}

/// In-process vector store with brute-force search.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in `collection`, if it exists.
    pub fn point_count(&self, collection: &str) -> Option<usize> {
        let collections = self.collections.read().expect("vector store lock poisoned");
        collections.get(collection).map(|c| c.points.len())
    }
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(a, b),
    }
}

fn check_vector_name(spec: &CollectionSpec, vector_name: &str) -> PipelineResult<()> {
    if spec.vector_name == vector_name {
        Ok(())
    } else {
        Err(PipelineError::InvalidResponse(format!(
            "collection has no vector named '{vector_name}'"
        )))
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryVectorStore {
    fn provider(&self) -> &str {
        "memory"
    }

    async fn list_collections(&self) -> PipelineResult<Vec<String>> {
        let collections = self.collections.read().expect("vector store lock poisoned");
        Ok(collections.keys().cloned().collect())
    }

    async fn collection_exists(&self, name: &str) -> PipelineResult<bool> {
        let collections = self.collections.read().expect("vector store lock poisoned");
        Ok(collections.contains_key(name))
    }

    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> PipelineResult<()> {
        let mut collections = self.collections.write().expect("vector store lock poisoned");
        collections.entry(name.to_string()).or_insert_with(|| Collection {
            spec: spec.clone(),
            points: BTreeMap::new(),
        });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> PipelineResult<()> {
        let mut collections = self.collections.write().expect("vector store lock poisoned");
        collections.remove(name);
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        vector_name: &str,
        points: Vec<VectorPoint>,
    ) -> PipelineResult<()> {
        let mut collections = self.collections.write().expect("vector store lock poisoned");
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| PipelineError::CollectionNotFound(collection.to_string()))?;
        check_vector_name(&target.spec, vector_name)?;

        for point in &points {
            if point.vector.len() != target.spec.size {
                return Err(PipelineError::DimensionMismatch {
                    expected: target.spec.size,
                    actual: point.vector.len(),
                });
            }
        }
        for point in points {
            target.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector_name: &str,
        query: &[f32],
        limit: usize,
    ) -> PipelineResult<Vec<ScoredPoint>> {
        let collections = self.collections.read().expect("vector store lock poisoned");
        let target = collections
            .get(collection)
            .ok_or_else(|| PipelineError::CollectionNotFound(collection.to_string()))?;
        check_vector_name(&target.spec, vector_name)?;
        if query.len() != target.spec.size {
            return Err(PipelineError::DimensionMismatch {
                expected: target.spec.size,
                actual: query.len(),
            });
        }

        let mut hits: Vec<ScoredPoint> = target
            .points
            .values()
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                score: score(target.spec.distance, query, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }
}
