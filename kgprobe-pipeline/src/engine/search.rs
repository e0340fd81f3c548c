use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::errors::PipelineResult;
use crate::models::{DatasetHandle, ResultKind, SearchResult};

use super::{Pipeline, VECTOR_NAME};

/// Relations inherit their entity's score, discounted so the entity ranks first.
const RELATION_DISCOUNT: f32 = 0.9;

fn payload_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str)
}

pub(crate) async fn search_dataset(
    pipeline: &Pipeline,
    question: &str,
    dataset: &DatasetHandle,
) -> PipelineResult<Vec<SearchResult>> {
    pipeline.ensure_known(dataset).await?;

    let limit = pipeline.settings().search_limit.max(1);
    let query = pipeline.embedder().embed_one(question).await?;
    let mut results = Vec::new();

    let chunks = dataset.chunks_collection();
    if pipeline.vector().collection_exists(&chunks).await? {
        for hit in pipeline
            .vector()
            .search(&chunks, VECTOR_NAME, &query, limit)
            .await?
        {
            if let Some(text) = payload_str(&hit.payload, "text") {
                results.push(SearchResult {
                    kind: ResultKind::Chunk,
                    text: text.to_string(),
                    score: hit.score,
                });
            }
        }
    }

    let entities = dataset.entities_collection();
    if pipeline.vector().collection_exists(&entities).await? {
        let hits = pipeline
            .vector()
            .search(&entities, VECTOR_NAME, &query, limit)
            .await?;
        let mut seen_nodes = HashSet::new();
        let mut seen_relations = HashSet::new();
        for hit in hits {
            let Some(node_id) = payload_str(&hit.payload, "node_id") else {
                continue;
            };
            if !seen_nodes.insert(node_id.to_string()) {
                continue;
            }
            let text = payload_str(&hit.payload, "text").unwrap_or(node_id);
            results.push(SearchResult {
                kind: ResultKind::Entity,
                text: text.to_string(),
                score: hit.score,
            });

            let relations = pipeline
                .graph()
                .neighbors(dataset, node_id, pipeline.settings().graph_neighbors)
                .await?;
            for relation in relations {
                let text = relation.to_string();
                if seen_relations.insert(text.clone()) {
                    results.push(SearchResult {
                        kind: ResultKind::Relation,
                        text,
                        score: hit.score * RELATION_DISCOUNT,
                    });
                }
            }
        }
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
    debug!("Search in '{}' returned {} results", dataset, results.len());
    Ok(results)
}
