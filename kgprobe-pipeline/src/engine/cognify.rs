use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::PipelineResult;
use crate::extract::{EXTRACTION_SYSTEM_PROMPT, extraction_prompt, parse_extraction};
use crate::models::{DatasetHandle, GraphNode};
use crate::vector::VectorPoint;

use super::{CognifySummary, Pipeline, VECTOR_NAME};

pub(crate) async fn cognify_dataset(
    pipeline: &Pipeline,
    dataset: &DatasetHandle,
) -> PipelineResult<CognifySummary> {
    pipeline.ensure_known(dataset).await?;

    let pending: Vec<(Uuid, String)> = {
        let catalog = pipeline.catalog().lock().await;
        catalog
            .get(dataset)
            .map(|entry| {
                entry
                    .documents
                    .iter()
                    .filter(|doc| !doc.cognified)
                    .inspect(|doc| {
                        debug!("Queued document {} (ingested {})", doc.id, doc.ingested_at)
                    })
                    .map(|doc| (doc.id, doc.text.clone()))
                    .collect()
            })
            .unwrap_or_default()
    };
    if pending.is_empty() {
        info!("Nothing to cognify in '{}'", dataset);
        return Ok(CognifySummary::default());
    }

    let mut summary = CognifySummary::default();
    let mut entities: Vec<GraphNode> = Vec::new();
    for (document_id, text) in &pending {
        let reply = pipeline
            .llm()
            .complete(
                Some(EXTRACTION_SYSTEM_PROMPT),
                &extraction_prompt(text),
                pipeline.settings().extraction_max_tokens,
            )
            .await?;
        let graph = parse_extraction(&reply)?;
        debug!(
            "Document {} yielded {} nodes and {} edges",
            document_id,
            graph.nodes.len(),
            graph.edges.len()
        );

        pipeline.graph().add_nodes(dataset, &graph.nodes).await?;
        pipeline.graph().add_edges(dataset, &graph.edges).await?;

        summary.documents += 1;
        summary.nodes += graph.nodes.len();
        summary.edges += graph.edges.len();
        for node in graph.nodes {
            if !entities.iter().any(|known| known.id == node.id) {
                entities.push(node);
            }
        }
    }

    index_entities(pipeline, dataset, &entities).await?;

    {
        let mut catalog = pipeline.catalog().lock().await;
        if let Some(entry) = catalog.get_mut(dataset) {
            for doc in entry.documents.iter_mut() {
                if pending.iter().any(|(id, _)| *id == doc.id) {
                    doc.cognified = true;
                }
            }
        }
    }

    info!(
        "Cognified '{}': {} documents, {} nodes, {} edges",
        dataset, summary.documents, summary.nodes, summary.edges
    );
    Ok(summary)
}

async fn index_entities(
    pipeline: &Pipeline,
    dataset: &DatasetHandle,
    entities: &[GraphNode],
) -> PipelineResult<()> {
    if entities.is_empty() {
        return Ok(());
    }

    let texts: Vec<String> = entities.iter().map(GraphNode::embedding_text).collect();
    let vectors = pipeline.embedder().embed_batch(&texts).await?;

    let collection = dataset.entities_collection();
    pipeline.ensure_collection(&collection).await?;

    let points: Vec<VectorPoint> = entities
        .iter()
        .zip(texts)
        .zip(vectors)
        .map(|((node, text), vector)| VectorPoint {
            id: Uuid::new_v4().to_string(),
            vector,
            payload: json!({
                "dataset": dataset.as_str(),
                "node_id": node.id,
                "name": node.name,
                "kind": node.kind,
                "text": text,
            }),
        })
        .collect();
    pipeline
        .vector()
        .upsert(&collection, VECTOR_NAME, points)
        .await
}
