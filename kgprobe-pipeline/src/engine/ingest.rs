use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunker::chunk_text;
use crate::errors::{PipelineError, PipelineResult};
use crate::models::DatasetHandle;
use crate::vector::VectorPoint;

use super::{Document, IngestReceipt, Pipeline, VECTOR_NAME};

pub(crate) async fn add_document(
    pipeline: &Pipeline,
    text: &str,
    dataset: &DatasetHandle,
) -> PipelineResult<IngestReceipt> {
    if text.trim().is_empty() {
        return Err(PipelineError::EmptyDocument);
    }

    let chunks = chunk_text(text, pipeline.settings().chunk_max_chars);
    let inputs: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = pipeline.embedder().embed_batch(&inputs).await?;

    let collection = dataset.chunks_collection();
    pipeline.ensure_collection(&collection).await?;

    let document_id = Uuid::new_v4();
    let points: Vec<VectorPoint> = chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| VectorPoint {
            id: Uuid::new_v4().to_string(),
            vector,
            payload: json!({
                "dataset": dataset.as_str(),
                "document_id": document_id.to_string(),
                "chunk_index": chunk.index,
                "text": chunk.content,
            }),
        })
        .collect();
    debug!("Upserting {} chunks into {}", points.len(), collection);
    pipeline
        .vector()
        .upsert(&collection, VECTOR_NAME, points)
        .await?;

    let ingested_at = Utc::now();
    pipeline
        .catalog()
        .lock()
        .await
        .entry(dataset.clone())
        .or_default()
        .documents
        .push(Document {
            id: document_id,
            text: text.to_string(),
            ingested_at,
            cognified: false,
        });

    info!(
        "Ingested document {} into '{}' ({} chunks)",
        document_id,
        dataset,
        chunks.len()
    );
    Ok(IngestReceipt {
        dataset: dataset.clone(),
        document_id,
        chunks: chunks.len(),
        ingested_at,
    })
}
