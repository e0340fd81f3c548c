//! End-to-end runs of the pipeline over the in-process backends with a
//! scripted LLM standing in for the remote model.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kgprobe_core::PipelineSettings;
use kgprobe_pipeline::{
    DatasetHandle, LlmClient, MemoryGraphStore, MemoryVectorStore, Pipeline, PipelineError,
    PipelineResult, ResultKind, VectorStore,
};

const EXTRACTION_REPLY: &str = r#"```json
{
  "nodes": [
    {"id": "minimax", "name": "MiniMax", "type": "Company", "description": "language model provider"},
    {"id": "language_model", "name": "Language Model", "type": "Concept"}
  ],
  "edges": [
    {"source": "minimax", "target": "language_model", "relation": "provides"}
  ]
}
```"#;

struct ScriptedLlm {
    reply: &'static str,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn model(&self) -> &str {
        "demo-model"
    }

    async fn complete(
        &self,
        _system: Option<&str>,
        _prompt: &str,
        _max_tokens: u32,
    ) -> PipelineResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
}

struct RejectingLlm;

#[async_trait::async_trait]
impl LlmClient for RejectingLlm {
    fn model(&self) -> &str {
        "demo-model"
    }

    async fn complete(
        &self,
        _system: Option<&str>,
        _prompt: &str,
        _max_tokens: u32,
    ) -> PipelineResult<String> {
        Err(PipelineError::Api {
            status: 401,
            message: "invalid api key".to_string(),
        })
    }
}

fn small_settings() -> PipelineSettings {
    PipelineSettings {
        embedding_dimensions: 64,
        ..PipelineSettings::default()
    }
}

fn pipeline_with(llm: Arc<dyn LlmClient>, vector: Arc<MemoryVectorStore>) -> Pipeline {
    Pipeline::builder(llm)
        .vector_store(vector)
        .settings(small_settings())
        .build()
}

#[tokio::test]
async fn ingest_cognify_search_yields_printable_results() {
    let graph = Arc::new(MemoryGraphStore::new());
    let pipeline = Pipeline::builder(ScriptedLlm::new(EXTRACTION_REPLY))
        .graph_store(graph.clone())
        .settings(small_settings())
        .build();

    let receipt = pipeline
        .add("MiniMax is a language model provider.", "ds1")
        .await
        .unwrap();
    assert_eq!(receipt.dataset.as_str(), "ds1");
    assert_eq!(receipt.chunks, 1);

    let summary = pipeline.cognify("ds1").await.unwrap();
    assert_eq!(summary.documents, 1);
    assert_eq!(summary.nodes, 2);
    assert_eq!(summary.edges, 1);
    assert_eq!(graph.counts(&DatasetHandle::parse("ds1").unwrap()), (2, 1));

    let results = pipeline.search("What is MiniMax?", "ds1").await.unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| !r.to_string().is_empty()));
    assert!(results.iter().any(|r| r.kind == ResultKind::Chunk
        && r.text == "MiniMax is a language model provider."));
    assert!(results
        .iter()
        .any(|r| r.kind == ResultKind::Relation
            && r.text == "MiniMax --provides--> Language Model"));
}

#[tokio::test]
async fn searching_a_dataset_never_ingested_fails() {
    let pipeline = pipeline_with(
        ScriptedLlm::new(EXTRACTION_REPLY),
        Arc::new(MemoryVectorStore::new()),
    );

    let err = pipeline
        .search("anything", "nonexistent-dataset")
        .await
        .unwrap_err();
    assert!(err.is_unknown_dataset());
    assert_eq!(err.dataset, "nonexistent-dataset");
}

#[tokio::test]
async fn cognify_of_unknown_dataset_fails() {
    let llm = ScriptedLlm::new(EXTRACTION_REPLY);
    let pipeline = pipeline_with(llm.clone(), Arc::new(MemoryVectorStore::new()));

    let err = pipeline.cognify("never-added").await.unwrap_err();
    assert!(err.is_unknown_dataset());
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ingest_rejects_empty_text_and_bad_handles() {
    let pipeline = pipeline_with(
        ScriptedLlm::new(EXTRACTION_REPLY),
        Arc::new(MemoryVectorStore::new()),
    );

    let err = pipeline.add("   \n", "ds1").await.unwrap_err();
    assert!(matches!(err.source, PipelineError::EmptyDocument));

    let err = pipeline.add("text", "bad handle").await.unwrap_err();
    assert!(matches!(err.source, PipelineError::InvalidDataset(_)));
    assert!(pipeline.datasets().await.is_empty());
}

#[tokio::test]
async fn cognify_only_processes_new_documents() {
    let llm = ScriptedLlm::new(EXTRACTION_REPLY);
    let pipeline = pipeline_with(llm.clone(), Arc::new(MemoryVectorStore::new()));

    pipeline.add("MiniMax builds models.", "ds1").await.unwrap();
    pipeline.cognify("ds1").await.unwrap();
    let again = pipeline.cognify("ds1").await.unwrap();

    assert_eq!(again.documents, 0);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn llm_failure_surfaces_as_transform_error() {
    let pipeline = pipeline_with(Arc::new(RejectingLlm), Arc::new(MemoryVectorStore::new()));
    pipeline.add("MiniMax builds models.", "ds1").await.unwrap();

    let err = pipeline.cognify("ds1").await.unwrap_err();
    assert!(matches!(err.source, PipelineError::Api { status: 401, .. }));
    assert!(err.to_string().contains("ds1"));
}

#[tokio::test]
async fn prune_drops_owned_collections_only() {
    let vector = Arc::new(MemoryVectorStore::new());
    vector
        .create_collection(
            "test_cognee_collection",
            &kgprobe_pipeline::CollectionSpec::cosine("text", 4),
        )
        .await
        .unwrap();
    let pipeline = pipeline_with(ScriptedLlm::new(EXTRACTION_REPLY), vector.clone());

    pipeline.add("Qdrant stores vectors.", "ds1").await.unwrap();
    pipeline.cognify("ds1").await.unwrap();
    let summary = pipeline.prune().await.unwrap();

    assert_eq!(summary.datasets, 1);
    assert_eq!(summary.collections, 2);
    assert_eq!(
        vector.list_collections().await.unwrap(),
        vec!["test_cognee_collection".to_string()]
    );
    assert!(pipeline.search("Qdrant", "ds1").await.is_err());
}

#[tokio::test]
async fn dataset_from_an_earlier_run_is_adopted() {
    let vector = Arc::new(MemoryVectorStore::new());
    let first = pipeline_with(ScriptedLlm::new(EXTRACTION_REPLY), vector.clone());
    first
        .add("Memgraph is a graph database.", "shared")
        .await
        .unwrap();

    let second = pipeline_with(ScriptedLlm::new(EXTRACTION_REPLY), vector);
    let results = second.search("graph database", "shared").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "Memgraph is a graph database.");
    assert_eq!(second.datasets().await.len(), 1);
}
