use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kgprobe_core::{Config, PipelineSettings};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::embeddings::{Embedder, EmbeddingClient, HashingEmbedder};
use crate::errors::{
    IngestError, PipelineError, PipelineResult, QueryError, SetupError, TransformError,
};
use crate::graph::{GraphStore, MemoryGraphStore};
use crate::llm::{LlmClient, OpenAiCompatibleClient};
use crate::models::{COLLECTION_PREFIX, DatasetHandle, SearchResult};
use crate::registry::BackendRegistry;
use crate::vector::{CollectionSpec, MemoryVectorStore, VectorStore};

pub(crate) mod cognify;
pub(crate) mod ingest;
pub(crate) mod search;

/// Named vector every pipeline collection stores its embeddings under.
pub const VECTOR_NAME: &str = "text";

#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub id: Uuid,
    pub text: String,
    pub ingested_at: DateTime<Utc>,
    pub cognified: bool,
}

#[derive(Debug, Default)]
pub(crate) struct DatasetEntry {
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    pub dataset: DatasetHandle,
    pub document_id: Uuid,
    pub chunks: usize,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CognifySummary {
    pub documents: usize,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneSummary {
    pub collections: usize,
    pub datasets: usize,
}

/// The ingest → cognify → search pipeline over one vector store, one graph
/// store, an LLM and an embedder.
pub struct Pipeline {
    vector: Arc<dyn VectorStore>,
    graph: Arc<dyn GraphStore>,
    llm: Arc<dyn LlmClient>,
    embedder: Arc<dyn Embedder>,
    settings: PipelineSettings,
    catalog: Mutex<BTreeMap<DatasetHandle, DatasetEntry>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("vector", &self.vector.provider())
            .field("graph", &self.graph.provider())
            .field("llm", &self.llm.model())
            .field("dimensions", &self.embedder.dimensions())
            .finish()
    }
}

/// Assembles a [`Pipeline`] from explicit parts; anything not set falls
/// back to the in-process backends and the hashing embedder.
pub struct PipelineBuilder {
    llm: Arc<dyn LlmClient>,
    vector: Option<Arc<dyn VectorStore>>,
    graph: Option<Arc<dyn GraphStore>>,
    embedder: Option<Arc<dyn Embedder>>,
    settings: PipelineSettings,
}

impl PipelineBuilder {
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector = Some(store);
        self
    }

    pub fn graph_store(mut self, store: Arc<dyn GraphStore>) -> Self {
        self.graph = Some(store);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Pipeline {
        let embedder = self
            .embedder
            .unwrap_or_else(|| Arc::new(HashingEmbedder::new(self.settings.embedding_dimensions)));
        Pipeline {
            vector: self
                .vector
                .unwrap_or_else(|| Arc::new(MemoryVectorStore::new())),
            graph: self.graph.unwrap_or_else(|| Arc::new(MemoryGraphStore::new())),
            llm: self.llm,
            embedder,
            settings: self.settings,
            catalog: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Pipeline {
    pub fn builder(llm: Arc<dyn LlmClient>) -> PipelineBuilder {
        PipelineBuilder {
            llm,
            vector: None,
            graph: None,
            embedder: None,
            settings: PipelineSettings::default(),
        }
    }

    /// Build the pipeline named by `config`, resolving the selected vector
    /// and graph providers from `registry`.
    pub fn from_config(config: &Config, registry: &BackendRegistry) -> Result<Self, SetupError> {
        let connection = &config.connection;
        let settings = config.settings.pipeline.clone();
        let timeout = Duration::from_secs(settings.llm_timeout_seconds);

        let vector = registry.vector(connection.vector_provider())?;
        let graph = registry.graph(connection.graph_provider())?;

        let endpoint = connection.llm_endpoint_url()?;
        let model = connection.require_llm_model()?;
        let llm = OpenAiCompatibleClient::new(
            endpoint.as_str(),
            connection.llm_api_key.clone(),
            model,
            timeout,
        )?;

        let explicit_dimensions = connection.embedding_dimensions()?;
        let dimensions = explicit_dimensions.unwrap_or(settings.embedding_dimensions);
        let embedder: Arc<dyn Embedder> = match connection.embedding_model.as_deref() {
            Some(embedding_model) => {
                let url = connection.embedding_endpoint_url()?;
                let client = EmbeddingClient::new(
                    url.as_str(),
                    connection.embedding_key(),
                    embedding_model,
                    dimensions,
                    timeout,
                )?;
                match explicit_dimensions {
                    Some(_) => Arc::new(client.request_dimensions()),
                    None => Arc::new(client),
                }
            }
            None => Arc::new(HashingEmbedder::new(dimensions)),
        };

        info!(
            "Pipeline ready: vector={} graph={} llm={} embedding_dimensions={}",
            vector.provider(),
            graph.provider(),
            model,
            dimensions
        );

        Ok(Self::builder(Arc::new(llm))
            .vector_store(vector)
            .graph_store(graph)
            .embedder(embedder)
            .settings(settings)
            .build())
    }

    pub(crate) fn vector(&self) -> &dyn VectorStore {
        self.vector.as_ref()
    }

    pub(crate) fn graph(&self) -> &dyn GraphStore {
        self.graph.as_ref()
    }

    pub(crate) fn llm(&self) -> &dyn LlmClient {
        self.llm.as_ref()
    }

    pub(crate) fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub(crate) fn catalog(&self) -> &Mutex<BTreeMap<DatasetHandle, DatasetEntry>> {
        &self.catalog
    }

    /// Submit one document into `dataset`.
    pub async fn add(&self, text: &str, dataset: &str) -> Result<IngestReceipt, IngestError> {
        let handle = DatasetHandle::parse(dataset).map_err(|e| IngestError::new(dataset, e))?;
        ingest::add_document(self, text, &handle)
            .await
            .map_err(|e| IngestError::new(dataset, e))
    }

    /// Build the knowledge graph for every document of `dataset` not yet
    /// processed.
    pub async fn cognify(&self, dataset: &str) -> Result<CognifySummary, TransformError> {
        let handle = DatasetHandle::parse(dataset).map_err(|e| TransformError::new(dataset, e))?;
        cognify::cognify_dataset(self, &handle)
            .await
            .map_err(|e| TransformError::new(dataset, e))
    }

    /// Answer `question` from the chunks, entities and relations of `dataset`.
    pub async fn search(
        &self,
        question: &str,
        dataset: &str,
    ) -> Result<Vec<SearchResult>, QueryError> {
        let handle = DatasetHandle::parse(dataset).map_err(|e| QueryError::new(dataset, e))?;
        search::search_dataset(self, question, &handle)
            .await
            .map_err(|e| QueryError::new(dataset, e))
    }

    /// Drop every dataset: owned vector collections, the graph and the catalog.
    pub async fn prune(&self) -> PipelineResult<PruneSummary> {
        let owned: Vec<String> = self
            .vector
            .list_collections()
            .await?
            .into_iter()
            .filter(|name| name.starts_with(COLLECTION_PREFIX))
            .collect();
        for name in &owned {
            self.vector.delete_collection(name).await?;
        }
        self.graph.delete_all().await?;

        let datasets = {
            let mut catalog = self.catalog.lock().await;
            let count = catalog.len();
            catalog.clear();
            count
        };

        info!(
            "Pruned {} datasets and {} collections",
            datasets,
            owned.len()
        );
        Ok(PruneSummary {
            collections: owned.len(),
            datasets,
        })
    }

    /// Datasets ingested through this pipeline.
    pub async fn datasets(&self) -> Vec<DatasetHandle> {
        self.catalog.lock().await.keys().cloned().collect()
    }

    /// Make sure `dataset` is known, adopting it from the vector store when
    /// its chunk collection survives from an earlier run.
    pub(crate) async fn ensure_known(&self, dataset: &DatasetHandle) -> PipelineResult<()> {
        if self.catalog.lock().await.contains_key(dataset) {
            return Ok(());
        }
        if self
            .vector
            .collection_exists(&dataset.chunks_collection())
            .await?
        {
            info!("Adopting dataset '{}' from the vector store", dataset);
            self.catalog
                .lock()
                .await
                .entry(dataset.clone())
                .or_default();
            return Ok(());
        }
        Err(PipelineError::UnknownDataset(dataset.to_string()))
    }

    pub(crate) async fn ensure_collection(&self, name: &str) -> PipelineResult<()> {
        if !self.vector.collection_exists(name).await? {
            let spec = CollectionSpec::cosine(VECTOR_NAME, self.embedder.dimensions());
            self.vector.create_collection(name, &spec).await?;
        }
        Ok(())
    }
}
