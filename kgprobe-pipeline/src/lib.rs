//! Knowledge pipeline exercised by the kgprobe harness: ingest text, build a
//! knowledge graph with an LLM, and answer questions over it.

pub mod chunker;
pub mod embeddings;
pub mod engine;
pub mod errors;
pub mod extract;
pub mod graph;
pub mod llm;
pub mod models;
pub mod registry;
pub mod vector;

pub use embeddings::{Embedder, EmbeddingClient, HashingEmbedder};
pub use engine::{CognifySummary, IngestReceipt, Pipeline, PipelineBuilder, PruneSummary};
pub use errors::{
    IngestError, PipelineError, PipelineResult, QueryError, RegistrationError, SetupError,
    TransformError,
};
pub use graph::{GraphStore, MemgraphStore, MemoryGraphStore, Neo4jStore};
pub use llm::{LlmClient, OpenAiCompatibleClient, chat_completions_url};
pub use models::{DatasetHandle, GraphEdge, GraphNode, Relation, ResultKind, SearchResult};
pub use registry::{
    BackendKind, BackendRegistry, BackendReport, RegistrationOutcome, register_backends,
};
pub use vector::{
    CollectionSpec, MemoryVectorStore, QdrantClientError, QdrantStore, ScoredPoint, VectorPoint,
    VectorStore,
};
