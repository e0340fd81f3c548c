use kgprobe_core::ConfigurationError;

use crate::registry::BackendKind;

/// Low-level failures from backends, the LLM, or the pipeline's own checks.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),
    #[error("invalid dataset handle '{0}': use letters, digits, '_' or '-'")]
    InvalidDataset(String),
    #[error("document is empty")]
    EmptyDocument,
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("graph store error: {0}")]
    Graph(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// An optional backend could not be registered or resolved.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("backend name must not be empty")]
    InvalidName,
    #[error("{kind} backend '{name}' is misconfigured: {source}")]
    Configuration {
        kind: BackendKind,
        name: String,
        #[source]
        source: ConfigurationError,
    },
    #[error("{kind} backend '{name}' rejected its credentials: {reason}")]
    InvalidCredentials {
        kind: BackendKind,
        name: String,
        reason: String,
    },
    #[error("{kind} backend '{name}' could not build an HTTP client: {source}")]
    Client {
        kind: BackendKind,
        name: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("no {kind} backend registered under '{name}'")]
    NotRegistered { kind: BackendKind, name: String },
}

/// Building a [`crate::Pipeline`] from configuration failed.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("failed to build LLM client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("ingest into dataset '{dataset}' failed: {source}")]
pub struct IngestError {
    pub dataset: String,
    #[source]
    pub source: PipelineError,
}

#[derive(Debug, thiserror::Error)]
#[error("cognify of dataset '{dataset}' failed: {source}")]
pub struct TransformError {
    pub dataset: String,
    #[source]
    pub source: PipelineError,
}

#[derive(Debug, thiserror::Error)]
#[error("search in dataset '{dataset}' failed: {source}")]
pub struct QueryError {
    pub dataset: String,
    #[source]
    pub source: PipelineError,
}

impl IngestError {
    pub(crate) fn new(dataset: impl Into<String>, source: PipelineError) -> Self {
        Self {
            dataset: dataset.into(),
            source,
        }
    }
}

impl TransformError {
    pub(crate) fn new(dataset: impl Into<String>, source: PipelineError) -> Self {
        Self {
            dataset: dataset.into(),
            source,
        }
    }

    /// Whether the dataset had never been ingested.
    pub fn is_unknown_dataset(&self) -> bool {
        matches!(self.source, PipelineError::UnknownDataset(_))
    }
}

impl QueryError {
    pub(crate) fn new(dataset: impl Into<String>, source: PipelineError) -> Self {
        Self {
            dataset: dataset.into(),
            source,
        }
    }

    /// Whether the dataset had never been ingested.
    pub fn is_unknown_dataset(&self) -> bool {
        matches!(self.source, PipelineError::UnknownDataset(_))
    }
}
