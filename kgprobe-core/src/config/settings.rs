//! Settings configuration loaded from TOML files.
//!
//! Non-sensitive harness tuning stored at `~/.config/kgprobe/config.toml`.
//! Unlike connection values, nothing here is required: a missing file means
//! defaults everywhere.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

/// Env var overriding the settings directory.
pub const CONFIG_DIR_VAR: &str = "KGPROBE_CONFIG_DIR";

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings loaded from the TOML configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Named stage plan (`connection`, `llm`, `vector`, `full`).
    #[serde(default = "default_plan")]
    pub plan: String,

    /// Explicit stage list; overrides `plan` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<String>>,

    #[serde(default)]
    pub probe: ProbeSettings,

    #[serde(default)]
    pub vector: VectorSettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            plan: default_plan(),
            stages: None,
            probe: ProbeSettings::default(),
            vector: VectorSettings::default(),
            pipeline: PipelineSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// What the harness sends and how long it waits.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSettings {
    /// Per-request timeout for raw endpoint probes
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Dataset handle used by the pipeline stages
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Sample documents ingested one by one
    #[serde(default = "default_documents")]
    pub documents: Vec<String>,

    /// Question asked by the query stage
    #[serde(default = "default_question")]
    pub question: String,

    /// How many query results to show
    #[serde(default = "default_result_preview")]
    pub result_preview: usize,

    /// How much of a raw response body to show
    #[serde(default = "default_body_preview_chars")]
    pub body_preview_chars: usize,

    /// Prompt sent by the raw LLM probe
    #[serde(default = "default_llm_probe_prompt")]
    pub llm_probe_prompt: String,

    #[serde(default = "default_llm_probe_max_tokens")]
    pub llm_probe_max_tokens: u32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            dataset: default_dataset(),
            documents: default_documents(),
            question: default_question(),
            result_preview: default_result_preview(),
            body_preview_chars: default_body_preview_chars(),
            llm_probe_prompt: default_llm_probe_prompt(),
            llm_probe_max_tokens: default_llm_probe_max_tokens(),
        }
    }
}

/// Shape of the vector store test collection.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorSettings {
    #[serde(default = "default_test_collection")]
    pub test_collection: String,

    #[serde(default = "default_vector_name")]
    pub vector_name: String,

    #[serde(default = "default_vector_size")]
    pub vector_size: usize,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            test_collection: default_test_collection(),
            vector_name: default_vector_name(),
            vector_size: default_vector_size(),
        }
    }
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// Upper bound on a chunk's length in characters
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,

    /// Vector hits requested per collection
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Graph relations pulled in per matched entity
    #[serde(default = "default_graph_neighbors")]
    pub graph_neighbors: usize,

    #[serde(default = "default_llm_timeout_seconds")]
    pub llm_timeout_seconds: u64,

    #[serde(default = "default_extraction_max_tokens")]
    pub extraction_max_tokens: u32,

    /// Embedding width when `EMBEDDING_DIMENSIONS` is not set
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_max_chars: default_chunk_max_chars(),
            search_limit: default_search_limit(),
            graph_neighbors: default_graph_neighbors(),
            llm_timeout_seconds: default_llm_timeout_seconds(),
            extraction_max_tokens: default_extraction_max_tokens(),
            embedding_dimensions: default_embedding_dimensions(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_plan() -> String {
    "connection".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_dataset() -> String {
    "test_dataset".to_string()
}

fn default_documents() -> Vec<String> {
    vec![
        "Cognee is a knowledge engine for AI agents.".to_string(),
        "It connects to Qdrant for vector search.".to_string(),
        "It connects to Memgraph for knowledge graphs.".to_string(),
    ]
}

fn default_question() -> String {
    "What is Cognee?".to_string()
}

fn default_result_preview() -> usize {
    3
}

fn default_body_preview_chars() -> usize {
    200
}

fn default_llm_probe_prompt() -> String {
    "Reply with a single word: does it work?".to_string()
}

fn default_llm_probe_max_tokens() -> u32 {
    10
}

fn default_test_collection() -> String {
    "test_cognee_collection".to_string()
}

fn default_vector_name() -> String {
    "text".to_string()
}

fn default_vector_size() -> usize {
    1536
}

fn default_chunk_max_chars() -> usize {
    1000
}

fn default_search_limit() -> usize {
    5
}

fn default_graph_neighbors() -> usize {
    10
}

fn default_llm_timeout_seconds() -> u64 {
    120
}

fn default_extraction_max_tokens() -> u32 {
    2048
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from the TOML file, or defaults when it does not exist.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            tracing::debug!("No settings file at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Path to the settings file.
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(override_dir) = std::env::var(CONFIG_DIR_VAR) {
            let dir = PathBuf::from(override_dir);
            return Ok(dir.join("config.toml"));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("kgprobe");

        Ok(config_dir.join("config.toml"))
    }
}
