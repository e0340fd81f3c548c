//! Connection settings loaded from environment variables only.
//!
//! Every value is optional at load time. Absent values are kept as `None`
//! and printed as such; stages that need a value validate it when they run.

use std::env;

use url::Url;

use super::ConfigurationError;

pub const VECTOR_DB_URL: &str = "VECTOR_DB_URL";
pub const VECTOR_DB_KEY: &str = "VECTOR_DB_KEY";
pub const VECTOR_DB_PROVIDER: &str = "VECTOR_DB_PROVIDER";
pub const GRAPH_DATABASE_URL: &str = "GRAPH_DATABASE_URL";
pub const GRAPH_DATABASE_PROVIDER: &str = "GRAPH_DATABASE_PROVIDER";
pub const GRAPH_DATABASE_USERNAME: &str = "GRAPH_DATABASE_USERNAME";
pub const GRAPH_DATABASE_PASSWORD: &str = "GRAPH_DATABASE_PASSWORD";
pub const GRAPH_DATABASE_NAME: &str = "GRAPH_DATABASE_NAME";
pub const LLM_PROVIDER: &str = "LLM_PROVIDER";
pub const LLM_MODEL: &str = "LLM_MODEL";
pub const LLM_ENDPOINT: &str = "LLM_ENDPOINT";
pub const LLM_API_KEY: &str = "LLM_API_KEY";
pub const EMBEDDING_ENDPOINT: &str = "EMBEDDING_ENDPOINT";
pub const EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
pub const EMBEDDING_API_KEY: &str = "EMBEDDING_API_KEY";
pub const EMBEDDING_DIMENSIONS: &str = "EMBEDDING_DIMENSIONS";

const BOLT_SCHEMES: [&str; 6] = ["bolt", "bolt+s", "bolt+ssc", "neo4j", "neo4j+s", "neo4j+ssc"];

/// Marker printed in place of an unset value.
pub const ABSENT: &str = "None";

/// Connection values for the LLM, vector store and graph store.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub vector_db_url: Option<String>,
    pub vector_db_key: Option<String>,
    pub vector_db_provider: Option<String>,
    pub graph_database_url: Option<String>,
    pub graph_database_provider: Option<String>,
    pub graph_database_username: Option<String>,
    pub graph_database_password: Option<String>,
    pub graph_database_name: Option<String>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub llm_endpoint: Option<String>,
    pub llm_api_key: Option<String>,
    pub embedding_endpoint: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_dimensions: Option<String>,
}

/// One displayable configuration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEntry<'a> {
    pub key: &'static str,
    pub value: Option<&'a str>,
    pub secret: bool,
}

impl ConnectionEntry<'_> {
    /// Render the value for diagnostics: masked when secret, `None` when absent.
    pub fn display_value(&self) -> String {
        match self.value {
            None => ABSENT.to_string(),
            Some(value) if self.secret => mask_secret(value),
            Some(value) => value.to_string(),
        }
    }
}

/// Mask a secret as its first 10 and last 5 characters.
///
/// Values too short to keep any characters hidden are fully starred.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 15 {
        return "*".repeat(chars.len().max(3));
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{head}...{tail}")
}

impl Connection {
    /// Read every recognized key from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read every recognized key through `lookup`. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            vector_db_url: get(VECTOR_DB_URL),
            vector_db_key: get(VECTOR_DB_KEY),
            vector_db_provider: get(VECTOR_DB_PROVIDER),
            graph_database_url: get(GRAPH_DATABASE_URL),
            graph_database_provider: get(GRAPH_DATABASE_PROVIDER),
            graph_database_username: get(GRAPH_DATABASE_USERNAME),
            graph_database_password: get(GRAPH_DATABASE_PASSWORD),
            graph_database_name: get(GRAPH_DATABASE_NAME),
            llm_provider: get(LLM_PROVIDER),
            llm_model: get(LLM_MODEL),
            llm_endpoint: get(LLM_ENDPOINT),
            llm_api_key: get(LLM_API_KEY),
            embedding_endpoint: get(EMBEDDING_ENDPOINT),
            embedding_model: get(EMBEDDING_MODEL),
            embedding_api_key: get(EMBEDDING_API_KEY),
            embedding_dimensions: get(EMBEDDING_DIMENSIONS),
        }
    }

    /// All recognized keys in display order.
    pub fn entries(&self) -> Vec<ConnectionEntry<'_>> {
        vec![
            entry(VECTOR_DB_PROVIDER, &self.vector_db_provider, false),
            entry(VECTOR_DB_URL, &self.vector_db_url, false),
            entry(VECTOR_DB_KEY, &self.vector_db_key, true),
            entry(GRAPH_DATABASE_PROVIDER, &self.graph_database_provider, false),
            entry(GRAPH_DATABASE_URL, &self.graph_database_url, false),
            entry(GRAPH_DATABASE_USERNAME, &self.graph_database_username, false),
            entry(GRAPH_DATABASE_PASSWORD, &self.graph_database_password, true),
            entry(GRAPH_DATABASE_NAME, &self.graph_database_name, false),
            entry(LLM_PROVIDER, &self.llm_provider, false),
            entry(LLM_MODEL, &self.llm_model, false),
            entry(LLM_ENDPOINT, &self.llm_endpoint, false),
            entry(LLM_API_KEY, &self.llm_api_key, true),
            entry(EMBEDDING_ENDPOINT, &self.embedding_endpoint, false),
            entry(EMBEDDING_MODEL, &self.embedding_model, false),
            entry(EMBEDDING_API_KEY, &self.embedding_api_key, true),
            entry(EMBEDDING_DIMENSIONS, &self.embedding_dimensions, false),
        ]
    }

    /// Vector provider name, defaulting to the in-process store.
    pub fn vector_provider(&self) -> &str {
        self.vector_db_provider.as_deref().unwrap_or("memory")
    }

    /// Graph provider name, defaulting to the in-process store.
    pub fn graph_provider(&self) -> &str {
        self.graph_database_provider.as_deref().unwrap_or("memory")
    }

    /// The LLM model, required by anything that talks to the LLM.
    pub fn require_llm_model(&self) -> Result<&str, ConfigurationError> {
        self.llm_model
            .as_deref()
            .ok_or(ConfigurationError::MissingValue(LLM_MODEL))
    }

    /// Validated LLM base endpoint.
    pub fn llm_endpoint_url(&self) -> Result<Url, ConfigurationError> {
        parse_http_url(LLM_ENDPOINT, self.llm_endpoint.as_deref())
    }

    /// Validated vector store base URL.
    pub fn vector_endpoint(&self) -> Result<Url, ConfigurationError> {
        parse_http_url(VECTOR_DB_URL, self.vector_db_url.as_deref())
    }

    /// Validated graph store base URL.
    pub fn graph_endpoint(&self) -> Result<Url, ConfigurationError> {
        parse_http_url(GRAPH_DATABASE_URL, self.graph_database_url.as_deref())
    }

    /// Validated Bolt URL of the graph store, for Bolt-only providers.
    pub fn graph_bolt_endpoint(&self) -> Result<Url, ConfigurationError> {
        let raw = self
            .graph_database_url
            .as_deref()
            .ok_or(ConfigurationError::MissingValue(GRAPH_DATABASE_URL))?;
        let url = Url::parse(raw).map_err(|err| ConfigurationError::InvalidValue {
            key: GRAPH_DATABASE_URL,
            reason: err.to_string(),
        })?;
        if BOLT_SCHEMES.contains(&url.scheme()) {
            Ok(url)
        } else {
            Err(ConfigurationError::InvalidValue {
                key: GRAPH_DATABASE_URL,
                reason: format!("unsupported scheme '{}' for a Bolt server", url.scheme()),
            })
        }
    }

    /// Embedding endpoint, falling back to the LLM endpoint.
    pub fn embedding_endpoint_url(&self) -> Result<Url, ConfigurationError> {
        match self.embedding_endpoint.as_deref() {
            Some(value) => parse_http_url(EMBEDDING_ENDPOINT, Some(value)),
            None => self.llm_endpoint_url(),
        }
    }

    /// Embedding API key, falling back to the LLM key.
    pub fn embedding_key(&self) -> Option<&str> {
        self.embedding_api_key
            .as_deref()
            .or(self.llm_api_key.as_deref())
    }

    /// Parsed `EMBEDDING_DIMENSIONS`, if set.
    pub fn embedding_dimensions(&self) -> Result<Option<usize>, ConfigurationError> {
        let Some(raw) = self.embedding_dimensions.as_deref() else {
            return Ok(None);
        };
        match raw.parse::<usize>() {
            Ok(0) => Err(ConfigurationError::InvalidValue {
                key: EMBEDDING_DIMENSIONS,
                reason: "must be greater than zero".to_string(),
            }),
            Ok(dims) => Ok(Some(dims)),
            Err(err) => Err(ConfigurationError::InvalidValue {
                key: EMBEDDING_DIMENSIONS,
                reason: err.to_string(),
            }),
        }
    }
}

fn entry<'a>(key: &'static str, value: &'a Option<String>, secret: bool) -> ConnectionEntry<'a> {
    ConnectionEntry {
        key,
        value: value.as_deref(),
        secret,
    }
}

fn parse_http_url(key: &'static str, value: Option<&str>) -> Result<Url, ConfigurationError> {
    let raw = value.ok_or(ConfigurationError::MissingValue(key))?;
    let url = Url::parse(raw).map_err(|err| ConfigurationError::InvalidValue {
        key,
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigurationError::InvalidValue {
            key,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
