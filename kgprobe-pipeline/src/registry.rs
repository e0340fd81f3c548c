//! Explicit table of pluggable storage backends.
//!
//! The harness owns one registry per run and hands it to the pipeline, so
//! tests can register fakes under any name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use kgprobe_core::Config;
use kgprobe_core::ConfigurationError;
use tracing::{info, warn};

use crate::errors::RegistrationError;
use crate::graph::{GraphStore, MemgraphStore, MemoryGraphStore, Neo4jStore};
use crate::vector::{MemoryVectorStore, QdrantClientError, QdrantStore, VectorStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Vector,
    Graph,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector => f.write_str("vector"),
            Self::Graph => f.write_str("graph"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    /// The name was already taken; the existing backend is kept.
    AlreadyRegistered,
    /// The backend's endpoint is not configured, so nothing was registered.
    NotConfigured(&'static str),
    /// Another provider is selected; this adapter was not attempted.
    NotSelected(String),
}

#[derive(Clone, Default)]
pub struct BackendRegistry {
    vector: BTreeMap<String, Arc<dyn VectorStore>>,
    graph: BTreeMap<String, Arc<dyn GraphStore>>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("vector", &self.vector.keys().collect::<Vec<_>>())
            .field("graph", &self.graph.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn checked_name(name: &str) -> Result<String, RegistrationError> {
    let name = name.trim();
    if name.is_empty() {
        Err(RegistrationError::InvalidName)
    } else {
        Ok(name.to_ascii_lowercase())
    }
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the in-process `memory` backends.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .vector
            .insert("memory".to_string(), Arc::new(MemoryVectorStore::new()));
        registry
            .graph
            .insert("memory".to_string(), Arc::new(MemoryGraphStore::new()));
        registry
    }

    pub fn register_vector(
        &mut self,
        name: &str,
        store: Arc<dyn VectorStore>,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let name = checked_name(name)?;
        if self.vector.contains_key(&name) {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }
        self.vector.insert(name, store);
        Ok(RegistrationOutcome::Registered)
    }

    pub fn register_graph(
        &mut self,
        name: &str,
        store: Arc<dyn GraphStore>,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let name = checked_name(name)?;
        if self.graph.contains_key(&name) {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }
        self.graph.insert(name, store);
        Ok(RegistrationOutcome::Registered)
    }

    pub fn has(&self, kind: BackendKind, name: &str) -> bool {
        let name = name.trim().to_ascii_lowercase();
        match kind {
            BackendKind::Vector => self.vector.contains_key(&name),
            BackendKind::Graph => self.graph.contains_key(&name),
        }
    }

    pub fn vector(&self, name: &str) -> Result<Arc<dyn VectorStore>, RegistrationError> {
        let key = name.trim().to_ascii_lowercase();
        self.vector
            .get(&key)
            .cloned()
            .ok_or_else(|| RegistrationError::NotRegistered {
                kind: BackendKind::Vector,
                name: name.to_string(),
            })
    }

    pub fn graph(&self, name: &str) -> Result<Arc<dyn GraphStore>, RegistrationError> {
        let key = name.trim().to_ascii_lowercase();
        self.graph
            .get(&key)
            .cloned()
            .ok_or_else(|| RegistrationError::NotRegistered {
                kind: BackendKind::Graph,
                name: name.to_string(),
            })
    }

    pub fn names(&self, kind: BackendKind) -> Vec<&str> {
        match kind {
            BackendKind::Vector => self.vector.keys().map(String::as_str).collect(),
            BackendKind::Graph => self.graph.keys().map(String::as_str).collect(),
        }
    }
}

/// Result of registering one optional backend.
#[derive(Debug)]
pub struct BackendReport {
    pub kind: BackendKind,
    pub name: &'static str,
    pub result: Result<RegistrationOutcome, RegistrationError>,
}

/// Register the optional remote backends named by `config`.
///
/// Only adapters matching `VECTOR_DB_PROVIDER` / `GRAPH_DATABASE_PROVIDER`
/// are attempted. Each backend is attempted on its own: a failure is logged
/// and reported in its entry, and the remaining registrations still run.
/// Calling this twice leaves the registry unchanged the second time.
pub fn register_backends(config: &Config, registry: &mut BackendRegistry) -> Vec<BackendReport> {
    let reports = vec![
        BackendReport {
            kind: BackendKind::Vector,
            name: "qdrant",
            result: register_qdrant(config, registry),
        },
        BackendReport {
            kind: BackendKind::Graph,
            name: "neo4j",
            result: register_neo4j(config, registry),
        },
        BackendReport {
            kind: BackendKind::Graph,
            name: "memgraph",
            result: register_memgraph(config, registry),
        },
    ];

    for report in &reports {
        match &report.result {
            Ok(RegistrationOutcome::Registered) => {
                info!("{} adapter '{}' registered", report.kind, report.name)
            }
            Ok(RegistrationOutcome::AlreadyRegistered) => {
                info!("{} adapter '{}' already registered", report.kind, report.name)
            }
            Ok(RegistrationOutcome::NotConfigured(key)) => {
                info!(
                    "Skipping {} adapter '{}' - {} not set",
                    report.kind, report.name, key
                )
            }
            Ok(RegistrationOutcome::NotSelected(provider)) => {
                info!(
                    "Skipping {} adapter '{}' - provider '{}' selected",
                    report.kind, report.name, provider
                )
            }
            Err(err) => warn!(
                "Failed to register {} adapter '{}': {}",
                report.kind, report.name, err
            ),
        }
    }

    reports
}

/// `Some(outcome)` when `name` need not be built: taken already, or not the
/// selected provider.
fn precheck(
    registry: &BackendRegistry,
    kind: BackendKind,
    name: &str,
    selected: &str,
) -> Option<RegistrationOutcome> {
    if registry.has(kind, name) {
        Some(RegistrationOutcome::AlreadyRegistered)
    } else if !selected.trim().eq_ignore_ascii_case(name) {
        Some(RegistrationOutcome::NotSelected(selected.trim().to_ascii_lowercase()))
    } else {
        None
    }
}

fn graph_credentials(config: &Config, name: &str) -> Result<(), RegistrationError> {
    let connection = &config.connection;
    if connection.graph_database_password.is_some() && connection.graph_database_username.is_none()
    {
        return Err(RegistrationError::InvalidCredentials {
            kind: BackendKind::Graph,
            name: name.to_string(),
            reason: "password set without GRAPH_DATABASE_USERNAME".to_string(),
        });
    }
    Ok(())
}

fn register_qdrant(
    config: &Config,
    registry: &mut BackendRegistry,
) -> Result<RegistrationOutcome, RegistrationError> {
    let connection = &config.connection;
    if let Some(outcome) = precheck(
        registry,
        BackendKind::Vector,
        "qdrant",
        connection.vector_provider(),
    ) {
        return Ok(outcome);
    }
    let url = match connection.vector_endpoint() {
        Ok(url) => url,
        Err(ConfigurationError::MissingValue(key)) => {
            return Ok(RegistrationOutcome::NotConfigured(key));
        }
        Err(source) => {
            return Err(RegistrationError::Configuration {
                kind: BackendKind::Vector,
                name: "qdrant".to_string(),
                source,
            });
        }
    };

    let store = QdrantStore::new(
        url.as_str(),
        connection.vector_db_key.as_deref(),
        config.probe_timeout(),
    )
    .map_err(|err| match err {
        QdrantClientError::InvalidApiKey => RegistrationError::InvalidCredentials {
            kind: BackendKind::Vector,
            name: "qdrant".to_string(),
            reason: err.to_string(),
        },
        QdrantClientError::Client(source) => RegistrationError::Client {
            kind: BackendKind::Vector,
            name: "qdrant".to_string(),
            source,
        },
    })?;
    registry.register_vector("qdrant", Arc::new(store))
}

fn register_neo4j(
    config: &Config,
    registry: &mut BackendRegistry,
) -> Result<RegistrationOutcome, RegistrationError> {
    let connection = &config.connection;
    if let Some(outcome) = precheck(
        registry,
        BackendKind::Graph,
        "neo4j",
        connection.graph_provider(),
    ) {
        return Ok(outcome);
    }
    let url = match connection.graph_endpoint() {
        Ok(url) => url,
        Err(ConfigurationError::MissingValue(key)) => {
            return Ok(RegistrationOutcome::NotConfigured(key));
        }
        Err(source) => {
            return Err(RegistrationError::Configuration {
                kind: BackendKind::Graph,
                name: "neo4j".to_string(),
                source,
            });
        }
    };
    graph_credentials(config, "neo4j")?;

    let store = Neo4jStore::new(
        url.as_str(),
        connection.graph_database_name.as_deref().unwrap_or("neo4j"),
        connection.graph_database_username.clone(),
        connection.graph_database_password.clone(),
        config.probe_timeout(),
    )
    .map_err(|source| RegistrationError::Client {
        kind: BackendKind::Graph,
        name: "neo4j".to_string(),
        source,
    })?;
    registry.register_graph("neo4j", Arc::new(store))
}

fn register_memgraph(
    config: &Config,
    registry: &mut BackendRegistry,
) -> Result<RegistrationOutcome, RegistrationError> {
    let connection = &config.connection;
    if let Some(outcome) = precheck(
        registry,
        BackendKind::Graph,
        "memgraph",
        connection.graph_provider(),
    ) {
        return Ok(outcome);
    }
    let url = match connection.graph_bolt_endpoint() {
        Ok(url) => url,
        Err(ConfigurationError::MissingValue(key)) => {
            return Ok(RegistrationOutcome::NotConfigured(key));
        }
        Err(source) => {
            return Err(RegistrationError::Configuration {
                kind: BackendKind::Graph,
                name: "memgraph".to_string(),
                source,
            });
        }
    };
    graph_credentials(config, "memgraph")?;

    let store = MemgraphStore::new(
        url.as_str(),
        connection.graph_database_username.clone(),
        connection.graph_database_password.clone(),
        connection.graph_database_name.clone(),
    );
    registry.register_graph("memgraph", Arc::new(store))
}
