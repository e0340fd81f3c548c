//! Graph adapter for Memgraph (and other Bolt servers) through `neo4rs`.
//!
//! The connection pool is opened on first use, so registering the adapter
//! never touches the network.

use neo4rs::{ConfigBuilder, Graph, Query};
use tokio::sync::OnceCell;
use tracing::debug;

use super::GraphStore;
use super::cypher::{
    ParamValue, Statement, delete_all_statement, edge_statements, neighbors_statement,
    node_statements,
};
use crate::errors::{PipelineError, PipelineResult};
use crate::models::{DatasetHandle, GraphEdge, GraphNode, Relation};

pub struct MemgraphStore {
    uri: String,
    username: String,
    password: String,
    database: Option<String>,
    graph: OnceCell<Graph>,
}

impl std::fmt::Debug for MemgraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemgraphStore")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("database", &self.database)
            .field("connected", &self.graph.initialized())
            .finish()
    }
}

fn graph_error(err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Graph(err.to_string())
}

fn to_query(statement: Statement) -> Query {
    statement
        .params
        .into_iter()
        .fold(neo4rs::query(statement.text), |query, (key, value)| match value {
            ParamValue::Text(text) => query.param(key, text),
            ParamValue::Int(number) => query.param(key, number),
        })
}

impl MemgraphStore {
    /// `uri` is a Bolt URL such as `bolt://localhost:7687`. Memgraph without
    /// authentication accepts empty credentials.
    pub fn new(
        uri: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
        database: Option<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            username: username.unwrap_or_default(),
            password: password.unwrap_or_default(),
            database,
            graph: OnceCell::new(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    async fn graph(&self) -> PipelineResult<&Graph> {
        self.graph
            .get_or_try_init(|| async {
                let mut builder = ConfigBuilder::default()
                    .uri(self.uri.as_str())
                    .user(self.username.as_str())
                    .password(self.password.as_str());
                if let Some(database) = &self.database {
                    builder = builder.db(database.as_str());
                }
                let config = builder.build().map_err(graph_error)?;
                debug!("Opening Bolt connection to {}", self.uri);
                Graph::connect(config).await.map_err(graph_error)
            })
            .await
    }

    async fn run_all(&self, statements: Vec<Statement>) -> PipelineResult<()> {
        if statements.is_empty() {
            return Ok(());
        }
        let graph = self.graph().await?;
        for statement in statements {
            graph.run(to_query(statement)).await.map_err(graph_error)?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl GraphStore for MemgraphStore {
    fn provider(&self) -> &str {
        "memgraph"
    }

    async fn add_nodes(&self, dataset: &DatasetHandle, nodes: &[GraphNode]) -> PipelineResult<()> {
        self.run_all(node_statements(dataset, nodes)).await
    }

    async fn add_edges(&self, dataset: &DatasetHandle, edges: &[GraphEdge]) -> PipelineResult<()> {
        self.run_all(edge_statements(dataset, edges)).await
    }

    async fn neighbors(
        &self,
        dataset: &DatasetHandle,
        node_id: &str,
        limit: usize,
    ) -> PipelineResult<Vec<Relation>> {
        let graph = self.graph().await?;
        let mut rows = graph
            .execute(to_query(neighbors_statement(dataset, node_id, limit)))
            .await
            .map_err(graph_error)?;

        let mut relations = Vec::new();
        while let Some(row) = rows.next().await.map_err(graph_error)? {
            relations.push(Relation {
                source: row.get::<String>("source").map_err(graph_error)?,
                relation: row.get::<String>("relation").map_err(graph_error)?,
                target: row.get::<String>("target").map_err(graph_error)?,
            });
        }
        Ok(relations)
    }

    async fn delete_all(&self) -> PipelineResult<()> {
        self.run_all(vec![delete_all_statement()]).await
    }
}
