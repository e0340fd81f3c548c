//! Graph adapter for the Neo4j HTTP transactional endpoint.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};

use super::GraphStore;
use super::cypher::{DELETE_ALL, NEIGHBORS, UPSERT_EDGES, UPSERT_NODES};
use crate::errors::{PipelineError, PipelineResult};
use crate::models::{DatasetHandle, GraphEdge, GraphNode, Relation};

#[derive(Debug, Clone)]
pub struct Neo4jStore {
    commit_url: String,
    username: Option<String>,
    password: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl Neo4jStore {
    pub fn new(
        base_url: &str,
        database: &str,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            commit_url: format!(
                "{}/db/{}/tx/commit",
                base_url.trim_end_matches('/'),
                database
            ),
            username,
            password,
            client,
        })
    }

    pub fn commit_url(&self) -> &str {
        &self.commit_url
    }

    async fn run(&self, statement: &str, parameters: Value) -> PipelineResult<Vec<TxRow>> {
        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });
        let mut request = self.client.post(&self.commit_url).json(&body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: TxResponse = response.json().await?;
        if let Some(error) = payload.errors.first() {
            return Err(PipelineError::Graph(format!(
                "{}: {}",
                error.code, error.message
            )));
        }
        Ok(payload
            .results
            .into_iter()
            .flat_map(|result| result.data)
            .collect())
    }
}

fn row_string(row: &[Value], index: usize) -> String {
    row.get(index)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait::async_trait]
impl GraphStore for Neo4jStore {
    fn provider(&self) -> &str {
        "neo4j"
    }

    async fn add_nodes(&self, dataset: &DatasetHandle, nodes: &[GraphNode]) -> PipelineResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.run(
            UPSERT_NODES,
            json!({ "dataset": dataset.as_str(), "nodes": nodes }),
        )
        .await?;
        Ok(())
    }

    async fn add_edges(&self, dataset: &DatasetHandle, edges: &[GraphEdge]) -> PipelineResult<()> {
        if edges.is_empty() {
            return Ok(());
        }
        self.run(
            UPSERT_EDGES,
            json!({ "dataset": dataset.as_str(), "edges": edges }),
        )
        .await?;
        Ok(())
    }

    async fn neighbors(
        &self,
        dataset: &DatasetHandle,
        node_id: &str,
        limit: usize,
    ) -> PipelineResult<Vec<Relation>> {
        let rows = self
            .run(
                NEIGHBORS,
                json!({ "dataset": dataset.as_str(), "id": node_id, "limit": limit }),
            )
            .await?;
        Ok(rows
            .iter()
            .map(|r| Relation {
                source: row_string(&r.row, 0),
                relation: row_string(&r.row, 1),
                target: row_string(&r.row, 2),
            })
            .collect())
    }

    async fn delete_all(&self) -> PipelineResult<()> {
        self.run(DELETE_ALL, json!({})).await?;
        Ok(())
    }
}
