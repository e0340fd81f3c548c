//! Qdrant REST adapter.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{CollectionSpec, Distance, ScoredPoint, VectorPoint, VectorStore};
use crate::errors::{PipelineError, PipelineResult};

/// Header Qdrant Cloud reads the API key from.
pub const API_KEY_HEADER: &str = "api-key";

/// Qdrant client speaking the HTTP API (never gRPC).
#[derive(Debug, Clone)]
pub struct QdrantStore {
    base_url: String,
    client: reqwest::Client,
}

/// Qdrant wraps every payload in `{"result": ..., "status": ..., "time": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

impl QdrantStore {
    /// Build a client for `base_url`, sending `api_key` on every request when set.
    ///
    /// Fails if the key is not a valid header value or the client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, QdrantClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key).map_err(|_| QdrantClientError::InvalidApiKey)?;
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(QdrantClientError::Client)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> PipelineResult<T> {
        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PipelineError::CollectionNotFound(path.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            PipelineError::InvalidResponse(format!(
                "unexpected Qdrant response: {e}\nBody preview: {preview}"
            ))
        })?;
        Ok(envelope.result)
    }
}

/// Why a [`QdrantStore`] could not be constructed.
#[derive(Debug, thiserror::Error)]
pub enum QdrantClientError {
    #[error("API key is not a valid header value")]
    InvalidApiKey,
    #[error(transparent)]
    Client(reqwest::Error),
}

fn distance_name(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "Cosine",
    }
}

fn point_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn collection_path(name: &str) -> String {
    format!("/collections/{name}")
}

#[async_trait::async_trait]
impl VectorStore for QdrantStore {
    fn provider(&self) -> &str {
        "qdrant"
    }

    async fn list_collections(&self) -> PipelineResult<Vec<String>> {
        let result: CollectionsResult = self.call(Method::GET, "/collections", None).await?;
        Ok(result.collections.into_iter().map(|c| c.name).collect())
    }

    async fn collection_exists(&self, name: &str) -> PipelineResult<bool> {
        let path = format!("{}/exists", collection_path(name));
        let result: ExistsResult = self.call(Method::GET, &path, None).await?;
        Ok(result.exists)
    }

    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> PipelineResult<()> {
        let body = json!({
            "vectors": {
                spec.vector_name.as_str(): {
                    "size": spec.size,
                    "distance": distance_name(spec.distance),
                }
            }
        });
        let _: Value = self
            .call(Method::PUT, &collection_path(name), Some(body))
            .await?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> PipelineResult<()> {
        match self
            .call::<Value>(Method::DELETE, &collection_path(name), None)
            .await
        {
            Ok(_) | Err(PipelineError::CollectionNotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn upsert(
        &self,
        collection: &str,
        vector_name: &str,
        points: Vec<VectorPoint>,
    ) -> PipelineResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        let points: Vec<Value> = points
            .into_iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "vector": { vector_name: p.vector },
                    "payload": p.payload,
                })
            })
            .collect();
        let path = format!("{}/points?wait=true", collection_path(collection));
        let _: Value = self
            .call(Method::PUT, &path, Some(json!({ "points": points })))
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector_name: &str,
        query: &[f32],
        limit: usize,
    ) -> PipelineResult<Vec<ScoredPoint>> {
        let body = json!({
            "vector": { "name": vector_name, "vector": query },
            "limit": limit,
            "with_payload": true,
        });
        let path = format!("{}/points/search", collection_path(collection));
        let hits: Vec<SearchHit> = self.call(Method::POST, &path, Some(body)).await?;
        Ok(hits
            .into_iter()
            .map(|hit| ScoredPoint {
                id: point_id(&hit.id),
                score: hit.score,
                payload: hit.payload.unwrap_or(Value::Null),
            })
            .collect())
    }
}
