use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{PipelineError, PipelineResult};

/// Prefix of every vector collection the pipeline owns.
pub const COLLECTION_PREFIX: &str = "kgprobe_";

/// Name of a logical collection of ingested documents.
///
/// Handles end up inside vector collection names, so they are restricted to
/// ASCII letters, digits, `_` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetHandle(String);

impl DatasetHandle {
    pub fn parse(raw: &str) -> PipelineResult<Self> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(PipelineError::InvalidDataset(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Vector collection holding the dataset's text chunks.
    pub fn chunks_collection(&self) -> String {
        format!("{COLLECTION_PREFIX}{}_chunks", self.0)
    }

    /// Vector collection holding the dataset's extracted entities.
    pub fn entities_collection(&self) -> String {
        format!("{COLLECTION_PREFIX}{}_entities", self.0)
    }
}

impl fmt::Display for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DatasetHandle {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DatasetHandle {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DatasetHandle> for String {
    fn from(value: DatasetHandle) -> Self {
        value.0
    }
}

/// Entity extracted from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

impl GraphNode {
    /// Text embedded for entity search.
    pub fn embedding_text(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.description)
        }
    }
}

/// Directed relation between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
}

/// An edge resolved to node names, as returned by neighbourhood lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub relation: String,
    pub target: String,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.source, self.relation, self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Chunk,
    Entity,
    Relation,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chunk => "chunk",
            Self::Entity => "entity",
            Self::Relation => "relation",
        }
    }
}

/// One search hit. Only its text rendering is meant for consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub kind: ResultKind,
    pub text: String,
    pub score: f32,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {:.3}] {}", self.kind.as_str(), self.score, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_handle_accepts_simple_names() {
        let handle = DatasetHandle::parse("test_minimax-2").unwrap();
        assert_eq!(handle.as_str(), "test_minimax-2");
        assert_eq!(handle.chunks_collection(), "kgprobe_test_minimax-2_chunks");
        assert_eq!(handle.entities_collection(), "kgprobe_test_minimax-2_entities");
    }

    #[test]
    fn dataset_handle_rejects_empty_and_odd_names() {
        assert!(DatasetHandle::parse("").is_err());
        assert!(DatasetHandle::parse("has space").is_err());
        assert!(DatasetHandle::parse("slash/name").is_err());
        assert!("ok".parse::<DatasetHandle>().is_ok());
    }

    #[test]
    fn search_result_renders_as_text() {
        let result = SearchResult {
            kind: ResultKind::Relation,
            text: "MiniMax --provides--> language models".to_string(),
            score: 0.5,
        };
        assert_eq!(
            result.to_string(),
            "[relation 0.500] MiniMax --provides--> language models"
        );
    }
}
