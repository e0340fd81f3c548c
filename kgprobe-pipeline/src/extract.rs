//! Entity/relation extraction: the prompt sent to the LLM and the parsing of
//! its reply into graph nodes and edges.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::{PipelineError, PipelineResult};
use crate::models::{GraphEdge, GraphNode};

pub const EXTRACTION_SYSTEM_PROMPT: &str = "You extract knowledge graphs from text. \
Reply with JSON only, no prose, using exactly this shape:\n\
{\"nodes\": [{\"id\": \"snake_case_id\", \"name\": \"Display Name\", \"type\": \"Category\", \"description\": \"one sentence\"}],\n\
 \"edges\": [{\"source\": \"node_id\", \"target\": \"node_id\", \"relation\": \"verb_phrase\"}]}\n\
Every edge must reference node ids from the nodes list.";

/// User prompt for one document.
pub fn extraction_prompt(text: &str) -> String {
    format!("Extract the entities and relations from this text:\n\n{text}")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    source: String,
    target: String,
    relation: String,
}

/// Lowercase snake-case id from free text.
pub fn normalize_id(raw: &str) -> String {
    let mut id = String::new();
    let mut pending_sep = false;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !id.is_empty() {
                id.push('_');
            }
            id.extend(c.to_lowercase());
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    id
}

/// Pull the JSON object out of an LLM reply (bare, fenced, or wrapped in prose).
fn json_slice(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Parse an extraction reply.
///
/// Node ids are normalised and deduplicated (first wins); edges whose
/// endpoints are not among the nodes are dropped.
pub fn parse_extraction(reply: &str) -> PipelineResult<ExtractedGraph> {
    let slice = json_slice(reply).ok_or_else(|| {
        let preview: String = reply.chars().take(200).collect();
        PipelineError::InvalidResponse(format!("no JSON object in extraction reply: {preview}"))
    })?;
    let raw: RawGraph = serde_json::from_str(slice).map_err(|e| {
        PipelineError::InvalidResponse(format!("extraction reply is not a graph: {e}"))
    })?;

    // Edges may reference nodes by id or by name
    let mut aliases: BTreeMap<String, String> = BTreeMap::new();
    let mut nodes: Vec<GraphNode> = Vec::new();
    for raw_node in raw.nodes {
        let name = raw_node.name.trim().to_string();
        let id = normalize_id(raw_node.id.as_deref().unwrap_or(&name));
        if id.is_empty() || nodes.iter().any(|n| n.id == id) {
            continue;
        }
        aliases.insert(normalize_id(&name), id.clone());
        aliases.insert(id.clone(), id.clone());
        nodes.push(GraphNode {
            id,
            name,
            kind: raw_node
                .kind
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| "Entity".to_string()),
            description: raw_node.description.unwrap_or_default().trim().to_string(),
        });
    }

    let mut edges: Vec<GraphEdge> = Vec::new();
    for raw_edge in raw.edges {
        let source = aliases.get(&normalize_id(&raw_edge.source));
        let target = aliases.get(&normalize_id(&raw_edge.target));
        let relation = normalize_id(&raw_edge.relation);
        if let (Some(source), Some(target)) = (source, target)
            && !relation.is_empty()
        {
            let edge = GraphEdge {
                source: source.clone(),
                target: target.clone(),
                relation,
            };
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
    }

    Ok(ExtractedGraph { nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_id_snake_cases() {
        assert_eq!(normalize_id("  Language Model Provider "), "language_model_provider");
        assert_eq!(normalize_id("MiniMax"), "minimax");
        assert_eq!(normalize_id("Qdrant--DB"), "qdrant_db");
        assert_eq!(normalize_id("!!"), "");
    }

    #[test]
    fn parses_fenced_reply_and_resolves_names() {
        let reply = r#"Here you go:
```json
{
  "nodes": [
    {"id": "MiniMax", "name": "MiniMax", "type": "Company", "description": "LLM vendor"},
    {"name": "Language Model", "type": "Concept"},
    {"id": "minimax", "name": "Duplicate"}
  ],
  "edges": [
    {"source": "minimax", "target": "Language Model", "relation": "provides"},
    {"source": "minimax", "target": "ghost", "relation": "haunts"}
  ]
}
```"#;
        let graph = parse_extraction(reply).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "minimax");
        assert_eq!(graph.nodes[0].kind, "Company");
        assert_eq!(graph.nodes[1].id, "language_model");
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].target, "language_model");
        assert_eq!(graph.edges[0].relation, "provides");
    }

    #[test]
    fn missing_type_defaults_to_entity() {
        let graph = parse_extraction(r#"{"nodes": [{"name": "Cognee"}]}"#).unwrap();
        assert_eq!(graph.nodes[0].kind, "Entity");
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn prose_only_reply_is_invalid() {
        let err = parse_extraction("I could not find anything.").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidResponse(_)));
    }
}
