//! Cypher shared by the graph adapters.
//!
//! Entities are `:Entity` nodes keyed by `(id, dataset)`; relations are
//! `:RELATES` edges carrying the relation name.

use crate::models::{DatasetHandle, GraphEdge, GraphNode};

/// Batch node upsert over a `$nodes` list parameter.
pub(crate) const UPSERT_NODES: &str = "UNWIND $nodes AS n \
    MERGE (e:Entity {id: n.id, dataset: $dataset}) \
    SET e.name = n.name, e.kind = n.kind, e.description = n.description";

/// Batch edge upsert over an `$edges` list parameter.
pub(crate) const UPSERT_EDGES: &str = "UNWIND $edges AS r \
    MATCH (a:Entity {id: r.source, dataset: $dataset}) \
    MATCH (b:Entity {id: r.target, dataset: $dataset}) \
    MERGE (a)-[:RELATES {relation: r.relation}]->(b)";

/// Single node upsert with scalar parameters.
pub(crate) const MERGE_NODE: &str = "MERGE (e:Entity {id: $id, dataset: $dataset}) \
    SET e.name = $name, e.kind = $kind, e.description = $description";

/// Single edge upsert with scalar parameters.
pub(crate) const MERGE_EDGE: &str = "MATCH (a:Entity {id: $source, dataset: $dataset}) \
    MATCH (b:Entity {id: $target, dataset: $dataset}) \
    MERGE (a)-[:RELATES {relation: $relation}]->(b)";

pub(crate) const NEIGHBORS: &str = "MATCH (a:Entity {id: $id, dataset: $dataset})-[r:RELATES]-(:Entity) \
    RETURN startNode(r).name AS source, r.relation AS relation, endNode(r).name AS target \
    LIMIT $limit";

pub(crate) const DELETE_ALL: &str = "MATCH (e:Entity) DETACH DELETE e";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParamValue {
    Text(String),
    Int(i64),
}

/// One Cypher statement with scalar parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    pub text: &'static str,
    pub params: Vec<(&'static str, ParamValue)>,
}

impl Statement {
    fn new(text: &'static str) -> Self {
        Self {
            text,
            params: Vec::new(),
        }
    }

    fn text(mut self, key: &'static str, value: &str) -> Self {
        self.params.push((key, ParamValue::Text(value.to_string())));
        self
    }

    fn int(mut self, key: &'static str, value: i64) -> Self {
        self.params.push((key, ParamValue::Int(value)));
        self
    }
}

pub(crate) fn node_statements(dataset: &DatasetHandle, nodes: &[GraphNode]) -> Vec<Statement> {
    nodes
        .iter()
        .map(|node| {
            Statement::new(MERGE_NODE)
                .text("dataset", dataset.as_str())
                .text("id", &node.id)
                .text("name", &node.name)
                .text("kind", &node.kind)
                .text("description", &node.description)
        })
        .collect()
}

pub(crate) fn edge_statements(dataset: &DatasetHandle, edges: &[GraphEdge]) -> Vec<Statement> {
    edges
        .iter()
        .map(|edge| {
            Statement::new(MERGE_EDGE)
                .text("dataset", dataset.as_str())
                .text("source", &edge.source)
                .text("target", &edge.target)
                .text("relation", &edge.relation)
        })
        .collect()
}

pub(crate) fn neighbors_statement(dataset: &DatasetHandle, node_id: &str, limit: usize) -> Statement {
    Statement::new(NEIGHBORS)
        .text("dataset", dataset.as_str())
        .text("id", node_id)
        .int("limit", i64::try_from(limit).unwrap_or(i64::MAX))
}

pub(crate) fn delete_all_statement() -> Statement {
    Statement::new(DELETE_ALL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_statement_binds_every_property() {
        let ds = DatasetHandle::parse("ds1").unwrap();
        let statements = node_statements(
            &ds,
            &[GraphNode {
                id: "minimax".to_string(),
                name: "MiniMax".to_string(),
                kind: "Company".to_string(),
                description: "model provider".to_string(),
            }],
        );

        assert_eq!(
            statements,
            vec![Statement {
                text: MERGE_NODE,
                params: vec![
                    ("dataset", ParamValue::Text("ds1".to_string())),
                    ("id", ParamValue::Text("minimax".to_string())),
                    ("name", ParamValue::Text("MiniMax".to_string())),
                    ("kind", ParamValue::Text("Company".to_string())),
                    ("description", ParamValue::Text("model provider".to_string())),
                ],
            }]
        );
    }

    #[test]
    fn edge_and_neighbor_statements() {
        let ds = DatasetHandle::parse("ds1").unwrap();
        let edges = edge_statements(
            &ds,
            &[
                GraphEdge {
                    source: "minimax".to_string(),
                    target: "llm".to_string(),
                    relation: "provides".to_string(),
                },
                GraphEdge {
                    source: "minimax".to_string(),
                    target: "china".to_string(),
                    relation: "based_in".to_string(),
                },
            ],
        );
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].text, MERGE_EDGE);
        assert!(edges[1]
            .params
            .contains(&("relation", ParamValue::Text("based_in".to_string()))));

        let neighbors = neighbors_statement(&ds, "minimax", 7);
        assert_eq!(neighbors.text, NEIGHBORS);
        assert_eq!(neighbors.params[2], ("limit", ParamValue::Int(7)));
        assert!(delete_all_statement().params.is_empty());
    }

    #[test]
    fn entity_statements_are_scoped_by_dataset() {
        for text in [UPSERT_NODES, UPSERT_EDGES, MERGE_NODE, MERGE_EDGE, NEIGHBORS] {
            assert!(text.contains("dataset: $dataset"), "{text}");
        }
    }
}
