//! The graph store interface consumed by the detection engine.
//!
//! A store holds nodes and relationships as lightweight records. The engine
//! reads a full snapshot through [`GraphStore::fetch_subgraph`] and writes new
//! records through the `put_*` operations; it never depends on how the store
//! is backed.

use async_trait::async_trait;

use fraudgraph_core::{Direction, NodeLabel, RelType};

use crate::client::{GraphClient, GraphError};

/// A lightweight node record as held by a store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub label: String,
    pub properties: serde_json::Value,
}

/// A lightweight relationship record as held by a store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    pub edge_type: String,
    pub source_id: String,
    pub target_id: String,
    pub properties: serde_json::Value,
}

/// Result of a subgraph fetch.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubgraphResult {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// Minimal store interface: insertion plus lookup by label and by anchored relationship.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert a node. Re-inserting an existing `(label, id)` is a no-op.
    async fn put_node(&self, node: &NodeRecord) -> Result<(), GraphError>;

    /// Insert a relationship. Both endpoints must already exist.
    async fn put_relationship(&self, rel: &EdgeRecord) -> Result<(), GraphError>;

    /// All nodes carrying `label`, in insertion order where the backend has one.
    async fn get_nodes_by_label(&self, label: NodeLabel) -> Result<Vec<NodeRecord>, GraphError>;

    /// Relationships of `rel_type` anchored at `from_id`.
    ///
    /// For [`Direction::Outgoing`] the anchor is the source; for
    /// [`Direction::Incoming`] it is the target.
    async fn get_relationships(
        &self,
        from_id: &str,
        rel_type: RelType,
        direction: Direction,
    ) -> Result<Vec<EdgeRecord>, GraphError>;

    /// Remove every node and relationship.
    async fn clear(&self) -> Result<(), GraphError>;

    /// Fetch every node and relationship.
    ///
    /// The default composes `get_nodes_by_label` and outgoing
    /// `get_relationships` per source node; backends with bulk reads override it.
    async fn fetch_subgraph(&self) -> Result<SubgraphResult, GraphError> {
        let mut result = SubgraphResult::default();
        for label in NodeLabel::ALL {
            result.nodes.extend(self.get_nodes_by_label(label).await?);
        }

        for rel_type in RelType::ALL {
            let source_label = rel_type.endpoints().0.as_str();
            for node in result.nodes.iter().filter(|n| n.label == source_label) {
                let edges = self
                    .get_relationships(&node.id, rel_type, Direction::Outgoing)
                    .await?;
                result.edges.extend(edges);
            }
        }

        Ok(result)
    }
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn put_node(&self, node: &NodeRecord) -> Result<(), GraphError> {
        self.create_node(node).await
    }

    async fn put_relationship(&self, rel: &EdgeRecord) -> Result<(), GraphError> {
        self.create_relationship(rel).await
    }

    async fn get_nodes_by_label(&self, label: NodeLabel) -> Result<Vec<NodeRecord>, GraphError> {
        self.list_nodes(label).await
    }

    async fn get_relationships(
        &self,
        from_id: &str,
        rel_type: RelType,
        direction: Direction,
    ) -> Result<Vec<EdgeRecord>, GraphError> {
        self.list_relationships(from_id, rel_type, direction).await
    }

    async fn clear(&self) -> Result<(), GraphError> {
        self.delete_all().await
    }

    async fn fetch_subgraph(&self) -> Result<SubgraphResult, GraphError> {
        self.fetch_all().await
    }
}

/// Parse a record label, rejecting labels outside the entity model.
pub(crate) fn parse_label(label: &str) -> Result<NodeLabel, GraphError> {
    NodeLabel::parse(label)
        .ok_or_else(|| GraphError::InvalidRecord(format!("unknown node label '{label}'")))
}

/// Parse a record relationship type, rejecting types outside the entity model.
pub(crate) fn parse_rel_type(edge_type: &str) -> Result<RelType, GraphError> {
    RelType::parse(edge_type).ok_or_else(|| {
        GraphError::InvalidRecord(format!("unknown relationship type '{edge_type}'"))
    })
}
