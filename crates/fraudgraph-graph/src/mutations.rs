//! Write operations for the entity graph.
//!
//! Nodes are identified by `(label, id)` and relationships by their `id`.
//! Both use MERGE with ON CREATE so that re-inserting a record leaves the
//! stored copy untouched.

use neo4rs::query;

use fraudgraph_core::NodeLabel;

use crate::client::{GraphClient, GraphError};
use crate::store::{parse_label, parse_rel_type, EdgeRecord, NodeRecord};

impl GraphClient {
    /// Create a node unless one with the same label and id already exists.
    pub async fn create_node(&self, node: &NodeRecord) -> Result<(), GraphError> {
        let label = parse_label(&node.label)?;
        let cypher = format!(
            "MERGE (n:{label} {{id: $id}})
             ON CREATE SET n += apoc.convert.fromJsonMap($props)"
        );

        let q = query(&cypher)
            .param("id", node.id.clone())
            .param("props", props_json(&node.properties)?);

        self.run(q).await
    }

    /// Create nodes in a single transaction-sized batch.
    pub async fn create_nodes(&self, nodes: &[NodeRecord]) -> Result<(), GraphError> {
        for node in nodes {
            self.create_node(node).await?;
        }
        tracing::debug!(count = nodes.len(), "Created node batch");
        Ok(())
    }

    /// Create a relationship between two existing nodes.
    ///
    /// Fails with [`GraphError::NotFound`] when either endpoint is missing.
    pub async fn create_relationship(&self, rel: &EdgeRecord) -> Result<(), GraphError> {
        let rel_type = parse_rel_type(&rel.edge_type)?;
        let (source_label, target_label) = rel_type.endpoints();

        self.require_node(source_label, &rel.source_id).await?;
        self.require_node(target_label, &rel.target_id).await?;

        let cypher = format!(
            "MATCH (a:{source_label} {{id: $source_id}})
             MATCH (b:{target_label} {{id: $target_id}})
             MERGE (a)-[r:{rel_type} {{id: $id}}]->(b)
             ON CREATE SET r += apoc.convert.fromJsonMap($props)"
        );

        let q = query(&cypher)
            .param("source_id", rel.source_id.clone())
            .param("target_id", rel.target_id.clone())
            .param("id", rel.id.clone())
            .param("props", props_json(&rel.properties)?);

        self.run(q).await
    }

    /// Delete every entity node and its relationships.
    pub async fn delete_all(&self) -> Result<(), GraphError> {
        let q = query(
            "MATCH (n)
             WHERE n:User OR n:Device OR n:Account OR n:Transaction
             DETACH DELETE n",
        );
        self.run(q).await?;
        tracing::info!("Deleted all entity nodes from Neo4j");
        Ok(())
    }

    async fn require_node(&self, label: NodeLabel, id: &str) -> Result<(), GraphError> {
        if self.node_exists(label, id).await? {
            Ok(())
        } else {
            Err(GraphError::not_found(label, id))
        }
    }
}

/// Serialize a property map for `apoc.convert.fromJsonMap`.
fn props_json(properties: &serde_json::Value) -> Result<String, GraphError> {
    match properties {
        serde_json::Value::Null => Ok("{}".to_string()),
        serde_json::Value::Object(_) => Ok(serde_json::to_string(properties)?),
        other => Err(GraphError::InvalidRecord(format!(
            "properties must be an object, got {other}"
        ))),
    }
}
