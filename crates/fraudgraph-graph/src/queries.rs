//! Read operations against the Neo4j entity graph.

use neo4rs::query;

use fraudgraph_core::{Direction, NodeLabel, RelType};

use crate::client::{GraphClient, GraphError};
use crate::store::{parse_rel_type, EdgeRecord, NodeRecord, SubgraphResult};

impl GraphClient {
    // ── Node Queries ─────────────────────────────────────────────

    /// List all nodes of a given label, ordered by id.
    pub async fn list_nodes(&self, label: NodeLabel) -> Result<Vec<NodeRecord>, GraphError> {
        let cypher = format!(
            "MATCH (n:{label})
             RETURN n
             ORDER BY n.id"
        );

        let rows = self.query_rows(query(&cypher)).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let node: neo4rs::Node = row.get("n").map_err(|e| {
                GraphError::Decode(format!("Failed to deserialize node: {e}"))
            })?;
            results.push(neo4j_node_to_record(&node, label)?);
        }
        Ok(results)
    }

    /// Count nodes of a given label.
    pub async fn count_nodes(&self, label: NodeLabel) -> Result<i64, GraphError> {
        let cypher = format!("MATCH (n:{label}) RETURN count(n) AS cnt");

        match self.query_one(query(&cypher)).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Whether a node with this label and id exists.
    pub async fn node_exists(&self, label: NodeLabel, id: &str) -> Result<bool, GraphError> {
        let cypher = format!("MATCH (n:{label} {{id: $id}}) RETURN count(n) AS cnt");
        let q = query(&cypher).param("id", id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(row.get::<i64>("cnt").unwrap_or(0) > 0),
            None => Ok(false),
        }
    }

    // ── Relationship Queries ─────────────────────────────────────

    /// Relationships of one type anchored at `from_id`, ordered by relationship id.
    pub async fn list_relationships(
        &self,
        from_id: &str,
        rel_type: RelType,
        direction: Direction,
    ) -> Result<Vec<EdgeRecord>, GraphError> {
        let (source_label, target_label) = rel_type.endpoints();
        let cypher = match direction {
            Direction::Outgoing => format!(
                "MATCH (a:{source_label} {{id: $id}})-[r:{rel_type}]->(b:{target_label})
                 RETURN r, a.id AS source_id, b.id AS target_id
                 ORDER BY r.id"
            ),
            Direction::Incoming => format!(
                "MATCH (a:{source_label})-[r:{rel_type}]->(b:{target_label} {{id: $id}})
                 RETURN r, a.id AS source_id, b.id AS target_id
                 ORDER BY r.id"
            ),
        };

        let q = query(&cypher).param("id", from_id.to_string());
        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(row_to_edge_record(&row, rel_type)?);
        }
        Ok(results)
    }

    // ── Bulk Reads ───────────────────────────────────────────────

    /// Fetch every entity node and every relationship between them.
    pub async fn fetch_all(&self) -> Result<SubgraphResult, GraphError> {
        let mut result = SubgraphResult::default();
        for label in NodeLabel::ALL {
            result.nodes.extend(self.list_nodes(label).await?);
        }

        let types: Vec<String> = RelType::ALL.iter().map(|t| t.as_str().to_string()).collect();
        let q = query(
            "MATCH (a)-[r]->(b)
             WHERE type(r) IN $types
             RETURN r, type(r) AS rel_type, a.id AS source_id, b.id AS target_id
             ORDER BY r.id",
        )
        .param("types", types);

        let rows = self.query_rows(q).await?;
        result.edges.reserve(rows.len());
        for row in rows {
            let rel_type: String = row.get("rel_type").map_err(|e| {
                GraphError::Decode(format!("Failed to read relationship type: {e}"))
            })?;
            result
                .edges
                .push(row_to_edge_record(&row, parse_rel_type(&rel_type)?)?);
        }

        tracing::debug!(
            nodes = result.nodes.len(),
            edges = result.edges.len(),
            "Fetched entity graph from Neo4j"
        );
        Ok(result)
    }
}

/// Properties read back for each node label.
fn node_property_keys(label: NodeLabel) -> &'static [&'static str] {
    match label {
        NodeLabel::User => &["name", "email", "phone", "risk_score", "created_at"],
        NodeLabel::Device => &["type", "ip", "location"],
        NodeLabel::Account => &["bank", "account_type", "balance"],
        NodeLabel::Transaction => &["amount", "type", "status", "timestamp"],
    }
}

const RELATIONSHIP_PROPERTY_KEYS: &[&str] = &["since", "phone", "pattern"];

/// Convert a neo4rs::Node to our lightweight NodeRecord.
fn neo4j_node_to_record(node: &neo4rs::Node, label: NodeLabel) -> Result<NodeRecord, GraphError> {
    let id: String = node
        .get("id")
        .map_err(|_| GraphError::InvalidRecord(format!("{label} node without an id")))?;

    let mut props = serde_json::Map::new();
    for key in node_property_keys(label) {
        if let Some(v) = property_value(node, key) {
            props.insert((*key).to_string(), v);
        }
    }

    Ok(NodeRecord {
        id,
        label: label.to_string(),
        properties: serde_json::Value::Object(props),
    })
}

fn row_to_edge_record(row: &neo4rs::Row, rel_type: RelType) -> Result<EdgeRecord, GraphError> {
    let rel: neo4rs::Relation = row
        .get("r")
        .map_err(|e| GraphError::Decode(format!("Failed to get relation: {e}")))?;
    let source_id: String = row
        .get("source_id")
        .map_err(|e| GraphError::Decode(format!("Failed to get source id: {e}")))?;
    let target_id: String = row
        .get("target_id")
        .map_err(|e| GraphError::Decode(format!("Failed to get target id: {e}")))?;

    let id: String = rel
        .get("id")
        .map_err(|_| GraphError::InvalidRecord(format!("{rel_type} relationship without an id")))?;

    let mut props = serde_json::Map::new();
    for key in RELATIONSHIP_PROPERTY_KEYS {
        if let Some(v) = property_value(&rel, key) {
            props.insert((*key).to_string(), v);
        }
    }

    Ok(EdgeRecord {
        id,
        edge_type: rel_type.to_string(),
        source_id,
        target_id,
        properties: serde_json::Value::Object(props),
    })
}

/// Read a scalar property, trying string, integer, float, then boolean.
fn property_value<E: PropertyReader>(entity: &E, key: &str) -> Option<serde_json::Value> {
    if let Some(s) = entity.read_string(key) {
        return Some(serde_json::Value::String(s));
    }
    if let Some(i) = entity.read_i64(key) {
        return Some(serde_json::Value::from(i));
    }
    if let Some(f) = entity.read_f64(key) {
        return serde_json::Number::from_f64(f).map(serde_json::Value::Number);
    }
    entity.read_bool(key).map(serde_json::Value::Bool)
}

trait PropertyReader {
    fn read_string(&self, key: &str) -> Option<String>;
    fn read_i64(&self, key: &str) -> Option<i64>;
    fn read_f64(&self, key: &str) -> Option<f64>;
    fn read_bool(&self, key: &str) -> Option<bool>;
}

impl PropertyReader for neo4rs::Node {
    fn read_string(&self, key: &str) -> Option<String> {
        self.get::<String>(key).ok()
    }
    fn read_i64(&self, key: &str) -> Option<i64> {
        self.get::<i64>(key).ok()
    }
    fn read_f64(&self, key: &str) -> Option<f64> {
        self.get::<f64>(key).ok()
    }
    fn read_bool(&self, key: &str) -> Option<bool> {
        self.get::<bool>(key).ok()
    }
}

impl PropertyReader for neo4rs::Relation {
    fn read_string(&self, key: &str) -> Option<String> {
        self.get::<String>(key).ok()
    }
    fn read_i64(&self, key: &str) -> Option<i64> {
        self.get::<i64>(key).ok()
    }
    fn read_f64(&self, key: &str) -> Option<f64> {
        self.get::<f64>(key).ok()
    }
    fn read_bool(&self, key: &str) -> Option<bool> {
        self.get::<bool>(key).ok()
    }
}
