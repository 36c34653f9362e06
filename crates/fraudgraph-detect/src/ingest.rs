//! Mapping between store records and the typed entity model.
//!
//! Store records carry a label or relationship type plus a flat JSON property
//! map. Decimals are written as strings and timestamps as RFC 3339 strings;
//! on the way in, decimals are also accepted as JSON numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fraudgraph_core::{Node, NodeLabel, RelProperties, RelType, Relationship, RelationshipId};
use fraudgraph_graph::{EdgeRecord, NodeRecord, SubgraphResult};

use crate::error::{DetectError, Result};

/// A self-contained batch of typed nodes and relationships.
///
/// This is the JSON input of the CLI and the unit of incremental ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl GraphSnapshot {
    /// Map every record of a fetched subgraph. Any unmappable record fails the whole batch.
    pub fn from_subgraph(subgraph: &SubgraphResult) -> Result<Self> {
        let nodes = subgraph
            .nodes
            .iter()
            .map(record_to_node)
            .collect::<Result<Vec<_>>>()?;
        let relationships = subgraph
            .edges
            .iter()
            .map(record_to_relationship)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            nodes = nodes.len(),
            relationships = relationships.len(),
            "Mapped store records"
        );
        Ok(Self {
            nodes,
            relationships,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

/// Convert a store node record into a typed node.
pub fn record_to_node(record: &NodeRecord) -> Result<Node> {
    let label = NodeLabel::parse(&record.label).ok_or_else(|| {
        DetectError::InvalidRecord(format!("node {}: unknown label '{}'", record.id, record.label))
    })?;

    let mut fields = match &record.properties {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::Null => serde_json::Map::new(),
        other => {
            return Err(DetectError::InvalidRecord(format!(
                "{label} {}: properties must be an object, got {other}",
                record.id
            )))
        }
    };
    fields.insert("id".to_string(), serde_json::Value::String(record.id.clone()));
    fields.insert(
        "label".to_string(),
        serde_json::Value::String(label.as_str().to_string()),
    );

    let node: Node = serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| DetectError::InvalidRecord(format!("{label} {}: {e}", record.id)))?;
    validate_node(&node)?;
    Ok(node)
}

/// Convert a store relationship record into a typed relationship.
///
/// Record ids that are not UUIDs are mapped to a stable v5 UUID.
pub fn record_to_relationship(record: &EdgeRecord) -> Result<Relationship> {
    let rel_type = RelType::parse(&record.edge_type).ok_or_else(|| {
        DetectError::InvalidRecord(format!(
            "relationship {}: unknown type '{}'",
            record.id, record.edge_type
        ))
    })?;

    let properties = match &record.properties {
        serde_json::Value::Null => RelProperties::default(),
        value => serde_json::from_value(value.clone()).map_err(|e| {
            DetectError::InvalidRecord(format!("{rel_type} {}: {e}", record.id))
        })?,
    };

    let id = Uuid::parse_str(&record.id)
        .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, record.id.as_bytes()));

    Ok(Relationship {
        id: RelationshipId(id),
        rel_type,
        source_id: record.source_id.clone(),
        target_id: record.target_id.clone(),
        properties,
    })
}

/// Convert a typed node into a store record.
pub fn node_to_record(node: &Node) -> Result<NodeRecord> {
    let mut properties = match serde_json::to_value(node)? {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(DetectError::InvalidRecord(format!(
                "node {} serialized to a non-object: {other}",
                node.id()
            )))
        }
    };
    properties.remove("id");
    properties.remove("label");

    Ok(NodeRecord {
        id: node.id().to_string(),
        label: node.label().to_string(),
        properties: serde_json::Value::Object(properties),
    })
}

/// Convert a typed relationship into a store record.
pub fn relationship_to_record(rel: &Relationship) -> Result<EdgeRecord> {
    Ok(EdgeRecord {
        id: rel.id.to_string(),
        edge_type: rel.rel_type.to_string(),
        source_id: rel.source_id.clone(),
        target_id: rel.target_id.clone(),
        properties: serde_json::to_value(&rel.properties)?,
    })
}

/// Range checks the serde mapping cannot express.
pub fn validate_node(node: &Node) -> Result<()> {
    match node {
        Node::User(u) if !(0.0..=1.0).contains(&u.risk_score) => {
            Err(DetectError::InvalidRecord(format!(
                "User {}: risk_score {} is outside [0, 1]",
                u.id, u.risk_score
            )))
        }
        Node::Transaction(t) if t.amount < Decimal::ZERO => Err(DetectError::InvalidRecord(
            format!("Transaction {}: negative amount {}", t.id, t.amount),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn node_record(id: &str, label: &str, props: serde_json::Value) -> NodeRecord {
        NodeRecord {
            id: id.to_string(),
            label: label.to_string(),
            properties: props,
        }
    }

    #[test]
    fn test_user_record_maps_to_node() {
        let record = node_record(
            "U101",
            "User",
            serde_json::json!({
                "name": "Frank Fraud",
                "email": "frank@fake.com",
                "phone": "+1-555-9999",
                "risk_score": 0.9,
                "created_at": "2024-01-15T10:00:00Z",
            }),
        );
        let node = record_to_node(&record).unwrap();
        let user = node.as_user().unwrap();
        assert_eq!(user.id, "U101");
        assert_eq!(user.name, "Frank Fraud");
        assert!((user.risk_score - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decimal_from_string_or_number() {
        let from_string = node_record(
            "T1",
            "Transaction",
            serde_json::json!({
                "amount": "50000.00",
                "type": "transfer",
                "status": "pending",
                "timestamp": "2024-01-15T10:00:00Z",
            }),
        );
        let from_number = node_record(
            "T2",
            "Transaction",
            serde_json::json!({
                "amount": 50000,
                "type": "transfer",
                "status": "pending",
                "timestamp": "2024-01-15T10:00:00Z",
            }),
        );
        let t1 = record_to_node(&from_string).unwrap();
        let t2 = record_to_node(&from_number).unwrap();
        assert_eq!(t1.as_transaction().unwrap().amount, dec!(50000));
        assert_eq!(t2.as_transaction().unwrap().amount, dec!(50000));
    }

    #[test]
    fn test_missing_property_is_invalid() {
        let record = node_record("D1", "Device", serde_json::json!({"type": "laptop"}));
        let err = record_to_node(&record).unwrap_err();
        assert!(matches!(err, DetectError::InvalidRecord(_)));
    }

    #[test]
    fn test_unknown_label_is_invalid() {
        let record = node_record("X1", "Merchant", serde_json::json!({}));
        assert!(matches!(
            record_to_node(&record),
            Err(DetectError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_out_of_range_values_are_invalid() {
        let user = node_record(
            "U1",
            "User",
            serde_json::json!({
                "name": "A", "email": "a@x", "phone": "1",
                "risk_score": 1.5, "created_at": "2024-01-15T10:00:00Z",
            }),
        );
        assert!(matches!(
            record_to_node(&user),
            Err(DetectError::InvalidRecord(_))
        ));

        let tx = node_record(
            "T1",
            "Transaction",
            serde_json::json!({
                "amount": "-1", "type": "transfer", "status": "completed",
                "timestamp": "2024-01-15T10:00:00Z",
            }),
        );
        assert!(matches!(
            record_to_node(&tx),
            Err(DetectError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_node_record_roundtrip_keeps_properties_flat() {
        let record = node_record(
            "A101",
            "Account",
            serde_json::json!({
                "bank": "Offshore Bank",
                "account_type": "checking",
                "balance": "100000",
            }),
        );
        let node = record_to_node(&record).unwrap();
        let back = node_to_record(&node).unwrap();
        assert_eq!(back.id, "A101");
        assert_eq!(back.label, "Account");
        assert!(back.properties.get("id").is_none());
        assert!(back.properties.get("label").is_none());
        assert_eq!(
            back.properties.get("bank").and_then(|v| v.as_str()),
            Some("Offshore Bank")
        );
        assert_eq!(record_to_node(&back).unwrap(), node);
    }

    #[test]
    fn test_relationship_record_mapping() {
        let record = EdgeRecord {
            id: "e-1".to_string(),
            edge_type: "SHARES_PHONE".to_string(),
            source_id: "U101".to_string(),
            target_id: "U102".to_string(),
            properties: serde_json::json!({"phone": "+1-555-9999"}),
        };
        let rel = record_to_relationship(&record).unwrap();
        assert_eq!(rel.rel_type, RelType::SharesPhone);
        assert_eq!(rel.properties.phone.as_deref(), Some("+1-555-9999"));

        // Non-UUID ids map to the same UUID every time.
        let again = record_to_relationship(&record).unwrap();
        assert_eq!(rel.id, again.id);

        let back = relationship_to_record(&rel).unwrap();
        assert_eq!(back.edge_type, "SHARES_PHONE");
        assert_eq!(back.source_id, "U101");
    }

    #[test]
    fn test_unknown_relationship_type_is_invalid() {
        let record = EdgeRecord {
            id: "e-1".to_string(),
            edge_type: "KNOWS".to_string(),
            source_id: "U1".to_string(),
            target_id: "U2".to_string(),
            properties: serde_json::Value::Null,
        };
        assert!(matches!(
            record_to_relationship(&record),
            Err(DetectError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_snapshot_from_subgraph_fails_on_bad_record() {
        let subgraph = SubgraphResult {
            nodes: vec![node_record("X1", "Merchant", serde_json::json!({}))],
            edges: vec![],
        };
        assert!(GraphSnapshot::from_subgraph(&subgraph).is_err());
        assert!(GraphSnapshot::from_subgraph(&SubgraphResult::default())
            .unwrap()
            .is_empty());
    }
}
