//! Core entity model for the fraudgraph engine.
//!
//! These types represent the nodes and relationships of the financial entity
//! graph, shared by the store adapters and the detection engine.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Node Types ────────────────────────────────────────────────────

/// A customer of the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Prior risk estimate in `[0.0, 1.0]`.
    pub risk_score: f64,
    pub created_at: DateTime<Utc>,
}

/// A device a user signs in from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub ip: String,
    /// Geolocation; `"Unknown"` marks an untrusted location.
    pub location: String,
}

/// A bank account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub bank: String,
    pub account_type: String,
    pub balance: Decimal,
}

/// A money movement between two accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Enum wrapper for all node types in the entity graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "label")]
pub enum Node {
    User(User),
    Device(Device),
    Account(Account),
    Transaction(Transaction),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::User(n) => &n.id,
            Node::Device(n) => &n.id,
            Node::Account(n) => &n.id,
            Node::Transaction(n) => &n.id,
        }
    }

    pub fn label(&self) -> NodeLabel {
        match self {
            Node::User(_) => NodeLabel::User,
            Node::Device(_) => NodeLabel::Device,
            Node::Account(_) => NodeLabel::Account,
            Node::Transaction(_) => NodeLabel::Transaction,
        }
    }

    /// Identity of the node within the graph. Ids are unique per label only.
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.label(), self.id())
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Node::User(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_device(&self) -> Option<&Device> {
        match self {
            Node::Device(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_account(&self) -> Option<&Account> {
        match self {
            Node::Account(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            Node::Transaction(t) => Some(t),
            _ => None,
        }
    }
}

/// The label (variant) of a node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeLabel {
    User,
    Device,
    Account,
    Transaction,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 4] = [
        NodeLabel::User,
        NodeLabel::Device,
        NodeLabel::Account,
        NodeLabel::Transaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::User => "User",
            NodeLabel::Device => "Device",
            NodeLabel::Account => "Account",
            NodeLabel::Transaction => "Transaction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "User" => Some(NodeLabel::User),
            "Device" => Some(NodeLabel::Device),
            "Account" => Some(NodeLabel::Account),
            "Transaction" => Some(NodeLabel::Transaction),
            _ => None,
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graph-wide identity of a node: `(label, id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub label: NodeLabel,
    pub id: String,
}

impl NodeKey {
    pub fn new(label: NodeLabel, id: impl Into<String>) -> Self {
        Self {
            label,
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.label, self.id)
    }
}

// ── Relationship Types ────────────────────────────────────────────

/// Store-level identifier for a relationship.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RelationshipId(pub Uuid);

impl RelationshipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RelationshipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed, typed edge between two nodes.
///
/// Endpoint labels are implied by the relationship type, see [`RelType::endpoints`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    #[serde(default)]
    pub id: RelationshipId,
    pub rel_type: RelType,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub properties: RelProperties,
}

impl Relationship {
    pub fn new(rel_type: RelType, source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            id: RelationshipId::new(),
            rel_type,
            source_id: source_id.into(),
            target_id: target_id.into(),
            properties: RelProperties::default(),
        }
    }

    pub fn with_properties(mut self, properties: RelProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn source_key(&self) -> NodeKey {
        NodeKey::new(self.rel_type.endpoints().0, self.source_id.clone())
    }

    pub fn target_key(&self) -> NodeKey {
        NodeKey::new(self.rel_type.endpoints().1, self.target_id.clone())
    }
}

/// The type of relationship between two nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelType {
    Uses,
    Owns,
    Sends,
    Receives,
    SharesPhone,
    SimilarEmail,
}

impl RelType {
    pub const ALL: [RelType; 6] = [
        RelType::Uses,
        RelType::Owns,
        RelType::Sends,
        RelType::Receives,
        RelType::SharesPhone,
        RelType::SimilarEmail,
    ];

    /// Cypher relationship type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::Uses => "USES",
            RelType::Owns => "OWNS",
            RelType::Sends => "SENDS",
            RelType::Receives => "RECEIVES",
            RelType::SharesPhone => "SHARES_PHONE",
            RelType::SimilarEmail => "SIMILAR_EMAIL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        RelType::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// `(source label, target label)` for this relationship type.
    pub fn endpoints(&self) -> (NodeLabel, NodeLabel) {
        match self {
            RelType::Uses => (NodeLabel::User, NodeLabel::Device),
            RelType::Owns => (NodeLabel::User, NodeLabel::Account),
            RelType::Sends => (NodeLabel::Account, NodeLabel::Transaction),
            RelType::Receives => (NodeLabel::Transaction, NodeLabel::Account),
            RelType::SharesPhone | RelType::SimilarEmail => (NodeLabel::User, NodeLabel::User),
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traversal direction relative to an anchor node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Attributes attached to a relationship. Which ones are set depends on the type:
/// `since` on USES/OWNS, `phone` on SHARES_PHONE, `pattern` on SIMILAR_EMAIL.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RelProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

// ── Risk ──────────────────────────────────────────────────────────

/// Discrete risk classification attached to every match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Numeric weight used for summary statistics.
    pub fn weight(&self) -> u32 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
            RiskLevel::Critical => 3,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}
