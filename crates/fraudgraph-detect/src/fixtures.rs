//! Hand-built graphs for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use fraudgraph_core::{
    Account, AnalysisConfig, Device, Node, RelProperties, RelType, Relationship, Transaction, User,
};

use crate::context::MatchContext;
use crate::index::GraphIndex;
use crate::ingest::GraphSnapshot;

/// Fixed reference time for every test.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - Duration::minutes(minutes)
}

pub fn context() -> MatchContext {
    context_with(AnalysisConfig::default())
}

pub fn context_with(config: AnalysisConfig) -> MatchContext {
    MatchContext::new(config, now()).unwrap()
}

#[derive(Default)]
pub struct Fixture {
    pub snapshot: GraphSnapshot,
}

impl Fixture {
    pub fn user(mut self, id: &str, risk_score: f64) -> Self {
        self.snapshot.nodes.push(Node::User(User {
            id: id.to_string(),
            name: format!("User {id}"),
            email: format!("{}@example.com", id.to_lowercase()),
            phone: "+1-555-0100".to_string(),
            risk_score,
            created_at: minutes_ago(60 * 24 * 30),
        }));
        self
    }

    pub fn device(mut self, id: &str, location: &str) -> Self {
        self.snapshot.nodes.push(Node::Device(Device {
            id: id.to_string(),
            device_type: "laptop".to_string(),
            ip: format!("10.0.0.{}", self.snapshot.nodes.len()),
            location: location.to_string(),
        }));
        self
    }

    pub fn account(mut self, id: &str, bank: &str) -> Self {
        self.snapshot.nodes.push(Node::Account(Account {
            id: id.to_string(),
            bank: bank.to_string(),
            account_type: "checking".to_string(),
            balance: Decimal::ZERO,
        }));
        self
    }

    /// A bare transaction node with no account links.
    pub fn transaction(mut self, id: &str, amount: Decimal, minutes: i64, status: &str) -> Self {
        self.snapshot.nodes.push(Node::Transaction(Transaction {
            id: id.to_string(),
            amount,
            tx_type: "transfer".to_string(),
            status: status.to_string(),
            timestamp: minutes_ago(minutes),
        }));
        self
    }

    /// A completed transfer `from` → `to`, `minutes` before [`now`].
    pub fn tx(self, id: &str, amount: Decimal, minutes: i64, from: &str, to: &str) -> Self {
        self.tx_with_status(id, amount, minutes, from, to, "completed")
    }

    pub fn tx_with_status(
        self,
        id: &str,
        amount: Decimal,
        minutes: i64,
        from: &str,
        to: &str,
        status: &str,
    ) -> Self {
        self.transaction(id, amount, minutes, status)
            .link(RelType::Sends, from, id)
            .link(RelType::Receives, id, to)
    }

    pub fn uses(self, user: &str, device: &str) -> Self {
        self.link(RelType::Uses, user, device)
    }

    pub fn owns(self, user: &str, account: &str) -> Self {
        self.link(RelType::Owns, user, account)
    }

    pub fn link(mut self, rel_type: RelType, source: &str, target: &str) -> Self {
        self.snapshot
            .relationships
            .push(Relationship::new(rel_type, source, target));
        self
    }

    pub fn link_with(
        mut self,
        rel_type: RelType,
        source: &str,
        target: &str,
        properties: RelProperties,
    ) -> Self {
        self.snapshot
            .relationships
            .push(Relationship::new(rel_type, source, target).with_properties(properties));
        self
    }

    pub fn try_index(self) -> crate::error::Result<GraphIndex> {
        GraphIndex::build(self.snapshot)
    }

    pub fn index(self) -> GraphIndex {
        self.try_index().unwrap()
    }
}
