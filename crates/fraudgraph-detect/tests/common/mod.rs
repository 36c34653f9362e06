use chrono::{DateTime, Duration, TimeZone, Utc};
use fraudgraph_core::AnalysisConfig;
use fraudgraph_detect::GraphSnapshot;
use serde_json::{json, Value};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn minutes_ago(minutes: i64) -> String {
    (now() - Duration::minutes(minutes)).to_rfc3339()
}

pub fn pinned_config() -> AnalysisConfig {
    AnalysisConfig {
        now: Some(now()),
        ..Default::default()
    }
}

/// Builds a snapshot as the JSON a caller would pipe into the CLI.
#[derive(Default)]
pub struct SnapshotBuilder {
    nodes: Vec<Value>,
    relationships: Vec<Value>,
}

impl SnapshotBuilder {
    pub fn user(mut self, id: &str, name: &str, risk_score: f64) -> Self {
        self.nodes.push(json!({
            "label": "User",
            "id": id,
            "name": name,
            "email": format!("{}@example.com", id.to_lowercase()),
            "phone": "+1-555-0100",
            "risk_score": risk_score,
            "created_at": minutes_ago(60 * 24 * 90),
        }));
        self
    }

    pub fn device(mut self, id: &str, ip: &str, location: &str) -> Self {
        self.nodes.push(json!({
            "label": "Device",
            "id": id,
            "type": "laptop",
            "ip": ip,
            "location": location,
        }));
        self
    }

    pub fn account(mut self, id: &str, bank: &str, balance: i64) -> Self {
        self.nodes.push(json!({
            "label": "Account",
            "id": id,
            "bank": bank,
            "account_type": "checking",
            "balance": balance,
        }));
        self
    }

    /// A transaction `from` → `to`, `minutes` before [`now`].
    pub fn transfer(
        mut self,
        id: &str,
        amount: i64,
        minutes: i64,
        status: &str,
        from: &str,
        to: &str,
    ) -> Self {
        self.nodes.push(json!({
            "label": "Transaction",
            "id": id,
            "amount": amount,
            "type": "transfer",
            "status": status,
            "timestamp": minutes_ago(minutes),
        }));
        self.link("SENDS", from, id, json!({}))
            .link("RECEIVES", id, to, json!({}))
    }

    pub fn uses(self, user: &str, device: &str) -> Self {
        self.link("USES", user, device, json!({ "since": minutes_ago(60 * 24) }))
    }

    pub fn owns(self, user: &str, account: &str) -> Self {
        self.link("OWNS", user, account, json!({ "since": minutes_ago(60 * 24) }))
    }

    pub fn link(mut self, rel_type: &str, source: &str, target: &str, properties: Value) -> Self {
        self.relationships.push(json!({
            "rel_type": rel_type,
            "source_id": source,
            "target_id": target,
            "properties": properties,
        }));
        self
    }

    pub fn to_json(&self) -> String {
        json!({ "nodes": self.nodes, "relationships": self.relationships }).to_string()
    }

    pub fn build(&self) -> GraphSnapshot {
        serde_json::from_str(&self.to_json()).unwrap()
    }
}

/// Five ordinary customers and a four-person fraud ring.
pub fn demo_graph() -> SnapshotBuilder {
    SnapshotBuilder::default()
        .user("U001", "Alice Johnson", 0.1)
        .user("U002", "Bob Smith", 0.2)
        .user("U003", "Carol Davis", 0.1)
        .user("U004", "David Wilson", 0.3)
        .user("U005", "Eve Brown", 0.1)
        .user("U101", "Frank Fraud", 0.9)
        .user("U102", "Grace Scammer", 0.8)
        .user("U103", "Henry Thief", 0.7)
        .user("U104", "Ivy Criminal", 0.9)
        .device("D001", "192.168.1.100", "New York")
        .device("D002", "192.168.1.101", "San Francisco")
        .device("D003", "192.168.1.102", "Boston")
        .device("D004", "10.0.0.50", "Unknown")
        .device("D005", "10.0.0.51", "Unknown")
        .device("D006", "10.0.0.52", "Unknown")
        .account("A001", "Chase", 5000)
        .account("A002", "Wells Fargo", 15000)
        .account("A003", "Bank of America", 3000)
        .account("A004", "Citibank", 8000)
        .account("A005", "Chase", 25000)
        .account("A101", "Offshore Bank", 100000)
        .account("A102", "Offshore Bank", 500000)
        .account("A103", "Offshore Bank", 75000)
        .uses("U001", "D001")
        .uses("U002", "D002")
        .uses("U003", "D003")
        .uses("U004", "D001")
        .uses("U005", "D002")
        .uses("U101", "D004")
        .uses("U102", "D004")
        .uses("U103", "D005")
        .uses("U104", "D005")
        .uses("U101", "D006")
        .uses("U102", "D006")
        .owns("U001", "A001")
        .owns("U002", "A002")
        .owns("U003", "A003")
        .owns("U004", "A004")
        .owns("U005", "A005")
        .owns("U101", "A101")
        .owns("U101", "A102")
        .owns("U102", "A103")
        .transfer("T001", 100, 120, "completed", "A001", "A002")
        .transfer("T002", 250, 60, "completed", "A002", "A003")
        .transfer("T003", 75, 30, "completed", "A003", "A004")
        .transfer("T004", 500, 15, "completed", "A004", "A005")
        .transfer("T005", 1200, 5, "completed", "A005", "A001")
        .transfer("T101", 50000, 10, "pending", "A101", "A102")
        .transfer("T102", 25000, 8, "pending", "A102", "A103")
        .transfer("T103", 100000, 5, "pending", "A103", "A101")
        .transfer("T104", 75000, 3, "pending", "A101", "A102")
        .transfer("T105", 30000, 1, "pending", "A102", "A103")
        .link("SHARES_PHONE", "U101", "U102", json!({ "phone": "+1-555-9999" }))
        .link("SIMILAR_EMAIL", "U103", "U104", json!({ "pattern": "stolen.org" }))
}
