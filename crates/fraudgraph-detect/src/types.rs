//! Match records and report types produced by the detection engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fraudgraph_core::{RiskLevel, User};

use crate::matchers::{MatchSet, Matcher};

/// The user fields carried on every match that names a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
    pub risk_score: f64,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            risk_score: user.risk_score,
        }
    }
}

// ── Matches ──────────────────────────────────────────────────────

/// Two users seen on the same device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSharingMatch {
    /// The user with the lexicographically smaller id.
    pub user1: UserRef,
    pub user2: UserRef,
    pub device_id: String,
    pub ip: String,
    pub location: String,
    pub avg_risk: f64,
    pub risk_level: RiskLevel,
}

/// A burst of transfers between one ordered pair of accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RapidTransferMatch {
    pub from_account: String,
    pub from_bank: String,
    pub to_account: String,
    pub to_bank: String,
    pub transfer_count: u32,
    pub total_amount: Decimal,
    /// Transactions inside the window, oldest first.
    pub transaction_ids: Vec<String>,
    pub risk_level: RiskLevel,
}

/// A single transfer above the large-transaction floor, attributed to one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargeTransactionMatch {
    pub transaction_id: String,
    pub owner: UserRef,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub from_account: String,
    pub from_bank: String,
    pub to_account: String,
    pub to_bank: String,
    pub risk_level: RiskLevel,
}

/// A two-hop chain start → middle → end moving money in quick succession.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayeringMatch {
    pub origin: UserRef,
    pub destination: UserRef,
    pub start_account: String,
    pub middle_account: String,
    pub end_account: String,
    pub origin_bank: String,
    pub destination_bank: String,
    pub first_transaction: String,
    pub second_transaction: String,
    pub amount1: Decimal,
    pub amount2: Decimal,
    pub total_amount: Decimal,
    pub gap_seconds: i64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTakeoverMatch {
    pub user: UserRef,
    pub device_count: u32,
    pub account_count: u32,
    pub unknown_location_devices: u32,
    pub score: u32,
    pub risk_level: RiskLevel,
}

/// Two users linked by shared devices, a shared phone, or a similar email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConnectionMatch {
    pub user1: UserRef,
    pub user2: UserRef,
    pub shared_devices: u32,
    pub shares_phone: bool,
    pub similar_email: bool,
    pub connection_score: u32,
    pub risk_level: RiskLevel,
}

// ── Report ───────────────────────────────────────────────────────

/// Statistics about the indexed graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub users: usize,
    pub devices: usize,
    pub accounts: usize,
    pub transactions: usize,
    pub relationships: usize,
    /// Transactions with both a source and a destination account.
    pub transfers: usize,
    pub version: u64,
}

/// Headline counts across the whole analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FraudSummary {
    pub high_risk_users: usize,
    pub suspicious_transactions: usize,
    pub device_sharing_incidents: usize,
    pub offshore_accounts: usize,
    /// Sum of risk weights over every match of every completed category.
    pub total_risk_score: u32,
    pub weighted_exposure: f64,
}

/// A user ranked by the risk weight of the matches naming them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offender {
    pub user: UserRef,
    pub weight: u32,
    pub match_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryOutcome {
    Completed { match_count: usize, matches: MatchSet },
    Failed { reason: String },
}

impl CategoryOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn matches(&self) -> Option<&MatchSet> {
        match self {
            Self::Completed { matches, .. } => Some(matches),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: Matcher,
    #[serde(flatten)]
    pub outcome: CategoryOutcome,
}

/// Complete result of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudReport {
    /// Reference time every window was computed from.
    pub now: DateTime<Utc>,
    pub summary: FraudSummary,
    pub top_offenders: Vec<Offender>,
    pub graph_stats: GraphStats,
    pub categories: Vec<CategoryReport>,
    pub failed_categories: Vec<Matcher>,
}

impl FraudReport {
    /// The outcome for one category.
    pub fn category(&self, matcher: Matcher) -> Option<&CategoryOutcome> {
        self.categories
            .iter()
            .find(|c| c.category == matcher)
            .map(|c| &c.outcome)
    }
}
