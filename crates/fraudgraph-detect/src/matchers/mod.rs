//! Fraud pattern matchers.
//!
//! Every matcher is a read-only traversal of a sealed [`GraphIndex`] that
//! returns its matches in a deterministic order. Matchers never read the clock
//! for analysis time; windows come from the [`MatchContext`].

pub mod account_takeover;
pub mod device_sharing;
pub mod large_transaction;
pub mod layering;
pub mod network_connections;
pub mod rapid_transfer;

use std::fmt;

use serde::{Deserialize, Serialize};

use fraudgraph_core::RiskLevel;

use crate::context::MatchContext;
use crate::error::Result;
use crate::index::GraphIndex;
use crate::types::{
    AccountTakeoverMatch, DeviceSharingMatch, LargeTransactionMatch, LayeringMatch,
    NetworkConnectionMatch, RapidTransferMatch, UserRef,
};

/// One fraud pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    DeviceSharing,
    RapidTransfer,
    LargeTransaction,
    Layering,
    AccountTakeover,
    NetworkConnections,
}

impl Matcher {
    pub const ALL: [Matcher; 6] = [
        Matcher::DeviceSharing,
        Matcher::RapidTransfer,
        Matcher::LargeTransaction,
        Matcher::Layering,
        Matcher::AccountTakeover,
        Matcher::NetworkConnections,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceSharing => "device_sharing",
            Self::RapidTransfer => "rapid_transfer",
            Self::LargeTransaction => "large_transaction",
            Self::Layering => "layering",
            Self::AccountTakeover => "account_takeover",
            Self::NetworkConnections => "network_connections",
        }
    }

    /// Run this matcher over one index snapshot.
    pub fn run(self, index: &GraphIndex, ctx: &MatchContext) -> Result<MatchSet> {
        match self {
            Self::DeviceSharing => {
                device_sharing::find_device_sharing(index, ctx).map(MatchSet::DeviceSharing)
            }
            Self::RapidTransfer => {
                rapid_transfer::find_rapid_transfers(index, ctx).map(MatchSet::RapidTransfer)
            }
            Self::LargeTransaction => large_transaction::find_large_transactions(index, ctx)
                .map(MatchSet::LargeTransaction),
            Self::Layering => layering::find_layering_chains(index, ctx).map(MatchSet::Layering),
            Self::AccountTakeover => account_takeover::find_takeover_indicators(index, ctx)
                .map(MatchSet::AccountTakeover),
            Self::NetworkConnections => network_connections::find_network_connections(index, ctx)
                .map(MatchSet::NetworkConnections),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ordered output of one matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchSet {
    DeviceSharing(Vec<DeviceSharingMatch>),
    RapidTransfer(Vec<RapidTransferMatch>),
    LargeTransaction(Vec<LargeTransactionMatch>),
    Layering(Vec<LayeringMatch>),
    AccountTakeover(Vec<AccountTakeoverMatch>),
    NetworkConnections(Vec<NetworkConnectionMatch>),
}

impl MatchSet {
    pub fn len(&self) -> usize {
        match self {
            Self::DeviceSharing(m) => m.len(),
            Self::RapidTransfer(m) => m.len(),
            Self::LargeTransaction(m) => m.len(),
            Self::Layering(m) => m.len(),
            Self::AccountTakeover(m) => m.len(),
            Self::NetworkConnections(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Each match's risk level and the users it names.
    pub fn scored_users(&self) -> Vec<(RiskLevel, Vec<&UserRef>)> {
        match self {
            Self::DeviceSharing(m) => m
                .iter()
                .map(|x| (x.risk_level, vec![&x.user1, &x.user2]))
                .collect(),
            Self::RapidTransfer(m) => m.iter().map(|x| (x.risk_level, Vec::new())).collect(),
            Self::LargeTransaction(m) => m.iter().map(|x| (x.risk_level, vec![&x.owner])).collect(),
            Self::Layering(m) => m
                .iter()
                .map(|x| {
                    let mut users = vec![&x.origin];
                    if x.destination.id != x.origin.id {
                        users.push(&x.destination);
                    }
                    (x.risk_level, users)
                })
                .collect(),
            Self::AccountTakeover(m) => m.iter().map(|x| (x.risk_level, vec![&x.user])).collect(),
            Self::NetworkConnections(m) => m
                .iter()
                .map(|x| (x.risk_level, vec![&x.user1, &x.user2]))
                .collect(),
        }
    }

    /// Sum of the risk weights of every match.
    pub fn total_weight(&self) -> u32 {
        self.scored_users()
            .iter()
            .map(|(level, _)| level.weight())
            .sum()
    }
}
