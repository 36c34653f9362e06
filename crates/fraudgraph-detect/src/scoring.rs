//! Risk classification for fraud matches.
//!
//! Each matcher reduces its raw statistics to a [`RiskLevel`] through a
//! threshold table taken from [`AnalysisConfig`](fraudgraph_core::AnalysisConfig).
//! Levels are normalized to numeric weights by [`RiskLevel::weight`].

use rust_decimal::Decimal;

use fraudgraph_core::config::{
    AccountTakeoverConfig, DeviceSharingConfig, LargeTransactionConfig, LayeringConfig,
    NetworkConnectionConfig, RapidTransferConfig,
};
use fraudgraph_core::RiskLevel;

/// Exposure weights for high-risk users, suspicious transactions,
/// device-sharing incidents and offshore accounts.
pub const EXPOSURE_WEIGHTS: [f64; 4] = [0.3, 0.2, 0.3, 0.2];

pub fn device_sharing_level(avg_risk: f64, config: &DeviceSharingConfig) -> RiskLevel {
    if avg_risk > config.high_avg_risk_above {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

/// HIGH from `high_transfers`, MEDIUM from `medium_transfers`, else LOW.
///
/// LOW is reachable only when the amount rule alone triggered the match.
pub fn rapid_transfer_level(transfer_count: u32, config: &RapidTransferConfig) -> RiskLevel {
    if transfer_count >= config.high_transfers {
        RiskLevel::High
    } else if transfer_count >= config.medium_transfers {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Called only for amounts above the floor, so the lowest level is MEDIUM.
pub fn large_transaction_level(amount: Decimal, config: &LargeTransactionConfig) -> RiskLevel {
    if amount > config.critical_above {
        RiskLevel::Critical
    } else if amount > config.high_above {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

pub fn layering_level(total_amount: Decimal, config: &LayeringConfig) -> RiskLevel {
    if total_amount > config.critical_above {
        RiskLevel::Critical
    } else if total_amount > config.high_above {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

pub fn account_takeover_level(score: u32, config: &AccountTakeoverConfig) -> RiskLevel {
    if score >= config.critical_score {
        RiskLevel::Critical
    } else if score >= config.high_score {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

pub fn network_connection_level(score: u32, config: &NetworkConnectionConfig) -> RiskLevel {
    if score >= config.critical_score {
        RiskLevel::Critical
    } else if score >= config.high_score {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

/// Weighted blend of the four census counts.
pub fn weighted_exposure(
    high_risk_users: usize,
    suspicious_transactions: usize,
    device_sharing_incidents: usize,
    offshore_accounts: usize,
) -> f64 {
    let counts = [
        high_risk_users,
        suspicious_transactions,
        device_sharing_incidents,
        offshore_accounts,
    ];
    counts
        .iter()
        .zip(EXPOSURE_WEIGHTS)
        .map(|(&count, weight)| count as f64 * weight)
        .sum()
}
