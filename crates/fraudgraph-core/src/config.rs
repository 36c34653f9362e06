//! Configuration for fraud analysis runs.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`FRAUDGRAPH_` prefix, `__` separator)
//! 2. Config file (`fraudgraph.toml`, `[analysis]` section)
//! 3. Defaults

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Top-level analysis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub device_sharing: DeviceSharingConfig,

    #[serde(default)]
    pub rapid_transfer: RapidTransferConfig,

    #[serde(default)]
    pub large_transaction: LargeTransactionConfig,

    #[serde(default)]
    pub layering: LayeringConfig,

    #[serde(default)]
    pub account_takeover: AccountTakeoverConfig,

    #[serde(default)]
    pub network: NetworkConnectionConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    /// Reference "now" for every time window. Read from the clock once per run if unset.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,

    /// Wall-clock budget for a single analysis run, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Device-sharing risk cut point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceSharingConfig {
    /// Pairs whose average user risk is above this are HIGH, otherwise MEDIUM.
    pub high_avg_risk_above: f64,
}

impl Default for DeviceSharingConfig {
    fn default() -> Self {
        Self {
            high_avg_risk_above: 0.5,
        }
    }
}

/// Rapid-transfer window, emission thresholds, and cut points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RapidTransferConfig {
    /// Window length ending at "now".
    pub window_minutes: i64,
    /// Emit when at least this many transfers fall in the window.
    pub min_transfers: u32,
    /// ...or when the window total is above this amount.
    pub amount_above: Decimal,
    /// MEDIUM at or above this many transfers.
    pub medium_transfers: u32,
    /// HIGH at or above this many transfers.
    pub high_transfers: u32,
}

impl Default for RapidTransferConfig {
    fn default() -> Self {
        Self {
            window_minutes: 30,
            min_transfers: 3,
            amount_above: Decimal::from(100_000),
            medium_transfers: 3,
            high_transfers: 5,
        }
    }
}

/// Large-transaction floor and cut points. All comparisons are strict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LargeTransactionConfig {
    pub floor: Decimal,
    pub high_above: Decimal,
    pub critical_above: Decimal,
}

impl Default for LargeTransactionConfig {
    fn default() -> Self {
        Self {
            floor: Decimal::from(10_000),
            high_above: Decimal::from(25_000),
            critical_above: Decimal::from(50_000),
        }
    }
}

/// Layered-transfer windows and cut points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayeringConfig {
    /// The first hop must fall within this many hours before "now".
    pub lookback_hours: i64,
    /// The second hop must follow the first within this many minutes.
    pub max_hop_gap_minutes: i64,
    /// Chains whose combined amount is not above this are ignored.
    pub min_total: Decimal,
    pub high_above: Decimal,
    pub critical_above: Decimal,
}

impl Default for LayeringConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 24,
            max_hop_gap_minutes: 30,
            min_total: Decimal::from(50_000),
            high_above: Decimal::from(75_000),
            critical_above: Decimal::from(100_000),
        }
    }
}

/// Account-takeover indicator thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccountTakeoverConfig {
    /// Users need strictly more devices than this to be considered.
    pub device_count_above: u32,
    pub high_score: u32,
    pub critical_score: u32,
    /// Device location value that marks untrusted geolocation.
    pub unknown_location: String,
}

impl Default for AccountTakeoverConfig {
    fn default() -> Self {
        Self {
            device_count_above: 2,
            high_score: 5,
            critical_score: 8,
            unknown_location: "Unknown".to_string(),
        }
    }
}

/// Network-connection cut points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConnectionConfig {
    pub high_score: u32,
    pub critical_score: u32,
}

impl Default for NetworkConnectionConfig {
    fn default() -> Self {
        Self {
            high_score: 2,
            critical_score: 3,
        }
    }
}

/// Report-level census settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummaryConfig {
    /// Users with a risk score above this count as high risk.
    pub high_risk_user_threshold: f64,
    /// Bank name flagged as offshore.
    pub offshore_bank: String,
    /// Transaction status counted as suspicious regardless of amount.
    pub pending_status: String,
    /// Number of users listed as top offenders.
    pub top_offenders: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            high_risk_user_threshold: 0.7,
            offshore_bank: "Offshore Bank".to_string(),
            pending_status: "pending".to_string(),
            top_offenders: 5,
        }
    }
}

impl AnalysisConfig {
    /// Check every threshold before any matcher runs.
    pub fn validate(&self) -> Result<()> {
        let rt = &self.rapid_transfer;
        positive_minutes("rapid_transfer.window_minutes", rt.window_minutes)?;
        if rt.min_transfers == 0 {
            return Err(invalid("rapid_transfer.min_transfers must be at least 1"));
        }
        non_negative("rapid_transfer.amount_above", rt.amount_above)?;
        if rt.medium_transfers > rt.high_transfers {
            return Err(invalid(
                "rapid_transfer.medium_transfers must not exceed high_transfers",
            ));
        }

        let lt = &self.large_transaction;
        non_negative("large_transaction.floor", lt.floor)?;
        ordered("large_transaction", lt.floor, lt.high_above, lt.critical_above)?;

        let ly = &self.layering;
        if ly.lookback_hours <= 0 || ly.lookback_hours > MAX_LOOKBACK_HOURS {
            return Err(invalid(format!(
                "layering.lookback_hours must be between 1 and {MAX_LOOKBACK_HOURS}, got {}",
                ly.lookback_hours
            )));
        }
        positive_minutes("layering.max_hop_gap_minutes", ly.max_hop_gap_minutes)?;
        non_negative("layering.min_total", ly.min_total)?;
        ordered("layering", ly.min_total, ly.high_above, ly.critical_above)?;

        let at = &self.account_takeover;
        if at.high_score > at.critical_score {
            return Err(invalid(
                "account_takeover.high_score must not exceed critical_score",
            ));
        }

        let nc = &self.network;
        if nc.high_score > nc.critical_score {
            return Err(invalid("network.high_score must not exceed critical_score"));
        }

        unit_interval(
            "device_sharing.high_avg_risk_above",
            self.device_sharing.high_avg_risk_above,
        )?;
        unit_interval(
            "summary.high_risk_user_threshold",
            self.summary.high_risk_user_threshold,
        )?;

        if self.timeout_ms == Some(0) {
            return Err(invalid("timeout_ms must be positive when set"));
        }

        Ok(())
    }
}

/// Load the analysis configuration from `<file_prefix>.toml` and `FRAUDGRAPH__` env vars.
///
/// A missing `[analysis]` section yields the defaults. The result is validated.
pub fn load_analysis_config(file_prefix: &str) -> Result<AnalysisConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("FRAUDGRAPH")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let analysis = match cfg.get::<AnalysisConfig>("analysis") {
        Ok(c) => c,
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(file_prefix, "No [analysis] section, using defaults");
            AnalysisConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    analysis.validate()?;
    Ok(analysis)
}

fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::Config(msg.into())
}

/// One year. Window arithmetic against any plausible `now` stays in range.
const MAX_WINDOW_MINUTES: i64 = 365 * 24 * 60;
const MAX_LOOKBACK_HOURS: i64 = 365 * 24;

fn positive_minutes(field: &str, minutes: i64) -> Result<()> {
    if minutes <= 0 || minutes > MAX_WINDOW_MINUTES {
        return Err(invalid(format!(
            "{field} must be between 1 and {MAX_WINDOW_MINUTES} minutes, got {minutes}"
        )));
    }
    Ok(())
}

fn non_negative(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(invalid(format!("{field} must not be negative, got {value}")));
    }
    Ok(())
}

fn ordered(section: &str, floor: Decimal, high: Decimal, critical: Decimal) -> Result<()> {
    if floor > high || high > critical {
        return Err(invalid(format!(
            "{section} cut points must be ordered (floor {floor} <= high {high} <= critical {critical})"
        )));
    }
    Ok(())
}

fn unit_interval(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{field} must be within [0, 1], got {value}")));
    }
    Ok(())
}
