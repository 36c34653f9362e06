//! Per-run analysis context: the reference time, derived windows, and the timeout budget.

use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};

use fraudgraph_core::AnalysisConfig;

use crate::error::{DetectError, Result};
use crate::matchers::Matcher;

/// A half-open time window `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeBounds {
    /// The window of length `length` ending at `end`.
    pub fn trailing(end: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start: end
                .checked_sub_signed(length)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts > self.start && ts <= self.end
    }
}

/// Wall-clock budget shared by every matcher of a run.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
    budget_ms: u64,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self {
            expires_at: None,
            budget_ms: 0,
        }
    }

    /// A deadline `budget_ms` from now.
    pub fn after_ms(budget_ms: u64) -> Self {
        Self {
            expires_at: Some(Instant::now() + StdDuration::from_millis(budget_ms)),
            budget_ms,
        }
    }

    /// A deadline at a fixed instant.
    pub fn at(expires_at: Instant, budget_ms: u64) -> Self {
        Self {
            expires_at: Some(expires_at),
            budget_ms,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|t| Instant::now() >= t)
    }

    /// Fail `category` with [`DetectError::Timeout`] once the budget is spent.
    pub fn check(&self, category: Matcher) -> Result<()> {
        if self.is_expired() {
            return Err(DetectError::Timeout {
                category,
                budget_ms: self.budget_ms,
            });
        }
        Ok(())
    }
}

/// Everything a matcher needs besides the index.
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub config: AnalysisConfig,
    pub now: DateTime<Utc>,
    /// Rapid-transfer window ending at `now`.
    pub rapid_window: TimeBounds,
    /// Window the first hop of a layering chain must fall in.
    pub layering_window: TimeBounds,
    pub max_hop_gap: Duration,
    pub deadline: Deadline,
}

impl MatchContext {
    /// Derive every window from a validated config and a fixed `now`.
    pub fn new(config: AnalysisConfig, now: DateTime<Utc>) -> Result<Self> {
        config.validate()?;

        let rapid = minutes(config.rapid_transfer.window_minutes, "rapid_transfer.window_minutes")?;
        let lookback = Duration::try_hours(config.layering.lookback_hours).ok_or_else(|| {
            out_of_range("layering.lookback_hours", config.layering.lookback_hours)
        })?;
        let max_hop_gap = minutes(
            config.layering.max_hop_gap_minutes,
            "layering.max_hop_gap_minutes",
        )?;
        let deadline = config.timeout_ms.map_or_else(Deadline::none, Deadline::after_ms);

        Ok(Self {
            rapid_window: TimeBounds::trailing(now, rapid),
            layering_window: TimeBounds::trailing(now, lookback),
            max_hop_gap,
            deadline,
            now,
            config,
        })
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }
}

fn minutes(value: i64, field: &str) -> Result<Duration> {
    Duration::try_minutes(value).ok_or_else(|| out_of_range(field, value))
}

fn out_of_range(field: &str, value: i64) -> DetectError {
    fraudgraph_core::CoreError::Config(format!("{field} is out of range: {value}")).into()
}
