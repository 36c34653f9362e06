//! Layered transfers: money hopping start → middle → end in quick succession.
//!
//! Only two-hop chains are detected.

use chrono::{DateTime, Utc};

use crate::context::MatchContext;
use crate::error::Result;
use crate::index::GraphIndex;
use crate::matchers::Matcher;
use crate::scoring;
use crate::types::LayeringMatch;

/// Find chains `t1: start → middle`, `t2: middle → end` where `t1` falls in the
/// lookback window, `t2` follows `t1` within the hop gap, all three accounts
/// differ, and the combined amount exceeds the minimum total.
///
/// Emits one match per (origin owner, destination owner). Chains whose start
/// or end account has no owner are skipped. Output is ordered by total amount
/// descending, then transaction ids, then owner ids.
pub fn find_layering_chains(index: &GraphIndex, ctx: &MatchContext) -> Result<Vec<LayeringMatch>> {
    let config = &ctx.config.layering;
    let mut matches = Vec::new();

    for t1 in index.transfers_within(&ctx.layering_window) {
        ctx.deadline.check(Matcher::Layering)?;
        let (start, middle) = (t1.from, t1.to);
        if start == middle {
            continue;
        }

        let hop_deadline = t1
            .timestamp
            .checked_add_signed(ctx.max_hop_gap)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        for t2 in index.outgoing_between(middle, t1.timestamp, hop_deadline) {
            let end = t2.to;
            if end == middle || end == start {
                continue;
            }

            let total_amount = t1.amount + t2.amount;
            if total_amount <= config.min_total {
                continue;
            }

            let (Some(start_account), Some(middle_account), Some(end_account)) = (
                index.account(start),
                index.account(middle),
                index.account(end),
            ) else {
                continue;
            };

            let origins = index.owners(start);
            let destinations = index.owners(end);
            if origins.is_empty() || destinations.is_empty() {
                tracing::debug!(
                    first = %t1.transaction_id,
                    second = %t2.transaction_id,
                    "Layering chain endpoint has no owner, skipping"
                );
                continue;
            }

            let risk_level = scoring::layering_level(total_amount, config);
            let gap_seconds = (t2.timestamp - t1.timestamp).num_seconds();
            for origin in &origins {
                for destination in &destinations {
                    matches.push(LayeringMatch {
                        origin: (*origin).into(),
                        destination: (*destination).into(),
                        start_account: start_account.id.clone(),
                        middle_account: middle_account.id.clone(),
                        end_account: end_account.id.clone(),
                        origin_bank: start_account.bank.clone(),
                        destination_bank: end_account.bank.clone(),
                        first_transaction: t1.transaction_id.clone(),
                        second_transaction: t2.transaction_id.clone(),
                        amount1: t1.amount,
                        amount2: t2.amount,
                        total_amount,
                        gap_seconds,
                        risk_level,
                    });
                }
            }
        }
    }

    matches.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.first_transaction.cmp(&b.first_transaction))
            .then_with(|| a.second_transaction.cmp(&b.second_transaction))
            .then_with(|| a.origin.id.cmp(&b.origin.id))
            .then_with(|| a.destination.id.cmp(&b.destination.id))
    });

    tracing::debug!(matches = matches.len(), "Layering scan complete");
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{context, Fixture};
    use fraudgraph_core::RiskLevel;
    use rust_decimal_macros::dec;

    fn chain_accounts() -> Fixture {
        Fixture::default()
            .user("U1", 0.9)
            .user("U3", 0.7)
            .account("A1", "Chase")
            .account("A2", "Offshore Bank")
            .account("A3", "Offshore Bank")
            .owns("U1", "A1")
            .owns("U3", "A3")
    }

    #[test]
    fn test_chain_20_minutes_apart_is_medium() {
        let index = chain_accounts()
            .tx("T1", dec!(30000), 40, "A1", "A2")
            .tx("T2", dec!(25000), 20, "A2", "A3")
            .index();

        let matches = find_layering_chains(&index, &context()).unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.origin.id, "U1");
        assert_eq!(m.destination.id, "U3");
        assert_eq!(
            (m.start_account.as_str(), m.middle_account.as_str(), m.end_account.as_str()),
            ("A1", "A2", "A3")
        );
        assert_eq!(m.total_amount, dec!(55000));
        assert_eq!(m.gap_seconds, 20 * 60);
        assert_eq!(m.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_gap_of_exactly_30_minutes_is_excluded() {
        let index = chain_accounts()
            .tx("T1", dec!(30000), 40, "A1", "A2")
            .tx("T2", dec!(30000), 10, "A2", "A3")
            .index();
        assert!(find_layering_chains(&index, &context()).unwrap().is_empty());
    }

    #[test]
    fn test_second_hop_must_follow_first() {
        let index = chain_accounts()
            .tx("T1", dec!(30000), 20, "A1", "A2")
            .tx("T2", dec!(30000), 20, "A2", "A3")
            .tx("T3", dec!(30000), 25, "A2", "A3")
            .index();
        assert!(find_layering_chains(&index, &context()).unwrap().is_empty());
    }

    #[test]
    fn test_first_hop_must_be_within_lookback() {
        let index = chain_accounts()
            .tx("T1", dec!(60000), 60 * 24, "A1", "A2")
            .tx("T2", dec!(60000), 60 * 24 - 10, "A2", "A3")
            .index();
        assert!(find_layering_chains(&index, &context()).unwrap().is_empty());
    }

    #[test]
    fn test_hop_gap_past_the_calendar_end_does_not_overflow() {
        let index = chain_accounts()
            .tx("T1", dec!(30000), 40, "A1", "A2")
            .tx("T2", dec!(30000), 10, "A2", "A3")
            .index();

        let mut ctx = context();
        ctx.max_hop_gap = chrono::Duration::MAX;
        let matches = find_layering_chains(&index, &ctx).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].gap_seconds, 30 * 60);
    }

    #[test]
    fn test_round_trip_is_not_a_chain() {
        let index = chain_accounts()
            .tx("T1", dec!(60000), 20, "A1", "A2")
            .tx("T2", dec!(60000), 10, "A2", "A1")
            .index();
        assert!(find_layering_chains(&index, &context()).unwrap().is_empty());
    }

    #[test]
    fn test_total_must_exceed_minimum() {
        let index = chain_accounts()
            .tx("T1", dec!(25000), 20, "A1", "A2")
            .tx("T2", dec!(25000), 10, "A2", "A3")
            .index();
        assert!(find_layering_chains(&index, &context()).unwrap().is_empty());
    }

    #[test]
    fn test_unowned_endpoint_is_skipped() {
        let index = chain_accounts()
            .account("A4", "Citibank")
            .tx("T1", dec!(60000), 20, "A1", "A2")
            .tx("T2", dec!(60000), 10, "A2", "A4")
            .index();
        assert!(find_layering_chains(&index, &context()).unwrap().is_empty());
    }

    #[test]
    fn test_levels_and_order() {
        let index = chain_accounts()
            .account("A4", "Citibank")
            .owns("U3", "A4")
            .tx("T1", dec!(50000), 20, "A1", "A2")
            .tx("T2", dec!(30000), 15, "A2", "A3")
            .tx("T3", dec!(60000), 10, "A2", "A4")
            .index();

        let matches = find_layering_chains(&index, &context()).unwrap();
        let summary: Vec<(&str, RiskLevel)> = matches
            .iter()
            .map(|m| (m.second_transaction.as_str(), m.risk_level))
            .collect();
        assert_eq!(
            summary,
            vec![("T3", RiskLevel::Critical), ("T2", RiskLevel::High)]
        );
        for m in &matches {
            let gap = m.gap_seconds;
            assert!(gap > 0 && gap < 30 * 60);
            assert_ne!(m.start_account, m.middle_account);
            assert_ne!(m.middle_account, m.end_account);
            assert_ne!(m.start_account, m.end_account);
        }
    }
}
