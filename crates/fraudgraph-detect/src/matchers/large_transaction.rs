//! Large transactions attributed to the owners of the sending account.

use crate::context::MatchContext;
use crate::error::Result;
use crate::index::GraphIndex;
use crate::matchers::Matcher;
use crate::scoring;
use crate::types::LargeTransactionMatch;

/// Emit one match per owner of the source account for every transfer above the floor.
///
/// Transfers from accounts with no owner are skipped. Output is ordered by
/// amount descending, then transaction id, then owner id.
pub fn find_large_transactions(
    index: &GraphIndex,
    ctx: &MatchContext,
) -> Result<Vec<LargeTransactionMatch>> {
    let config = &ctx.config.large_transaction;
    let mut matches = Vec::new();

    for transfer in index.timeline() {
        ctx.deadline.check(Matcher::LargeTransaction)?;
        if transfer.amount <= config.floor {
            continue;
        }

        let (Some(transaction), Some(from), Some(to)) = (
            index.transaction(transfer.transaction),
            index.account(transfer.from),
            index.account(transfer.to),
        ) else {
            continue;
        };

        let owners = index.owners(transfer.from);
        if owners.is_empty() {
            tracing::debug!(
                transaction = %transaction.id,
                account = %from.id,
                "Source account has no owner, skipping"
            );
            continue;
        }

        let risk_level = scoring::large_transaction_level(transfer.amount, config);
        for owner in owners {
            matches.push(LargeTransactionMatch {
                transaction_id: transaction.id.clone(),
                owner: owner.into(),
                amount: transaction.amount,
                timestamp: transaction.timestamp,
                status: transaction.status.clone(),
                from_account: from.id.clone(),
                from_bank: from.bank.clone(),
                to_account: to.id.clone(),
                to_bank: to.bank.clone(),
                risk_level,
            });
        }
    }

    matches.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.transaction_id.cmp(&b.transaction_id))
            .then_with(|| a.owner.id.cmp(&b.owner.id))
    });

    tracing::debug!(matches = matches.len(), "Large-transaction scan complete");
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{context, Fixture};
    use fraudgraph_core::RiskLevel;
    use rust_decimal_macros::dec;

    fn ring() -> Fixture {
        Fixture::default()
            .user("U102", 0.8)
            .account("A103", "Offshore Bank")
            .account("A101", "Offshore Bank")
            .owns("U102", "A103")
    }

    #[test]
    fn test_offshore_100k_is_critical() {
        let index = ring()
            .tx_with_status("T103", dec!(100000), 5, "A103", "A101", "pending")
            .index();

        let matches = find_large_transactions(&index, &context()).unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.transaction_id, "T103");
        assert_eq!(m.owner.id, "U102");
        assert_eq!(m.from_bank, "Offshore Bank");
        assert_eq!(m.to_account, "A101");
        assert_eq!(m.status, "pending");
        assert_eq!(m.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_floor_is_exclusive() {
        let index = ring()
            .tx("T1", dec!(10000), 5, "A103", "A101")
            .tx("T2", dec!(10000.01), 5, "A103", "A101")
            .index();

        let matches = find_large_transactions(&index, &context()).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].transaction_id, "T2");
        assert_eq!(matches[0].risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_unowned_source_is_skipped() {
        let index = ring().tx("T1", dec!(80000), 5, "A101", "A103").index();
        assert!(find_large_transactions(&index, &context()).unwrap().is_empty());
    }

    #[test]
    fn test_one_match_per_owner() {
        let index = ring()
            .user("U001", 0.1)
            .owns("U001", "A103")
            .tx("T1", dec!(30000), 5, "A103", "A101")
            .index();

        let matches = find_large_transactions(&index, &context()).unwrap();
        let owners: Vec<&str> = matches.iter().map(|m| m.owner.id.as_str()).collect();
        assert_eq!(owners, vec!["U001", "U102"]);
        assert!(matches.iter().all(|m| m.risk_level == RiskLevel::High));
    }

    #[test]
    fn test_not_restricted_to_a_time_window() {
        let index = ring()
            .tx("T1", dec!(20000), 60 * 24 * 7, "A103", "A101")
            .tx("T2", dec!(60000), 5, "A103", "A101")
            .index();

        let matches = find_large_transactions(&index, &context()).unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["T2", "T1"]);
    }
}
