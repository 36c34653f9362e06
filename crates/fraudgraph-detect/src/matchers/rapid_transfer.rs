//! Rapid transfers: bursts of money moving between one ordered account pair.

use rust_decimal::Decimal;

use crate::context::MatchContext;
use crate::error::Result;
use crate::index::{GraphIndex, Transfer};
use crate::matchers::Matcher;
use crate::scoring;
use crate::types::RapidTransferMatch;

/// Evaluate the trailing window `(now - W, now]` for every ordered account pair.
///
/// A pair matches with at least `min_transfers` transfers in the window or a
/// window total above `amount_above`. Output is ordered by total amount
/// descending, then account ids.
pub fn find_rapid_transfers(index: &GraphIndex, ctx: &MatchContext) -> Result<Vec<RapidTransferMatch>> {
    let config = &ctx.config.rapid_transfer;
    let mut matches = Vec::new();

    for (from, to, transfers) in index.account_pairs() {
        ctx.deadline.check(Matcher::RapidTransfer)?;

        let window = scan_window(&transfers, ctx);
        if window.is_empty() {
            continue;
        }

        let transfer_count = window.len() as u32;
        let total_amount: Decimal = window.iter().map(|t| t.amount).sum();
        if transfer_count < config.min_transfers && total_amount <= config.amount_above {
            continue;
        }

        let (Some(from_account), Some(to_account)) = (index.account(from), index.account(to))
        else {
            continue;
        };

        matches.push(RapidTransferMatch {
            from_account: from_account.id.clone(),
            from_bank: from_account.bank.clone(),
            to_account: to_account.id.clone(),
            to_bank: to_account.bank.clone(),
            transfer_count,
            total_amount,
            transaction_ids: window.iter().map(|t| t.transaction_id.clone()).collect(),
            risk_level: scoring::rapid_transfer_level(transfer_count, config),
        });
    }

    matches.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.from_account.cmp(&b.from_account))
            .then_with(|| a.to_account.cmp(&b.to_account))
    });

    tracing::debug!(matches = matches.len(), "Rapid-transfer scan complete");
    Ok(matches)
}

/// Walk back from the latest transfer not after `now` until one falls at or
/// before the window start. Returns the window oldest first.
fn scan_window<'a>(transfers: &[&'a Transfer], ctx: &MatchContext) -> Vec<&'a Transfer> {
    let bounds = ctx.rapid_window;
    let latest = transfers.partition_point(|t| t.timestamp <= bounds.end);

    let mut window: Vec<&Transfer> = transfers[..latest]
        .iter()
        .rev()
        .take_while(|t| t.timestamp > bounds.start)
        .copied()
        .collect();
    window.reverse();
    window
}
