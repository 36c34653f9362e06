//! Aggregation of matcher outcomes into a [`FraudReport`].

use std::collections::HashMap;

use fraudgraph_core::NodeLabel;

use crate::context::MatchContext;
use crate::error::Result;
use crate::index::GraphIndex;
use crate::matchers::{MatchSet, Matcher};
use crate::scoring;
use crate::types::{CategoryOutcome, CategoryReport, FraudReport, FraudSummary, Offender, UserRef};

/// Census counts taken straight from the indexed entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCensus {
    pub high_risk_users: usize,
    pub suspicious_transactions: usize,
    pub offshore_accounts: usize,
}

pub fn entity_census(index: &GraphIndex, ctx: &MatchContext) -> EntityCensus {
    let summary = &ctx.config.summary;
    let floor = ctx.config.large_transaction.floor;

    let high_risk_users = index
        .nodes_with_label(NodeLabel::User)
        .iter()
        .filter_map(|&idx| index.user(idx))
        .filter(|u| u.risk_score > summary.high_risk_user_threshold)
        .count();

    let suspicious_transactions = index
        .nodes_with_label(NodeLabel::Transaction)
        .iter()
        .filter_map(|&idx| index.transaction(idx))
        .filter(|t| t.amount > floor || t.status == summary.pending_status)
        .count();

    let offshore_accounts = index
        .nodes_with_label(NodeLabel::Account)
        .iter()
        .filter_map(|&idx| index.account(idx))
        .filter(|a| a.bank == summary.offshore_bank)
        .count();

    EntityCensus {
        high_risk_users,
        suspicious_transactions,
        offshore_accounts,
    }
}

/// Merge matcher results into a report.
///
/// Categories appear in [`Matcher::ALL`] order. A failed category contributes
/// nothing to the totals and is listed in `failed_categories`.
pub fn aggregate(
    index: &GraphIndex,
    ctx: &MatchContext,
    results: Vec<(Matcher, Result<MatchSet>)>,
) -> FraudReport {
    let mut results: HashMap<Matcher, Result<MatchSet>> = results.into_iter().collect();
    let mut categories = Vec::with_capacity(Matcher::ALL.len());
    let mut failed_categories = Vec::new();

    for matcher in Matcher::ALL {
        let outcome = match results.remove(&matcher) {
            Some(Ok(matches)) => CategoryOutcome::Completed {
                match_count: matches.len(),
                matches,
            },
            Some(Err(e)) => {
                failed_categories.push(matcher);
                CategoryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            None => {
                failed_categories.push(matcher);
                CategoryOutcome::Failed {
                    reason: "matcher did not run".to_string(),
                }
            }
        };
        categories.push(CategoryReport {
            category: matcher,
            outcome,
        });
    }

    let completed: Vec<&MatchSet> = categories
        .iter()
        .filter_map(|c| c.outcome.matches())
        .collect();

    let census = entity_census(index, ctx);
    let device_sharing_incidents = categories
        .iter()
        .find(|c| c.category == Matcher::DeviceSharing)
        .and_then(|c| c.outcome.matches())
        .map_or(0, MatchSet::len);

    let summary = FraudSummary {
        high_risk_users: census.high_risk_users,
        suspicious_transactions: census.suspicious_transactions,
        device_sharing_incidents,
        offshore_accounts: census.offshore_accounts,
        total_risk_score: completed.iter().map(|m| m.total_weight()).sum(),
        weighted_exposure: scoring::weighted_exposure(
            census.high_risk_users,
            census.suspicious_transactions,
            device_sharing_incidents,
            census.offshore_accounts,
        ),
    };

    let top_offenders = top_offenders(&completed, ctx.config.summary.top_offenders);

    FraudReport {
        now: ctx.now,
        summary,
        top_offenders,
        graph_stats: index.stats(),
        categories,
        failed_categories,
    }
}

/// Rank users by the accumulated weight of the matches naming them.
fn top_offenders(completed: &[&MatchSet], limit: usize) -> Vec<Offender> {
    let mut tally: HashMap<&str, (UserRef, u32, usize)> = HashMap::new();

    for set in completed {
        for (level, users) in set.scored_users() {
            for user in users {
                let entry = tally
                    .entry(user.id.as_str())
                    .or_insert_with(|| (user.clone(), 0, 0));
                entry.1 += level.weight();
                entry.2 += 1;
            }
        }
    }

    let mut offenders: Vec<Offender> = tally
        .into_values()
        .map(|(user, weight, match_count)| Offender {
            user,
            weight,
            match_count,
        })
        .collect();
    offenders.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.user.id.cmp(&b.user.id)));
    offenders.truncate(limit);
    offenders
}
