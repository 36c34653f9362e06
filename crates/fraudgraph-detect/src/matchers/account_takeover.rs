//! Account-takeover indicators: users spread across many devices and accounts.

use fraudgraph_core::{Direction, NodeLabel, RelType};

use crate::context::MatchContext;
use crate::error::Result;
use crate::index::GraphIndex;
use crate::matchers::Matcher;
use crate::scoring;
use crate::types::AccountTakeoverMatch;

/// Score every user with more than `device_count_above` distinct devices.
///
/// `score = device_count + account_count + unknown_location_devices`. Output
/// is ordered by score descending, then user id.
pub fn find_takeover_indicators(
    index: &GraphIndex,
    ctx: &MatchContext,
) -> Result<Vec<AccountTakeoverMatch>> {
    let config = &ctx.config.account_takeover;
    let mut matches = Vec::new();

    for &user_idx in index.nodes_with_label(NodeLabel::User) {
        ctx.deadline.check(Matcher::AccountTakeover)?;
        let Some(user) = index.user(user_idx) else {
            continue;
        };

        let devices = index.neighbors(user_idx, RelType::Uses, Direction::Outgoing);
        let device_count = devices.len() as u32;
        if device_count <= config.device_count_above {
            continue;
        }

        let account_count =
            index.neighbors(user_idx, RelType::Owns, Direction::Outgoing).len() as u32;
        let unknown_location_devices = devices
            .iter()
            .filter_map(|&idx| index.device(idx))
            .filter(|d| d.location == config.unknown_location)
            .count() as u32;

        let score = device_count + account_count + unknown_location_devices;
        matches.push(AccountTakeoverMatch {
            user: user.into(),
            device_count,
            account_count,
            unknown_location_devices,
            score,
            risk_level: scoring::account_takeover_level(score, config),
        });
    }

    matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.user.id.cmp(&b.user.id)));

    tracing::debug!(matches = matches.len(), "Account-takeover scan complete");
    Ok(matches)
}
