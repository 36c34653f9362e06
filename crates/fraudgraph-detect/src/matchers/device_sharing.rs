//! Device-sharing rings: distinct users signing in from the same device.

use fraudgraph_core::{Direction, NodeLabel, RelType, User};

use crate::context::MatchContext;
use crate::error::Result;
use crate::index::GraphIndex;
use crate::matchers::Matcher;
use crate::scoring;
use crate::types::DeviceSharingMatch;

/// Emit one match per unordered user pair per shared device.
///
/// Repeated USES edges between the same user and device count once. Output
/// is ordered by average risk descending, then user ids, then device id.
pub fn find_device_sharing(index: &GraphIndex, ctx: &MatchContext) -> Result<Vec<DeviceSharingMatch>> {
    let config = &ctx.config.device_sharing;
    let mut matches = Vec::new();

    for &device_idx in index.nodes_with_label(NodeLabel::Device) {
        ctx.deadline.check(Matcher::DeviceSharing)?;
        let Some(device) = index.device(device_idx) else {
            continue;
        };

        let users = users_of_device(index, device_idx);
        for (i, u1) in users.iter().enumerate() {
            for u2 in &users[i + 1..] {
                let avg_risk = (u1.risk_score + u2.risk_score) / 2.0;
                matches.push(DeviceSharingMatch {
                    user1: (*u1).into(),
                    user2: (*u2).into(),
                    device_id: device.id.clone(),
                    ip: device.ip.clone(),
                    location: device.location.clone(),
                    avg_risk,
                    risk_level: scoring::device_sharing_level(avg_risk, config),
                });
            }
        }
    }

    matches.sort_by(|a, b| {
        b.avg_risk
            .total_cmp(&a.avg_risk)
            .then_with(|| a.user1.id.cmp(&b.user1.id))
            .then_with(|| a.user2.id.cmp(&b.user2.id))
            .then_with(|| a.device_id.cmp(&b.device_id))
    });

    tracing::debug!(matches = matches.len(), "Device-sharing scan complete");
    Ok(matches)
}

/// Distinct users of a device, ordered by user id.
pub(crate) fn users_of_device(index: &GraphIndex, device: usize) -> Vec<&User> {
    let mut users: Vec<&User> = index
        .neighbors(device, RelType::Uses, Direction::Incoming)
        .into_iter()
        .filter_map(|idx| index.user(idx))
        .collect();
    users.sort_by(|a, b| a.id.cmp(&b.id));
    users
}
