//! Network connections: user pairs linked by shared devices, phones, or email patterns.

use std::collections::HashMap;

use fraudgraph_core::{NodeLabel, RelType, User};

use crate::context::MatchContext;
use crate::error::Result;
use crate::index::{GraphIndex, NodeIdx};
use crate::matchers::device_sharing::users_of_device;
use crate::matchers::Matcher;
use crate::scoring;
use crate::types::NetworkConnectionMatch;

#[derive(Default)]
struct Link {
    shared_devices: u32,
    shares_phone: bool,
    similar_email: bool,
}

/// Score every linked user pair.
///
/// `connection_score = shared_devices + shares_phone + similar_email`, with
/// the two flags counting 1 each regardless of edge direction. Output is
/// ordered by score descending, then user ids.
pub fn find_network_connections(
    index: &GraphIndex,
    ctx: &MatchContext,
) -> Result<Vec<NetworkConnectionMatch>> {
    let config = &ctx.config.network;
    let mut links: HashMap<(&str, &str), (&User, &User, Link)> = HashMap::new();

    for &device_idx in index.nodes_with_label(NodeLabel::Device) {
        ctx.deadline.check(Matcher::NetworkConnections)?;
        let users = users_of_device(index, device_idx);
        for (i, u1) in users.iter().enumerate() {
            for u2 in &users[i + 1..] {
                link_entry(&mut links, *u1, *u2).shared_devices += 1;
            }
        }
    }

    for rel_type in [RelType::SharesPhone, RelType::SimilarEmail] {
        for &pos in index.edges_of_type(rel_type) {
            ctx.deadline.check(Matcher::NetworkConnections)?;
            let edge = index.edge(pos);
            let Some((a, b)) = user_pair(index, edge.source, edge.target) else {
                continue;
            };
            let link = link_entry(&mut links, a, b);
            match rel_type {
                RelType::SharesPhone => link.shares_phone = true,
                _ => link.similar_email = true,
            }
        }
    }

    let mut matches: Vec<NetworkConnectionMatch> = links
        .into_values()
        .map(|(u1, u2, link)| {
            let connection_score =
                link.shared_devices + u32::from(link.shares_phone) + u32::from(link.similar_email);
            NetworkConnectionMatch {
                user1: u1.into(),
                user2: u2.into(),
                shared_devices: link.shared_devices,
                shares_phone: link.shares_phone,
                similar_email: link.similar_email,
                connection_score,
                risk_level: scoring::network_connection_level(connection_score, config),
            }
        })
        .collect();

    matches.sort_by(|a, b| {
        b.connection_score
            .cmp(&a.connection_score)
            .then_with(|| a.user1.id.cmp(&b.user1.id))
            .then_with(|| a.user2.id.cmp(&b.user2.id))
    });

    tracing::debug!(matches = matches.len(), "Network-connection scan complete");
    Ok(matches)
}

/// Resolve two endpoints to distinct users ordered by id.
fn user_pair(index: &GraphIndex, a: NodeIdx, b: NodeIdx) -> Option<(&User, &User)> {
    let (a, b) = (index.user(a)?, index.user(b)?);
    match a.id.cmp(&b.id) {
        std::cmp::Ordering::Less => Some((a, b)),
        std::cmp::Ordering::Greater => Some((b, a)),
        std::cmp::Ordering::Equal => None,
    }
}

fn link_entry<'a, 'm>(
    links: &'m mut HashMap<(&'a str, &'a str), (&'a User, &'a User, Link)>,
    u1: &'a User,
    u2: &'a User,
) -> &'m mut Link {
    &mut links
        .entry((u1.id.as_str(), u2.id.as_str()))
        .or_insert_with(|| (u1, u2, Link::default()))
        .2
}
