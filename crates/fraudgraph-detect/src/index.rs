//! In-memory graph index for pattern matching.
//!
//! Converts typed nodes and relationships into compact lookup structures:
//! node-by-key, adjacency lists keyed by `(node, type, direction)`, a
//! timestamp-ordered transfer timeline, and relationship lists by type.
//! The index is append-only; an [`IndexHandle`] publishes sealed versions
//! to readers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use fraudgraph_core::{
    Account, Device, Direction, Node, NodeKey, NodeLabel, RelProperties, RelType, Relationship,
    RelationshipId, Transaction, User,
};

use crate::context::TimeBounds;
use crate::error::{DetectError, Result};
use crate::ingest::{validate_node, GraphSnapshot};
use crate::types::GraphStats;

/// Dense node position (0..N-1).
pub type NodeIdx = usize;
/// Dense relationship position (0..E-1).
pub type EdgeIdx = usize;

/// A relationship with both endpoints resolved to node positions.
#[derive(Debug, Clone)]
pub struct IndexedEdge {
    pub id: RelationshipId,
    pub rel_type: RelType,
    pub source: NodeIdx,
    pub target: NodeIdx,
    pub properties: RelProperties,
}

/// A transaction with both a source and a destination account.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub transaction: NodeIdx,
    pub transaction_id: String,
    pub from: NodeIdx,
    pub to: NodeIdx,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Transfer {
    fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.timestamp, self.transaction_id.as_str())
    }
}

/// The in-memory graph index.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    nodes: Vec<Node>,
    node_index: HashMap<NodeKey, NodeIdx>,
    by_label: HashMap<NodeLabel, Vec<NodeIdx>>,

    edges: Vec<IndexedEdge>,
    edge_ids: HashSet<RelationshipId>,
    adjacency: HashMap<(NodeIdx, RelType, Direction), Vec<EdgeIdx>>,
    edges_by_type: HashMap<RelType, Vec<EdgeIdx>>,

    /// Transaction → account that SENDS it.
    sources: HashMap<NodeIdx, NodeIdx>,
    /// Transaction → account it is RECEIVED by.
    destinations: HashMap<NodeIdx, NodeIdx>,
    transfers: HashMap<NodeIdx, Transfer>,
    /// Every transfer ordered by `(timestamp, transaction id)`.
    timeline: Vec<NodeIdx>,
    /// Per source account, ordered like `timeline`.
    outgoing_transfers: HashMap<NodeIdx, Vec<NodeIdx>>,
    /// Per ordered `(from, to)` account pair, ordered like `timeline`.
    pair_transfers: HashMap<(NodeIdx, NodeIdx), Vec<NodeIdx>>,

    version: u64,
}

impl GraphIndex {
    /// Build from a full snapshot.
    pub fn build(snapshot: GraphSnapshot) -> Result<Self> {
        let mut index = Self::default();
        index.insert_batch(snapshot)?;
        tracing::info!(
            nodes = index.nodes.len(),
            relationships = index.edges.len(),
            transfers = index.timeline.len(),
            "Built graph index"
        );
        Ok(index)
    }

    /// Append new records without a rebuild.
    ///
    /// The batch is validated in full first; on error the index is unchanged.
    pub fn append(&mut self, batch: GraphSnapshot) -> Result<()> {
        let nodes = batch.nodes.len();
        let relationships = batch.relationships.len();
        self.insert_batch(batch)?;
        self.version += 1;
        tracing::info!(
            nodes,
            relationships,
            version = self.version,
            "Appended to graph index"
        );
        Ok(())
    }

    /// Check a batch against the current index without applying it.
    pub fn check_batch(&self, batch: &GraphSnapshot) -> Result<()> {
        let mut new_keys: HashSet<NodeKey> = HashSet::with_capacity(batch.nodes.len());
        for node in &batch.nodes {
            validate_node(node)?;
            let key = node.key();
            if self.node_index.contains_key(&key) || new_keys.contains(&key) {
                return Err(DetectError::DuplicateNode {
                    key: key.to_string(),
                });
            }
            new_keys.insert(key);
        }

        let mut batch_ids: HashSet<RelationshipId> = HashSet::new();
        let mut staged_sources: HashMap<&str, &str> = HashMap::new();
        let mut staged_destinations: HashMap<&str, &str> = HashMap::new();

        for rel in &batch.relationships {
            if self.edge_ids.contains(&rel.id) || !batch_ids.insert(rel.id) {
                continue;
            }

            for key in [rel.source_key(), rel.target_key()] {
                if !self.node_index.contains_key(&key) && !new_keys.contains(&key) {
                    return Err(DetectError::IndexInconsistency(format!(
                        "{} relationship {} references unknown node {key}",
                        rel.rel_type, rel.id
                    )));
                }
            }

            match rel.rel_type {
                RelType::Sends => self.check_single_endpoint(
                    &mut staged_sources,
                    &self.sources,
                    &rel.target_id,
                    &rel.source_id,
                    "source",
                )?,
                RelType::Receives => self.check_single_endpoint(
                    &mut staged_destinations,
                    &self.destinations,
                    &rel.source_id,
                    &rel.target_id,
                    "destination",
                )?,
                _ => {}
            }
        }
        Ok(())
    }

    /// A transaction may be linked to one source and one destination account.
    fn check_single_endpoint<'a>(
        &self,
        staged: &mut HashMap<&'a str, &'a str>,
        existing: &HashMap<NodeIdx, NodeIdx>,
        transaction_id: &'a str,
        account_id: &'a str,
        role: &str,
    ) -> Result<()> {
        let current = self
            .lookup(&NodeKey::new(NodeLabel::Transaction, transaction_id))
            .and_then(|tx| existing.get(&tx))
            .map(|&account| self.nodes[account].id())
            .or_else(|| staged.get(transaction_id).copied());

        match current {
            Some(other) if other != account_id => Err(DetectError::IndexInconsistency(format!(
                "transaction {transaction_id} has a second {role} account: {other} and {account_id}"
            ))),
            Some(_) => Ok(()),
            None => {
                staged.insert(transaction_id, account_id);
                Ok(())
            }
        }
    }

    fn insert_batch(&mut self, batch: GraphSnapshot) -> Result<()> {
        self.check_batch(&batch)?;

        for node in batch.nodes {
            let idx = self.nodes.len();
            self.node_index.insert(node.key(), idx);
            self.by_label.entry(node.label()).or_default().push(idx);
            self.nodes.push(node);
        }

        for rel in batch.relationships {
            self.insert_relationship(rel)?;
        }
        Ok(())
    }

    fn insert_relationship(&mut self, rel: Relationship) -> Result<()> {
        if !self.edge_ids.insert(rel.id) {
            tracing::debug!(id = %rel.id, "Relationship already indexed, skipping");
            return Ok(());
        }

        let source = self.resolve(&rel.source_key())?;
        let target = self.resolve(&rel.target_key())?;

        let pos = self.edges.len();
        self.adjacency
            .entry((source, rel.rel_type, Direction::Outgoing))
            .or_default()
            .push(pos);
        self.adjacency
            .entry((target, rel.rel_type, Direction::Incoming))
            .or_default()
            .push(pos);
        self.edges_by_type.entry(rel.rel_type).or_default().push(pos);

        match rel.rel_type {
            RelType::Sends => {
                self.sources.insert(target, source);
                self.link_transfer(target)?;
            }
            RelType::Receives => {
                self.destinations.insert(source, target);
                self.link_transfer(source)?;
            }
            _ => {}
        }

        self.edges.push(IndexedEdge {
            id: rel.id,
            rel_type: rel.rel_type,
            source,
            target,
            properties: rel.properties,
        });
        Ok(())
    }

    /// Promote a transaction to a transfer once both endpoints are known.
    fn link_transfer(&mut self, tx: NodeIdx) -> Result<()> {
        if self.transfers.contains_key(&tx) {
            return Ok(());
        }
        let (Some(&from), Some(&to)) = (self.sources.get(&tx), self.destinations.get(&tx)) else {
            return Ok(());
        };
        let transaction = self.nodes[tx].as_transaction().ok_or_else(|| {
            DetectError::IndexInconsistency(format!(
                "node {} is linked as a transaction but is not one",
                self.nodes[tx].key()
            ))
        })?;

        self.transfers.insert(
            tx,
            Transfer {
                transaction: tx,
                transaction_id: transaction.id.clone(),
                from,
                to,
                amount: transaction.amount,
                timestamp: transaction.timestamp,
            },
        );
        insert_sorted(&mut self.timeline, &self.transfers, tx);
        insert_sorted(
            self.outgoing_transfers.entry(from).or_default(),
            &self.transfers,
            tx,
        );
        insert_sorted(
            self.pair_transfers.entry((from, to)).or_default(),
            &self.transfers,
            tx,
        );
        Ok(())
    }

    fn resolve(&self, key: &NodeKey) -> Result<NodeIdx> {
        self.lookup(key).ok_or_else(|| {
            DetectError::IndexInconsistency(format!("relationship references unknown node {key}"))
        })
    }

    // ── Nodes ────────────────────────────────────────────────────

    pub fn lookup(&self, key: &NodeKey) -> Option<NodeIdx> {
        self.node_index.get(key).copied()
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx]
    }

    pub fn user(&self, idx: NodeIdx) -> Option<&User> {
        self.nodes.get(idx).and_then(Node::as_user)
    }

    pub fn device(&self, idx: NodeIdx) -> Option<&Device> {
        self.nodes.get(idx).and_then(Node::as_device)
    }

    pub fn account(&self, idx: NodeIdx) -> Option<&Account> {
        self.nodes.get(idx).and_then(Node::as_account)
    }

    pub fn transaction(&self, idx: NodeIdx) -> Option<&Transaction> {
        self.nodes.get(idx).and_then(Node::as_transaction)
    }

    /// Node positions carrying `label`, in insertion order.
    pub fn nodes_with_label(&self, label: NodeLabel) -> &[NodeIdx] {
        self.by_label.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    // ── Relationships ────────────────────────────────────────────

    pub fn edge(&self, pos: EdgeIdx) -> &IndexedEdge {
        &self.edges[pos]
    }

    /// Relationships of `rel_type` anchored at `node`, in insertion order.
    pub fn edges_at(&self, node: NodeIdx, rel_type: RelType, direction: Direction) -> &[EdgeIdx] {
        self.adjacency
            .get(&(node, rel_type, direction))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct nodes on the far side of `rel_type` edges, in first-seen order.
    pub fn neighbors(&self, node: NodeIdx, rel_type: RelType, direction: Direction) -> Vec<NodeIdx> {
        let mut seen = HashSet::new();
        self.edges_at(node, rel_type, direction)
            .iter()
            .map(|&pos| {
                let edge = &self.edges[pos];
                match direction {
                    Direction::Outgoing => edge.target,
                    Direction::Incoming => edge.source,
                }
            })
            .filter(|&other| seen.insert(other))
            .collect()
    }

    /// Every relationship of one type, in insertion order.
    pub fn edges_of_type(&self, rel_type: RelType) -> &[EdgeIdx] {
        self.edges_by_type
            .get(&rel_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct owners of an account, ordered by user id.
    pub fn owners(&self, account: NodeIdx) -> Vec<&User> {
        let mut owners: Vec<&User> = self
            .neighbors(account, RelType::Owns, Direction::Incoming)
            .into_iter()
            .filter_map(|idx| self.user(idx))
            .collect();
        owners.sort_by(|a, b| a.id.cmp(&b.id));
        owners
    }

    // ── Transfers ────────────────────────────────────────────────

    pub fn transfer(&self, tx: NodeIdx) -> Option<&Transfer> {
        self.transfers.get(&tx)
    }

    /// Every transfer, oldest first.
    pub fn timeline(&self) -> impl Iterator<Item = &Transfer> + '_ {
        self.resolve_transfers(&self.timeline)
    }

    /// Transfers with a timestamp inside `bounds`, oldest first.
    pub fn transfers_within(&self, bounds: &TimeBounds) -> impl Iterator<Item = &Transfer> + '_ {
        let start = self.first_after(&self.timeline, bounds.start);
        let end = self.first_after(&self.timeline, bounds.end);
        self.resolve_transfers(&self.timeline[start..end.max(start)])
    }

    /// Transfers sent by `account` strictly between `after` and `before`, oldest first.
    pub fn outgoing_between(
        &self,
        account: NodeIdx,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> impl Iterator<Item = &Transfer> + '_ {
        let list = self
            .outgoing_transfers
            .get(&account)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let start = self.first_after(list, after);
        let end = list.partition_point(|tx| self.transfers.get(tx).is_some_and(|t| t.timestamp < before));
        self.resolve_transfers(&list[start..end.max(start)])
    }

    /// Every ordered account pair with its transfers, oldest first.
    pub fn account_pairs(&self) -> impl Iterator<Item = (NodeIdx, NodeIdx, Vec<&Transfer>)> + '_ {
        self.pair_transfers
            .iter()
            .map(|(&(from, to), list)| (from, to, self.resolve_transfers(list).collect()))
    }

    fn first_after(&self, list: &[NodeIdx], ts: DateTime<Utc>) -> usize {
        list.partition_point(|tx| self.transfers.get(tx).is_some_and(|t| t.timestamp <= ts))
    }

    fn resolve_transfers<'a>(&'a self, list: &'a [NodeIdx]) -> impl Iterator<Item = &'a Transfer> + 'a {
        list.iter().filter_map(|tx| self.transfers.get(tx))
    }

    // ── Stats ────────────────────────────────────────────────────

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            users: self.nodes_with_label(NodeLabel::User).len(),
            devices: self.nodes_with_label(NodeLabel::Device).len(),
            accounts: self.nodes_with_label(NodeLabel::Account).len(),
            transactions: self.nodes_with_label(NodeLabel::Transaction).len(),
            relationships: self.edges.len(),
            transfers: self.timeline.len(),
            version: self.version,
        }
    }
}

fn insert_sorted(list: &mut Vec<NodeIdx>, transfers: &HashMap<NodeIdx, Transfer>, tx: NodeIdx) {
    let Some(new) = transfers.get(&tx) else {
        return;
    };
    let key = new.sort_key();
    let pos = list.partition_point(|other| {
        transfers
            .get(other)
            .is_some_and(|t| t.sort_key() < key)
    });
    list.insert(pos, tx);
}

/// Owner of the current sealed index version.
///
/// Readers take cheap [`snapshot`](IndexHandle::snapshot)s; the single writer
/// appends through copy-on-write, so a snapshot never observes a later append.
#[derive(Debug, Clone, Default)]
pub struct IndexHandle {
    current: Arc<GraphIndex>,
}

impl IndexHandle {
    pub fn new(index: GraphIndex) -> Self {
        Self {
            current: Arc::new(index),
        }
    }

    pub fn snapshot(&self) -> Arc<GraphIndex> {
        Arc::clone(&self.current)
    }

    /// Append a batch. A failed append leaves the published version untouched.
    pub fn append(&mut self, batch: GraphSnapshot) -> Result<()> {
        self.current.check_batch(&batch)?;
        Arc::make_mut(&mut self.current).append(batch)
    }

    /// Replace the index wholesale, e.g. after a refresh from the store.
    pub fn replace(&mut self, index: GraphIndex) {
        self.current = Arc::new(index);
    }

    pub fn version(&self) -> u64 {
        self.current.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{minutes_ago, Fixture};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn ring() -> Fixture {
        Fixture::default()
            .user("U101", 0.9)
            .user("U102", 0.8)
            .device("D004", "Unknown")
            .account("A101", "Offshore Bank")
            .account("A102", "Offshore Bank")
            .uses("U101", "D004")
            .uses("U102", "D004")
            .uses("U101", "D004")
            .owns("U101", "A101")
            .tx("T1", dec!(100), 10, "A101", "A102")
            .tx("T2", dec!(200), 5, "A102", "A101")
    }

    #[test]
    fn test_build_basic() {
        let index = ring().index();
        let stats = index.stats();
        assert_eq!(stats.users, 2);
        assert_eq!(stats.devices, 1);
        assert_eq!(stats.accounts, 2);
        assert_eq!(stats.transactions, 2);
        assert_eq!(stats.transfers, 2);
        assert_eq!(stats.relationships, 8);
        assert_eq!(stats.version, 0);
    }

    #[test]
    fn test_neighbors_are_distinct() {
        let index = ring().index();
        let device = index
            .lookup(&NodeKey::new(NodeLabel::Device, "D004"))
            .unwrap();
        assert_eq!(index.edges_at(device, RelType::Uses, Direction::Incoming).len(), 3);
        let users = index.neighbors(device, RelType::Uses, Direction::Incoming);
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn test_same_id_under_different_labels() {
        let index = Fixture::default()
            .user("X1", 0.1)
            .account("X1", "Chase")
            .owns("X1", "X1")
            .index();
        assert_eq!(index.node_count(), 2);
        let account = index.lookup(&NodeKey::new(NodeLabel::Account, "X1")).unwrap();
        assert_eq!(index.owners(account)[0].id, "X1");
    }

    #[test]
    fn test_dangling_relationship_is_inconsistent() {
        let err = Fixture::default()
            .user("U1", 0.1)
            .uses("U1", "D_missing")
            .try_index()
            .unwrap_err();
        assert!(matches!(err, DetectError::IndexInconsistency(_)));
    }

    #[test]
    fn test_second_source_is_inconsistent() {
        let err = Fixture::default()
            .account("A1", "Chase")
            .account("A2", "Chase")
            .account("A3", "Chase")
            .tx("T1", dec!(10), 5, "A1", "A2")
            .link(RelType::Sends, "A3", "T1")
            .try_index()
            .unwrap_err();
        assert!(matches!(err, DetectError::IndexInconsistency(_)));
    }

    #[test]
    fn test_repeated_sends_from_same_account_is_allowed() {
        let index = Fixture::default()
            .account("A1", "Chase")
            .account("A2", "Chase")
            .tx("T1", dec!(10), 5, "A1", "A2")
            .link(RelType::Sends, "A1", "T1")
            .index();
        assert_eq!(index.stats().transfers, 1);
    }

    #[test]
    fn test_incomplete_transaction_is_not_a_transfer() {
        let index = Fixture::default()
            .account("A1", "Chase")
            .transaction("T1", dec!(10), 5, "completed")
            .link(RelType::Sends, "A1", "T1")
            .index();
        assert_eq!(index.stats().transactions, 1);
        assert_eq!(index.stats().transfers, 0);
    }

    #[test]
    fn test_timeline_order_breaks_ties_by_id() {
        let index = Fixture::default()
            .account("A1", "Chase")
            .account("A2", "Chase")
            .tx("T3", dec!(1), 5, "A1", "A2")
            .tx("T2", dec!(1), 5, "A1", "A2")
            .tx("T1", dec!(1), 20, "A1", "A2")
            .index();
        let ids: Vec<&str> = index.timeline().map(|t| t.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn test_transfers_within_bounds() {
        let index = Fixture::default()
            .account("A1", "Chase")
            .account("A2", "Chase")
            .tx("T1", dec!(1), 30, "A1", "A2")
            .tx("T2", dec!(1), 29, "A1", "A2")
            .tx("T3", dec!(1), 0, "A1", "A2")
            .tx("T4", dec!(1), -1, "A1", "A2")
            .index();
        let bounds = TimeBounds::trailing(minutes_ago(0), Duration::minutes(30));
        let ids: Vec<&str> = index
            .transfers_within(&bounds)
            .map(|t| t.transaction_id.as_str())
            .collect();
        assert_eq!(ids, vec!["T2", "T3"]);
    }

    #[test]
    fn test_duplicate_node_leaves_index_unchanged() {
        let mut index = ring().index();
        let before = index.stats();

        let batch = Fixture::default()
            .user("U200", 0.1)
            .user("U101", 0.5)
            .snapshot;
        let err = index.append(batch).unwrap_err();
        assert!(matches!(err, DetectError::DuplicateNode { .. }));
        assert_eq!(index.stats(), before);
        assert!(index
            .lookup(&NodeKey::new(NodeLabel::User, "U200"))
            .is_none());
    }

    #[test]
    fn test_incremental_append_equals_rebuild() {
        let full = ring()
            .account("A103", "Offshore Bank")
            .tx("T3", dec!(300), 1, "A101", "A103")
            .snapshot;

        let base = ring().snapshot;
        let delta = GraphSnapshot {
            nodes: full.nodes[base.nodes.len()..].to_vec(),
            relationships: full.relationships[base.relationships.len()..].to_vec(),
        };

        let rebuilt = GraphIndex::build(full).unwrap();
        let mut appended = GraphIndex::build(base).unwrap();
        appended.append(delta).unwrap();

        let mut rebuilt_stats = rebuilt.stats();
        rebuilt_stats.version = 1;
        assert_eq!(appended.stats(), rebuilt_stats);

        let order = |i: &GraphIndex| -> Vec<String> {
            i.timeline().map(|t| t.transaction_id.clone()).collect()
        };
        assert_eq!(order(&appended), order(&rebuilt));
    }

    #[test]
    fn test_snapshot_is_unaffected_by_append() {
        let mut handle = IndexHandle::new(ring().index());
        let before = handle.snapshot();

        let batch = Fixture::default().user("U300", 0.2).snapshot;
        handle.append(batch).unwrap();

        assert_eq!(before.stats().users, 2);
        assert_eq!(before.version(), 0);
        assert_eq!(handle.snapshot().stats().users, 3);
        assert_eq!(handle.version(), 1);
    }

    #[test]
    fn test_failed_handle_append_keeps_version() {
        let mut handle = IndexHandle::new(ring().index());
        let batch = Fixture::default().uses("U101", "D_missing").snapshot;
        assert!(handle.append(batch).is_err());
        assert_eq!(handle.version(), 0);
        assert_eq!(handle.snapshot().stats().relationships, 8);
    }
}
