//! In-memory graph store.
//!
//! Keeps records in insertion order behind a tokio `RwLock`. Used for tests,
//! for JSON snapshots, and wherever a database is not needed.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use fraudgraph_core::{Direction, NodeLabel, RelType};

use crate::client::GraphError;
use crate::store::{parse_label, parse_rel_type, EdgeRecord, GraphStore, NodeRecord};

#[derive(Default)]
struct MemoryState {
    nodes: Vec<NodeRecord>,
    node_keys: HashSet<(NodeLabel, String)>,
    edges: Vec<EdgeRecord>,
    edge_ids: HashSet<String>,
    /// `(label, id)` → edge positions where that node is the source.
    outgoing: HashMap<(NodeLabel, String), Vec<usize>>,
    /// `(label, id)` → edge positions where that node is the target.
    incoming: HashMap<(NodeLabel, String), Vec<usize>>,
}

/// A [`GraphStore`] held entirely in memory.
#[derive(Default)]
pub struct MemoryGraphStore {
    state: RwLock<MemoryState>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn node_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.state.read().await.edges.len()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn put_node(&self, node: &NodeRecord) -> Result<(), GraphError> {
        let label = parse_label(&node.label)?;
        let mut state = self.state.write().await;

        if !state.node_keys.insert((label, node.id.clone())) {
            tracing::debug!(label = %label, id = %node.id, "Node already stored, keeping original");
            return Ok(());
        }
        state.nodes.push(node.clone());
        Ok(())
    }

    async fn put_relationship(&self, rel: &EdgeRecord) -> Result<(), GraphError> {
        let rel_type = parse_rel_type(&rel.edge_type)?;
        let (source_label, target_label) = rel_type.endpoints();
        let source_key = (source_label, rel.source_id.clone());
        let target_key = (target_label, rel.target_id.clone());

        let mut state = self.state.write().await;

        for (label, id) in [&source_key, &target_key] {
            if !state.node_keys.contains(&(*label, id.clone())) {
                return Err(GraphError::not_found(*label, id.as_str()));
            }
        }

        if !state.edge_ids.insert(rel.id.clone()) {
            tracing::debug!(id = %rel.id, "Relationship already stored, keeping original");
            return Ok(());
        }

        let pos = state.edges.len();
        state.edges.push(rel.clone());
        state.outgoing.entry(source_key).or_default().push(pos);
        state.incoming.entry(target_key).or_default().push(pos);
        Ok(())
    }

    async fn get_nodes_by_label(&self, label: NodeLabel) -> Result<Vec<NodeRecord>, GraphError> {
        let state = self.state.read().await;
        Ok(state
            .nodes
            .iter()
            .filter(|n| n.label == label.as_str())
            .cloned()
            .collect())
    }

    async fn get_relationships(
        &self,
        from_id: &str,
        rel_type: RelType,
        direction: Direction,
    ) -> Result<Vec<EdgeRecord>, GraphError> {
        let (source_label, target_label) = rel_type.endpoints();
        let state = self.state.read().await;

        let positions = match direction {
            Direction::Outgoing => state.outgoing.get(&(source_label, from_id.to_string())),
            Direction::Incoming => state.incoming.get(&(target_label, from_id.to_string())),
        };

        Ok(positions
            .into_iter()
            .flatten()
            .map(|&pos| &state.edges[pos])
            .filter(|e| e.edge_type == rel_type.as_str())
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<(), GraphError> {
        let mut state = self.state.write().await;
        *state = MemoryState::default();
        tracing::info!("In-memory graph store cleared");
        Ok(())
    }
}
