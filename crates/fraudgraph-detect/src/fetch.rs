//! Snapshot fetching and write-through via a [`GraphStore`].

use fraudgraph_graph::GraphStore;

use crate::error::Result;
use crate::ingest::{node_to_record, relationship_to_record, GraphSnapshot};

/// Fetch every stored node and relationship as a typed snapshot.
pub async fn fetch_snapshot<S: GraphStore + ?Sized>(store: &S) -> Result<GraphSnapshot> {
    let subgraph = store.fetch_subgraph().await?;
    let snapshot = GraphSnapshot::from_subgraph(&subgraph)?;
    tracing::info!(
        nodes = snapshot.nodes.len(),
        relationships = snapshot.relationships.len(),
        "Fetched graph snapshot"
    );
    Ok(snapshot)
}

/// Write a batch to the store, nodes first so relationship endpoints resolve.
pub async fn store_batch<S: GraphStore + ?Sized>(store: &S, batch: &GraphSnapshot) -> Result<()> {
    for node in &batch.nodes {
        store.put_node(&node_to_record(node)?).await?;
    }
    for rel in &batch.relationships {
        store.put_relationship(&relationship_to_record(rel)?).await?;
    }
    tracing::debug!(
        nodes = batch.nodes.len(),
        relationships = batch.relationships.len(),
        "Stored batch"
    );
    Ok(())
}
