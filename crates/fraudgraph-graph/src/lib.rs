//! fraudgraph-graph: graph stores for the fraud entity graph.
//!
//! The detection engine talks to storage only through the [`GraphStore`]
//! trait. Two backends are provided: [`GraphClient`] over Neo4j and
//! [`MemoryGraphStore`] for snapshots and tests.

pub mod client;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::MemoryGraphStore;
pub use store::{EdgeRecord, GraphStore, NodeRecord, SubgraphResult};
