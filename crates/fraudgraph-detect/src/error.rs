//! Error types for the fraudgraph-detect crate.

use thiserror::Error;

use crate::matchers::Matcher;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Graph error: {0}")]
    Graph(#[from] fraudgraph_graph::GraphError),

    #[error(transparent)]
    Core(#[from] fraudgraph_core::CoreError),

    #[error("Index inconsistency: {0}")]
    IndexInconsistency(String),

    #[error("Duplicate node: {key} is already indexed")]
    DuplicateNode { key: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Computation timeout: {category} exceeded the {budget_ms}ms budget")]
    Timeout { category: Matcher, budget_ms: u64 },

    #[error("Matcher worker failed: {0}")]
    Worker(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DetectError>;
