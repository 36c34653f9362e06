//! fraudgraph-core: Entity model, configuration, and error handling for fraudgraph.
//!
//! This crate provides the foundational types used across all fraudgraph components:
//! - Node types (User, Device, Account, Transaction) for the entity graph
//! - Relationship types (USES, OWNS, SENDS, ...) for graph edges
//! - Risk levels shared by every matcher
//! - Analysis configuration and its loader
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::AnalysisConfig;
pub use error::CoreError;
pub use types::*;
