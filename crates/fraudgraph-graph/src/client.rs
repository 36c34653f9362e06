//! Neo4j connection settings and the pooled client behind the Neo4j store.

use fraudgraph_core::NodeLabel;
use neo4rs::{query, ConfigBuilder, Graph, Query};
use serde::Deserialize;

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Store config error: {0}")]
    Config(#[from] config::ConfigError),

    /// A relationship endpoint or looked-up node is absent from the store.
    #[error("{label} {id} not found in store")]
    NotFound { label: NodeLabel, id: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A returned row lacks a column or has the wrong type.
    #[error("Row decode error: {0}")]
    Decode(String),

    #[error("Property serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub fn not_found(label: NodeLabel, id: impl Into<String>) -> Self {
        Self::NotFound {
            label,
            id: id.into(),
        }
    }
}

/// The `[neo4j]` section of the fraudgraph config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Target database; the server default when unset.
    pub database: Option<String>,
    pub max_connections: usize,
    /// Rows pulled per round trip when streaming a full-graph fetch.
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "fraudgraph-dev".to_string(),
            database: None,
            max_connections: 16,
            fetch_size: 500,
        }
    }
}

impl GraphConfig {
    /// Read `[neo4j]` from `<file_prefix>.toml`, overridden by `FRAUDGRAPH__NEO4J__*`.
    ///
    /// A missing section yields the defaults.
    pub fn load(file_prefix: &str) -> Result<Self, GraphError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("FRAUDGRAPH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match cfg.get::<GraphConfig>("neo4j") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => {
                tracing::debug!(file_prefix, "No [neo4j] section, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Pooled Neo4j client. Implements [`GraphStore`](crate::store::GraphStore).
///
/// Clone is cheap (the pool is shared).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Open the pool and verify the server answers before returning.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let mut builder = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections)
            .fetch_size(config.fetch_size);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo_config = builder
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;
        let client = Self { graph };

        client
            .query_one(query("RETURN 1 AS ok"))
            .await
            .map_err(|e| GraphError::Connection(format!("{} did not answer: {e}", config.uri)))?;

        tracing::info!(
            uri = %config.uri,
            database = config.database.as_deref().unwrap_or("default"),
            "Connected to Neo4j"
        );
        Ok(client)
    }

    /// Execute a write-only query (MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }
}
