//! fraudgraph-detect: Fraud pattern matching over the fraudgraph entity graph.
//!
//! Loads users, devices, accounts and transactions into an in-memory
//! [`GraphIndex`], runs the six fraud matchers concurrently against one
//! immutable snapshot, and aggregates their findings into a [`FraudReport`]
//! with risk levels, census totals and top offenders.

pub mod context;
pub mod error;
pub mod fetch;
pub mod index;
pub mod ingest;
pub mod matchers;
pub mod report;
pub mod scoring;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use context::{Deadline, MatchContext, TimeBounds};
pub use error::DetectError;
pub use index::{GraphIndex, IndexHandle};
pub use ingest::GraphSnapshot;
pub use matchers::{MatchSet, Matcher};
pub use types::{FraudReport, GraphStats};

use std::sync::Arc;

use chrono::Utc;
use fraudgraph_core::AnalysisConfig;
use fraudgraph_graph::GraphStore;

use crate::error::Result;

/// Build an index from a snapshot and analyze it.
///
/// The configuration is validated before the index is built, so a bad
/// threshold fails fast without touching the data.
pub async fn run_analysis(snapshot: GraphSnapshot, config: &AnalysisConfig) -> Result<FraudReport> {
    config.validate()?;
    let index = GraphIndex::build(snapshot)?;
    analyze_index(Arc::new(index), config).await
}

/// Analyze an existing index snapshot.
///
/// `now` is taken from the config when set, otherwise read from the clock
/// exactly once for the whole run.
pub async fn analyze_index(index: Arc<GraphIndex>, config: &AnalysisConfig) -> Result<FraudReport> {
    let now = config.now.unwrap_or_else(Utc::now);
    let ctx = MatchContext::new(config.clone(), now)?;
    Ok(analyze_with_context(index, ctx).await)
}

/// Run every matcher under a prepared context and aggregate the outcomes.
///
/// Matcher failures never fail the run; they surface as failed categories.
pub async fn analyze_with_context(index: Arc<GraphIndex>, ctx: MatchContext) -> FraudReport {
    let ctx = Arc::new(ctx);
    let results = run_matchers(Arc::clone(&index), Arc::clone(&ctx)).await;
    let report = report::aggregate(&index, &ctx, results);

    tracing::info!(
        version = index.version(),
        total_risk_score = report.summary.total_risk_score,
        failed = report.failed_categories.len(),
        "Fraud analysis complete"
    );
    report
}

/// Run each matcher on its own blocking worker against the same snapshot.
///
/// Results come back in [`Matcher::ALL`] order.
pub async fn run_matchers(
    index: Arc<GraphIndex>,
    ctx: Arc<MatchContext>,
) -> Vec<(Matcher, Result<MatchSet>)> {
    let handles: Vec<_> = Matcher::ALL
        .into_iter()
        .map(|matcher| {
            let index = Arc::clone(&index);
            let ctx = Arc::clone(&ctx);
            (
                matcher,
                tokio::task::spawn_blocking(move || matcher.run(&index, &ctx)),
            )
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (matcher, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(DetectError::Worker(format!("{matcher}: {e}"))),
        };
        match &result {
            Ok(matches) => tracing::debug!(%matcher, matches = matches.len(), "Matcher finished"),
            Err(e) => tracing::warn!(%matcher, error = %e, "Matcher failed"),
        }
        results.push((matcher, result));
    }
    results
}

/// Long-lived analysis engine over a graph store.
///
/// Holds the published index; `refresh` reloads it from the store and
/// `ingest` writes a batch through to the store before appending it.
pub struct FraudEngine<S: GraphStore> {
    store: S,
    config: AnalysisConfig,
    handle: IndexHandle,
}

impl<S: GraphStore> FraudEngine<S> {
    /// Create an engine with an empty index. The config is validated here.
    pub fn new(store: S, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            handle: IndexHandle::default(),
        })
    }

    /// Rebuild the index from everything in the store.
    pub async fn refresh(&mut self) -> Result<GraphStats> {
        let snapshot = fetch::fetch_snapshot(&self.store).await?;
        let index = GraphIndex::build(snapshot)?;
        let stats = index.stats();
        self.handle.replace(index);
        Ok(stats)
    }

    /// Validate a batch, persist it, then publish it to the index.
    ///
    /// Store writes are not transactional. If one fails partway, the records
    /// already written stay in the store and the index is rebuilt from the
    /// store before the write error is returned.
    pub async fn ingest(&mut self, batch: GraphSnapshot) -> Result<GraphStats> {
        self.handle.snapshot().check_batch(&batch)?;
        if let Err(e) = fetch::store_batch(&self.store, &batch).await {
            tracing::warn!(error = %e, "Batch write failed partway, resyncing index from store");
            if let Err(resync) = self.refresh().await {
                tracing::error!(error = %resync, "Index resync after failed write also failed");
            }
            return Err(e);
        }
        self.handle.append(batch)?;
        Ok(self.handle.snapshot().stats())
    }

    /// Analyze the currently published index.
    pub async fn analyze(&self) -> Result<FraudReport> {
        analyze_index(self.handle.snapshot(), &self.config).await
    }

    pub fn snapshot(&self) -> Arc<GraphIndex> {
        self.handle.snapshot()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
}
