use crate::{
    core::{CacheError, Graph, TopologyStore},
    index::{RuleFailure, Rules, Snapshot, SnapshotError},
    metrics::TopologyMetrics,
};
use std::{future::Future, sync::Arc};
use tokio::time::{self, Duration, Instant};
use tracing::{debug, instrument, warn};

/// The default bound on each cache read or write.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(3);

/// Builds topologies from snapshots, consulting a store before applying rules.
///
/// The store is an optimization only. Any failure to read from it is treated as a miss and any
/// failure to write to it is logged and ignored, so a build never fails on account of the cache.
#[derive(Debug)]
pub struct TopologyService<S> {
    rules: Rules,
    cache: S,
    cache_timeout: Duration,
    metrics: TopologyMetrics,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Rule(#[from] RuleFailure),
}

pub type SharedTopologyService<S> = Arc<TopologyService<S>>;

// === impl TopologyService ===

impl<S: TopologyStore> TopologyService<S> {
    pub fn new(rules: Rules, cache: S, metrics: TopologyMetrics) -> Self {
        Self {
            rules,
            cache,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            metrics,
        }
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Returns the topology for the snapshot's namespace scope.
    ///
    /// A cached topology is returned without applying any rules, even if the snapshot has changed
    /// since it was stored. Topologies of empty snapshots are never stored.
    #[instrument(skip_all, fields(ns = %snapshot.namespace()))]
    pub async fn build_from_snapshot(&self, snapshot: &Snapshot) -> Result<Graph, BuildError> {
        let namespace = snapshot.namespace();

        match self.bounded(self.cache.get(namespace)).await {
            Ok(graph) => {
                debug!("Serving cached topology");
                self.metrics.cache_hit();
                return Ok(graph);
            }
            Err(CacheError::NotFound) => {
                self.metrics.cache_miss();
            }
            Err(error) => {
                warn!(%error, "Failed to read topology from cache");
                self.metrics.cache_error();
            }
        }

        let start = Instant::now();
        let graph = match self.rules.build(snapshot) {
            Ok(graph) => graph,
            Err(error) => {
                self.metrics.build_failed();
                return Err(error.into());
            }
        };
        self.metrics.build_succeeded(start.elapsed());

        // Any namespace name yields a snapshot, so an empty one is not cached; it costs nothing to
        // rebuild.
        if snapshot.is_empty() {
            return Ok(graph);
        }

        if let Err(error) = self.bounded(self.cache.set(namespace, &graph)).await {
            warn!(%error, "Failed to save topology to cache");
            self.metrics.cache_write_error();
        }

        Ok(graph)
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        match time::timeout(self.cache_timeout, op).await {
            Ok(res) => res,
            Err(_) => Err(CacheError::Timeout(self.cache_timeout)),
        }
    }
}
