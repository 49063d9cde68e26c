use crate::Graph;
use std::time::Duration;

/// Stores previously computed topologies by namespace scope.
///
/// Implementations are shared and may be remote; callers treat every failure other than
/// [`CacheError::NotFound`] as a degraded cache rather than a failed request.
#[async_trait::async_trait]
pub trait TopologyStore: Send + Sync {
    async fn get(&self, namespace: &str) -> Result<Graph, CacheError>;

    async fn set(&self, namespace: &str, graph: &Graph) -> Result<(), CacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("topology not found in cache")]
    NotFound,

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to encode topology: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode cached topology: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

#[async_trait::async_trait]
impl<S: TopologyStore + ?Sized> TopologyStore for std::sync::Arc<S> {
    async fn get(&self, namespace: &str) -> Result<Graph, CacheError> {
        (**self).get(namespace).await
    }

    async fn set(&self, namespace: &str, graph: &Graph) -> Result<(), CacheError> {
        (**self).set(namespace, graph).await
    }
}
