use crate::core::{cache_key, CacheError, Graph, TopologyStore};
use bytes::Bytes;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tokio::time::{self, Duration, Instant};
use tracing::{debug, trace};

/// An in-process [`TopologyStore`] holding serialized graphs until they expire.
///
/// Entries are keyed exactly as they would be in a shared key-value store, so that a remote
/// backend can replace this one without changing keys or payloads.
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

#[derive(Debug)]
struct Entry {
    value: Bytes,
    expires: Instant,
}

// === impl MemoryCache ===

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the number of stored entries, including any that have expired but not been purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops all expired entries, returning the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expires > now);
        before - entries.len()
    }

    /// Periodically purges expired entries. Never completes.
    pub async fn run_purge(self: Arc<Self>, interval: Duration) {
        let mut ticks = time::interval(interval);
        ticks.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            let purged = self.purge_expired();
            if purged > 0 {
                debug!(purged, "Purged expired topologies");
            }
        }
    }
}

#[async_trait::async_trait]
impl TopologyStore for MemoryCache {
    async fn get(&self, namespace: &str) -> Result<Graph, CacheError> {
        let key = cache_key(namespace);
        let value = {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(e) if e.expires > Instant::now() => e.value.clone(),
                _ => return Err(CacheError::NotFound),
            }
        };
        trace!(%key, bytes = value.len(), "Read");
        serde_json::from_slice(&value).map_err(CacheError::Decode)
    }

    async fn set(&self, namespace: &str, graph: &Graph) -> Result<(), CacheError> {
        let key = cache_key(namespace);
        let value = Bytes::from(serde_json::to_vec(graph).map_err(CacheError::Encode)?);
        trace!(%key, bytes = value.len(), "Write");
        let expires = Instant::now() + self.ttl;
        self.entries.write().insert(key, Entry { value, expires });
        Ok(())
    }
}
