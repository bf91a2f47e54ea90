use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;

use crate::lookup::RemoteOutput;
use crate::types::Network;

/// Default number of prior transactions whose outputs are kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 4_096;

// ==============================================================================
// Cache
// ==============================================================================

/// In-memory LRU of prior-transaction outputs fetched from the indexing API.
///
/// Shared across the resolver and server via `Arc<Cache>`. Outputs of a
/// confirmed transaction never change, so entries are only evicted by
/// capacity. Keys include the network so one cache can serve graph resets
/// across networks.
pub struct Cache {
    outputs: Mutex<LruCache<(Network, String), Arc<Vec<RemoteOutput>>>>,
}

impl Cache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            outputs: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn get_outputs(
        &self,
        network: Network,
        tx_hash: &str,
    ) -> Option<Arc<Vec<RemoteOutput>>> {
        self.outputs
            .lock()
            .await
            .get(&(network, tx_hash.to_owned()))
            .cloned()
    }

    pub async fn insert_outputs(&self, network: Network, tx_hash: &str, outputs: Vec<RemoteOutput>) {
        self.outputs
            .lock()
            .await
            .put((network, tx_hash.to_owned()), Arc::new(outputs));
    }

    pub async fn len(&self) -> usize {
        self.outputs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}
