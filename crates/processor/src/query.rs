//! Read path over materialized aggregate state
//!
//! A [`MaterializedView`] is the snapshot-read capability handed to
//! whatever service boundary exposes queries (an HTTP handler, typically).
//! It never holds a mutable reference into the store: lookups go through
//! the backend's concurrent-read path, so a read racing an in-flight write
//! may observe the aggregate from just before it. That staleness is bounded
//! by pipeline processing lag and is the documented consistency model.

use std::sync::Arc;

use crate::codec::Codec;
use crate::core::partition_for_key;
use crate::error::Result;
use crate::state::StateBackend;

/// Typed point-lookup handle over one state store
pub struct MaterializedView<K, A> {
    store: String,
    // One backend per partition, indexed by partition id.
    backends: Vec<Arc<dyn StateBackend>>,
    key_codec: Arc<dyn Codec<K>>,
    agg_codec: Arc<dyn Codec<A>>,
}

impl<K, A> std::fmt::Debug for MaterializedView<K, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterializedView")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<K, A> MaterializedView<K, A> {
    pub(crate) fn new(
        store: String,
        backends: Vec<Arc<dyn StateBackend>>,
        key_codec: Arc<dyn Codec<K>>,
        agg_codec: Arc<dyn Codec<A>>,
    ) -> Self {
        Self {
            store,
            backends,
            key_codec,
            agg_codec,
        }
    }

    /// Name of the underlying store
    pub fn store_name(&self) -> &str {
        &self.store
    }

    /// Point lookup for one key's current aggregate
    ///
    /// Returns `None` when no event for the key has been processed yet.
    pub async fn get(&self, key: &K) -> Result<Option<A>> {
        let key_bytes = self.key_codec.encode(key)?;
        let partition = partition_for_key(&key_bytes, self.backends.len() as u32);

        match self.backends[partition as usize].get(&key_bytes).await? {
            Some(bytes) => Ok(Some(self.agg_codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl<K, A> Clone for MaterializedView<K, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            backends: self.backends.clone(),
            key_codec: Arc::clone(&self.key_codec),
            agg_codec: Arc::clone(&self.agg_codec),
        }
    }
}
