//! In-memory state backend
//!
//! Backed by `DashMap` for lock-free concurrent reads while the owning
//! partition worker writes. Entries are never evicted: aggregate state
//! lives for the lifetime of the process, so growth is bounded only by the
//! key space.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::trace;

use super::backend::StateBackend;
use crate::state::StateResult;

/// Operation counters for the in-memory backend
#[derive(Debug, Clone, Default)]
pub struct MemoryBackendStats {
    /// Number of get operations
    pub get_count: u64,
    /// Number of put operations
    pub put_count: u64,
    /// Number of delete operations
    pub delete_count: u64,
    /// Gets that found a value
    pub hit_count: u64,
    /// Gets that found nothing
    pub miss_count: u64,
}

/// In-memory state backend using DashMap
///
/// The default backend: fast, dependency-free, and sufficient whenever
/// aggregate state does not need to survive a restart. One instance backs
/// one store on one partition.
pub struct MemoryStateBackend {
    data: Arc<DashMap<Vec<u8>, Vec<u8>>>,
    stats: Arc<RwLock<MemoryBackendStats>>,
}

impl MemoryStateBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            stats: Arc::new(RwLock::new(MemoryBackendStats::default())),
        }
    }

    /// Snapshot of the operation counters
    pub async fn stats(&self) -> MemoryBackendStats {
        self.stats.read().await.clone()
    }

    /// Approximate memory footprint of stored entries in bytes
    pub fn memory_usage(&self) -> usize {
        self.data
            .iter()
            .map(|entry| entry.key().len() + entry.value().len())
            .sum()
    }
}

impl Default for MemoryStateBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryStateBackend {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            stats: Arc::clone(&self.stats),
        }
    }
}

#[async_trait]
impl StateBackend for MemoryStateBackend {
    async fn get(&self, key: &[u8]) -> StateResult<Option<Vec<u8>>> {
        trace!(key_len = key.len(), "state get");

        let result = self.data.get(key).map(|entry| entry.value().clone());

        let mut stats = self.stats.write().await;
        stats.get_count += 1;
        if result.is_some() {
            stats.hit_count += 1;
        } else {
            stats.miss_count += 1;
        }

        Ok(result)
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> StateResult<()> {
        trace!(key_len = key.len(), value_len = value.len(), "state put");

        self.data.insert(key.to_vec(), value.to_vec());
        self.stats.write().await.put_count += 1;
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> StateResult<()> {
        trace!(key_len = key.len(), "state delete");

        self.data.remove(key);
        self.stats.write().await.delete_count += 1;
        Ok(())
    }

    async fn count(&self) -> StateResult<usize> {
        Ok(self.data.len())
    }

    async fn contains(&self, key: &[u8]) -> StateResult<bool> {
        Ok(self.data.contains_key(key))
    }
}
