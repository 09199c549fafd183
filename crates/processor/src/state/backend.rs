//! State backend trait definition

use async_trait::async_trait;

use crate::state::StateResult;

/// Key-value storage for per-key aggregates
///
/// Keys and values are byte slices; the typed layer above decides the
/// encoding. Implementations must tolerate one writer and any number of
/// concurrent readers on the same instance: a reader may observe the value
/// from before or after an in-flight `put`, never a torn one.
///
/// There is deliberately no iteration API. External queries are point
/// lookups only, and keeping scans out of the contract keeps every backend
/// honest about that.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Retrieve the value for a key, or `None` if absent
    async fn get(&self, key: &[u8]) -> StateResult<Option<Vec<u8>>>;

    /// Store a value, overwriting any previous one
    async fn put(&self, key: &[u8], value: &[u8]) -> StateResult<()>;

    /// Delete a key; deleting an absent key is not an error
    async fn delete(&self, key: &[u8]) -> StateResult<()>;

    /// Number of keys currently stored
    async fn count(&self) -> StateResult<usize>;

    /// Whether a key exists
    async fn contains(&self, key: &[u8]) -> StateResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
