//! Output sinks
//!
//! Terminal operators publish `(key bytes, value bytes)` pairs to named
//! downstream channels. [`SinkConnector`] is the boundary an external
//! publisher (a broker producer, say) implements; [`InMemorySinks`] is the
//! in-process implementation used by the reference pipelines and by tests,
//! which additionally lets consumers drain what was published.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::codec::Codec;
use crate::error::Result;

/// Publisher for named downstream channels
#[async_trait]
pub trait SinkConnector: Send + Sync {
    /// Publish one keyed record to a channel
    async fn publish(&self, channel: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()>;
}

/// In-memory sink registry
///
/// Records are appended per channel in publish order. With multiple
/// partition workers publishing concurrently, order across partitions is
/// whatever interleaving the scheduler produced; order within one
/// partition's output is preserved.
#[derive(Default)]
pub struct InMemorySinks {
    channels: DashMap<String, VecDeque<(Vec<u8>, Vec<u8>)>>,
}

impl InMemorySinks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unread records on a channel
    pub fn len(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, |q| q.len())
    }

    /// Whether a channel has no unread records
    pub fn is_empty(&self, channel: &str) -> bool {
        self.len(channel) == 0
    }

    /// Drain all raw records published to a channel, in publish order
    pub fn drain(&self, channel: &str) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.channels
            .get_mut(channel)
            .map(|mut q| q.drain(..).collect())
            .unwrap_or_default()
    }

    /// Drain a channel and decode each record with the given codecs
    pub fn drain_as<K, V>(
        &self,
        channel: &str,
        key_codec: &dyn Codec<K>,
        value_codec: &dyn Codec<V>,
    ) -> Result<Vec<(K, V)>> {
        self.drain(channel)
            .into_iter()
            .map(|(k, v)| Ok((key_codec.decode(&k)?, value_codec.decode(&v)?)))
            .collect()
    }
}

#[async_trait]
impl SinkConnector for InMemorySinks {
    async fn publish(&self, channel: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        debug!(channel, key_len = key.len(), "sink publish");
        self.channels
            .entry(channel.to_string())
            .or_default()
            .push_back((key, value));
        Ok(())
    }
}
