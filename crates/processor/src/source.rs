//! In-memory partitioned event source
//!
//! A [`PartitionedSource`] models the upstream log boundary: a named
//! channel split into a fixed number of partitions, each an ordered queue
//! of records. Producers hash keys onto partitions (or assign one
//! explicitly, standing in for an external broker's assignment); the
//! executor claims the per-partition receivers and drives one worker per
//! partition off them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::{partition_for_key, Record};
use crate::error::{ProcessorError, Result};

/// A named, partitioned, ordered in-memory log of keyed records
pub struct PartitionedSource {
    channel: String,
    partitions: u32,
    senders: Vec<mpsc::Sender<Record>>,
    receivers: Mutex<Option<Vec<mpsc::Receiver<Record>>>>,
    // Next offset per partition; offsets are assigned at send time so
    // arrival order and offset order always agree.
    offsets: Vec<AtomicU64>,
}

impl PartitionedSource {
    /// Create a source with the given partition count and per-partition
    /// buffer capacity
    pub fn new(channel: impl Into<String>, partitions: u32, buffer_size: usize) -> Self {
        let mut senders = Vec::with_capacity(partitions as usize);
        let mut receivers = Vec::with_capacity(partitions as usize);
        for _ in 0..partitions {
            let (tx, rx) = mpsc::channel(buffer_size);
            senders.push(tx);
            receivers.push(rx);
        }

        Self {
            channel: channel.into(),
            partitions,
            senders,
            receivers: Mutex::new(Some(receivers)),
            offsets: (0..partitions).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// The channel name this source is subscribed to
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Number of partitions
    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Send a keyed record, hashing the key to pick the partition
    pub async fn send(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let partition = partition_for_key(&key, self.partitions);
        self.send_to(partition, key, value).await
    }

    /// Send a keyed record to an explicitly assigned partition
    ///
    /// Callers taking this path own the key-to-partition mapping and must
    /// keep it consistent, or per-key ordering is lost.
    pub async fn send_to(&self, partition: u32, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if partition >= self.partitions {
            return Err(ProcessorError::Execution(format!(
                "partition {partition} out of range for source '{}' ({} partitions)",
                self.channel, self.partitions
            )));
        }

        let offset = self.offsets[partition as usize].fetch_add(1, Ordering::SeqCst);
        let record = Record::new(partition, offset, key, value);

        debug!(
            channel = %self.channel,
            partition,
            offset,
            "source record enqueued"
        );

        self.senders[partition as usize]
            .send(record)
            .await
            .map_err(|_| {
                ProcessorError::Execution(format!(
                    "source '{}' partition {partition} is closed",
                    self.channel
                ))
            })
    }

    /// Claim the per-partition receivers
    ///
    /// Can only be done once; the executor calls this when workers are
    /// spawned.
    pub fn take_receivers(&self) -> Option<Vec<mpsc::Receiver<Record>>> {
        self.receivers
            .lock()
            .expect("source receiver lock poisoned")
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offsets_increase_per_partition() {
        let source = PartitionedSource::new("events", 1, 16);
        let mut rxs = source.take_receivers().unwrap();

        source.send(b"a".to_vec(), b"1".to_vec()).await.unwrap();
        source.send(b"b".to_vec(), b"2".to_vec()).await.unwrap();
        source.send(b"a".to_vec(), b"3".to_vec()).await.unwrap();

        let r0 = rxs[0].recv().await.unwrap();
        let r1 = rxs[0].recv().await.unwrap();
        let r2 = rxs[0].recv().await.unwrap();

        assert_eq!(r0.offset, 0);
        assert_eq!(r1.offset, 1);
        assert_eq!(r2.offset, 2);
        assert_eq!(r2.value, b"3".to_vec());
    }

    #[tokio::test]
    async fn test_same_key_lands_on_same_partition() {
        let source = PartitionedSource::new("events", 4, 16);
        let mut rxs = source.take_receivers().unwrap();

        for i in 0..10 {
            source
                .send(b"fixed-key".to_vec(), vec![i])
                .await
                .unwrap();
        }

        let owner = partition_for_key(b"fixed-key", 4) as usize;
        for i in 0..10u8 {
            let record = rxs[owner].recv().await.unwrap();
            assert_eq!(record.value, vec![i]);
        }
    }

    #[tokio::test]
    async fn test_send_to_rejects_out_of_range_partition() {
        let source = PartitionedSource::new("events", 2, 16);
        let err = source
            .send_to(5, b"k".to_vec(), b"v".to_vec())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_receivers_claimed_once() {
        let source = PartitionedSource::new("events", 2, 16);
        assert!(source.take_receivers().is_some());
        assert!(source.take_receivers().is_none());
    }
}
