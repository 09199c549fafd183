//! Partitioned execution of a topology
//!
//! The executor claims a source's per-partition receivers and spawns one
//! worker task per partition. Workers feed records into the shared driver
//! strictly in arrival order, so all records for one key (which hash to one
//! partition) are processed sequentially even while partitions run in
//! parallel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::driver::TopologyDriver;
use crate::config::{FaultPolicy, ProcessorConfig};
use crate::core::Record;
use crate::error::{ProcessorError, Result};
use crate::sink::{InMemorySinks, SinkConnector};
use crate::source::PartitionedSource;

/// Shared processing counters
#[derive(Default)]
pub struct ExecutorStats {
    processed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`ExecutorStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Records fully processed
    pub processed: u64,
    /// Records dropped under [`FaultPolicy::SkipRecord`]
    pub skipped: u64,
    /// Errors that halted a partition worker
    pub failed: u64,
}

impl ExecutorStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Drives a topology off one or more partitioned sources
pub struct StreamExecutor<S: SinkConnector + 'static = InMemorySinks> {
    driver: Arc<TopologyDriver<S>>,
    fault_policy: FaultPolicy,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<ExecutorStats>,
}

impl<S: SinkConnector + 'static> StreamExecutor<S> {
    /// Create an executor over a shared driver
    pub fn new(driver: Arc<TopologyDriver<S>>, config: &ProcessorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            driver,
            fault_policy: config.fault_policy,
            running: Arc::new(AtomicBool::new(true)),
            workers: Vec::new(),
            stats: Arc::new(ExecutorStats::default()),
        })
    }

    /// Claim a source's receivers and spawn one worker per partition
    pub fn attach(&mut self, source: &PartitionedSource) -> Result<()> {
        let receivers = source.take_receivers().ok_or_else(|| {
            ProcessorError::Execution(format!(
                "source '{}' receivers already claimed",
                source.channel()
            ))
        })?;

        info!(
            channel = source.channel(),
            partitions = receivers.len(),
            "attaching source"
        );

        for (partition, receiver) in receivers.into_iter().enumerate() {
            self.workers.push(tokio::spawn(partition_worker(
                source.channel().to_string(),
                partition as u32,
                receiver,
                Arc::clone(&self.driver),
                Arc::clone(&self.running),
                Arc::clone(&self.stats),
                self.fault_policy,
            )));
        }
        Ok(())
    }

    /// Whether a shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Current processing counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop all workers and wait for them to exit
    pub async fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        for worker in self.workers.drain(..) {
            let _ = worker.await;
        }
        info!(stats = ?self.stats.snapshot(), "executor stopped");
    }
}

async fn partition_worker<S: SinkConnector>(
    channel: String,
    partition: u32,
    mut receiver: mpsc::Receiver<Record>,
    driver: Arc<TopologyDriver<S>>,
    running: Arc<AtomicBool>,
    stats: Arc<ExecutorStats>,
    fault_policy: FaultPolicy,
) {
    while running.load(Ordering::Relaxed) {
        // Bounded wait so a shutdown request is noticed on idle partitions.
        let record = match timeout(Duration::from_millis(50), receiver.recv()).await {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(_) => continue,
        };

        let offset = record.offset;
        match driver.process(&channel, record).await {
            Ok(()) => {
                stats.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) if record_scoped(&err) && fault_policy == FaultPolicy::SkipRecord => {
                warn!(%channel, partition, offset, %err, "record skipped");
                stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                error!(%channel, partition, offset, %err, "partition halted");
                stats.failed.fetch_add(1, Ordering::Relaxed);
                break;
            }
        }
    }
}

// Faults confined to one record. Store and sink failures are not: the
// partition's aggregates cannot advance safely past them.
fn record_scoped(err: &ProcessorError) -> bool {
    matches!(
        err,
        ProcessorError::Transform { .. } | ProcessorError::Codec(_)
    )
}
