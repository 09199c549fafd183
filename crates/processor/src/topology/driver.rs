//! Synchronous-per-record topology walker
//!
//! The driver owns the state backends and the sink connector and knows how
//! to push one record through the graph. It is deliberately free of any
//! threading concern: callers feed it records one at a time, either
//! directly (the test-drive path) or through the executor's partition
//! workers. Because one partition's records are always fed by one caller in
//! order, per-key ordering falls out of the walk being depth-first and
//! record-at-a-time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use super::node::{NodeId, NodeKind, Topology};
use crate::codec::Codec;
use crate::core::{partition_for_key, Record};
use crate::error::{ProcessorError, Result, StateError, TopologyError};
use crate::query::MaterializedView;
use crate::sink::{InMemorySinks, SinkConnector};
use crate::state::{MemoryStateBackend, StateBackend};

/// Executes a [`Topology`] record by record
pub struct TopologyDriver<S: SinkConnector = InMemorySinks> {
    topology: Topology,
    // Backends indexed [store slot][partition].
    stores: Vec<Vec<Arc<dyn StateBackend>>>,
    sinks: Arc<S>,
    partitions: u32,
    // Per-channel arrival counters for the pipe() convenience path.
    offsets: DashMap<String, AtomicU64>,
}

impl TopologyDriver<InMemorySinks> {
    /// Create a driver publishing to a fresh in-memory sink registry
    pub fn new(topology: Topology, partitions: u32) -> Self {
        Self::with_sinks(topology, partitions, Arc::new(InMemorySinks::new()))
    }
}

impl<S: SinkConnector> TopologyDriver<S> {
    /// Create a driver publishing through the given connector
    ///
    /// One in-memory backend is materialized per registered store per
    /// partition.
    pub fn with_sinks(topology: Topology, partitions: u32, sinks: Arc<S>) -> Self {
        let stores = topology
            .stores
            .iter()
            .map(|_| {
                (0..partitions)
                    .map(|_| Arc::new(MemoryStateBackend::new()) as Arc<dyn StateBackend>)
                    .collect()
            })
            .collect();

        Self {
            topology,
            stores,
            sinks,
            partitions,
            offsets: DashMap::new(),
        }
    }

    /// The graph this driver executes
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The sink connector records are published through
    pub fn sinks(&self) -> &Arc<S> {
        &self.sinks
    }

    /// Feed one already-partitioned record into a source channel
    pub async fn process(&self, channel: &str, record: Record) -> Result<()> {
        let root = *self
            .topology
            .sources
            .get(channel)
            .ok_or_else(|| TopologyError::UnknownChannel(channel.to_string()))?;
        if record.partition >= self.partitions {
            return Err(ProcessorError::Execution(format!(
                "record partition {} out of range ({} partitions)",
                record.partition, self.partitions
            )));
        }

        // Depth-first walk with an explicit stack; children are pushed in
        // reverse so sibling chains run in declaration order.
        let mut work: Vec<(NodeId, Vec<u8>)> = vec![(root, record.value.clone())];
        while let Some((id, value)) = work.pop() {
            let node = &self.topology.nodes[id];
            trace!(node = %node.name, partition = record.partition, "visit");

            match &node.kind {
                NodeKind::Source { .. } | NodeKind::Passthrough => {
                    push_children(&mut work, &node.children, value);
                }
                NodeKind::Filter { predicate } => {
                    if predicate(&record.key, &value)? {
                        push_children(&mut work, &node.children, value);
                    } else {
                        trace!(node = %node.name, "record dropped");
                    }
                }
                NodeKind::MapValues { transform } => {
                    let mapped = transform(&record.key, &value)?;
                    push_children(&mut work, &node.children, mapped);
                }
                NodeKind::Branch { select, targets, arms } => {
                    let index = select(&record.key, &value)?;
                    trace!(node = %node.name, arm = %arms[index], "routed");
                    work.push((targets[index], value));
                }
                NodeKind::Aggregate { store, reduce } => {
                    let backend = &self.stores[*store][record.partition as usize];
                    let prior = backend.get(&record.key).await?;
                    let updated = reduce(&record.key, &value, prior.as_deref())?;
                    backend.put(&record.key, &updated).await?;
                    push_children(&mut work, &node.children, updated);
                }
                NodeKind::Sink { channel } => {
                    self.sinks
                        .publish(channel, record.key.clone(), value)
                        .await?;
                }
            }
        }

        Ok(())
    }

    /// Convenience for driving without an executor: partition the key,
    /// assign the next offset and process the record inline
    pub async fn pipe(&self, channel: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let partition = partition_for_key(&key, self.partitions);
        let offset = self
            .offsets
            .entry(channel.to_string())
            .or_default()
            .fetch_add(1, Ordering::SeqCst);
        self.process(channel, Record::new(partition, offset, key, value))
            .await
    }

    /// Typed encode-then-pipe convenience
    pub async fn pipe_as<K, V>(
        &self,
        channel: &str,
        key: &K,
        value: &V,
        key_codec: &dyn Codec<K>,
        value_codec: &dyn Codec<V>,
    ) -> Result<()> {
        self.pipe(channel, key_codec.encode(key)?, value_codec.encode(value)?)
            .await
    }

    /// Open a read-only view over a registered store
    pub fn view<K, A>(
        &self,
        store: &str,
        key_codec: Arc<dyn Codec<K>>,
        agg_codec: Arc<dyn Codec<A>>,
    ) -> Result<MaterializedView<K, A>> {
        let slot = self
            .topology
            .stores
            .iter()
            .position(|s| s == store)
            .ok_or_else(|| StateError::UnknownStore(store.to_string()))?;

        Ok(MaterializedView::new(
            store.to_string(),
            self.stores[slot].clone(),
            key_codec,
            agg_codec,
        ))
    }
}

fn push_children(work: &mut Vec<(NodeId, Vec<u8>)>, children: &[NodeId], value: Vec<u8>) {
    match children {
        [] => {}
        [only] => work.push((*only, value)),
        _ => {
            for &child in children.iter().rev() {
                work.push((child, value.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::topology::builder::StreamBuilder;

    fn key_codec() -> JsonCodec<u64> {
        JsonCodec::new()
    }

    fn value_codec() -> JsonCodec<String> {
        JsonCodec::new()
    }

    async fn pipe_str(driver: &TopologyDriver, key: u64, value: &str) {
        driver
            .pipe_as("in", &key, &value.to_string(), &key_codec(), &value_codec())
            .await
            .unwrap();
    }

    fn drain_str(driver: &TopologyDriver, channel: &str) -> Vec<(u64, String)> {
        driver
            .sinks()
            .drain_as(channel, &key_codec(), &value_codec())
            .unwrap()
    }

    #[tokio::test]
    async fn test_filter_map_chain() {
        let builder = StreamBuilder::new();
        builder
            .stream("in", key_codec(), value_codec())
            .filter("non-empty", |_k, v: &String| !v.is_empty())
            .map_values("upper", value_codec(), |v| v.to_uppercase())
            .to("out");
        let driver = TopologyDriver::new(builder.build().unwrap(), 2);

        pipe_str(&driver, 1, "hello").await;
        pipe_str(&driver, 2, "").await;
        pipe_str(&driver, 1, "again").await;

        let out = drain_str(&driver, "out");
        assert_eq!(
            out,
            vec![(1, "HELLO".to_string()), (1, "AGAIN".to_string())]
        );
    }

    #[tokio::test]
    async fn test_branch_routes_each_record_to_exactly_one_arm() {
        let builder = StreamBuilder::new();
        let mut branches = builder
            .stream("in", key_codec(), value_codec())
            .split("by-size")
            .branch("short", |_k, v: &String| v.len() <= 3)
            .branch("medium", |_k, v: &String| v.len() <= 6)
            .default_branch("long");
        branches.take("short").unwrap().to("short-out");
        branches.take("medium").unwrap().to("medium-out");
        branches.take("long").unwrap().to("long-out");
        let driver = TopologyDriver::new(builder.build().unwrap(), 2);

        // len 2 matches both arms' predicates; first declared wins.
        pipe_str(&driver, 1, "ab").await;
        pipe_str(&driver, 1, "abcde").await;
        pipe_str(&driver, 1, "abcdefgh").await;

        assert_eq!(drain_str(&driver, "short-out").len(), 1);
        assert_eq!(drain_str(&driver, "medium-out").len(), 1);
        assert_eq!(drain_str(&driver, "long-out").len(), 1);
    }

    #[tokio::test]
    async fn test_merge_carries_both_parents() {
        let builder = StreamBuilder::new();
        let mut branches = builder
            .stream("in", key_codec(), value_codec())
            .split("by-case")
            .branch("upper", |_k, v: &String| {
                v.chars().all(|c| c.is_uppercase())
            })
            .default_branch("lower");
        let upper = branches.take("upper").unwrap();
        let lower = branches
            .take("lower")
            .unwrap()
            .map_values("uppercase", value_codec(), |v| v.to_uppercase());
        upper.merge(lower).to("out");
        let driver = TopologyDriver::new(builder.build().unwrap(), 2);

        pipe_str(&driver, 1, "AB").await;
        pipe_str(&driver, 2, "cd").await;

        let mut out = drain_str(&driver, "out");
        out.sort();
        assert_eq!(out, vec![(1, "AB".to_string()), (2, "CD".to_string())]);
    }

    #[tokio::test]
    async fn test_aggregate_updates_store_and_emits() {
        let builder = StreamBuilder::new();
        builder
            .stream("in", key_codec(), JsonCodec::<i64>::new())
            .aggregate(
                "sum",
                "totals",
                JsonCodec::<i64>::new(),
                || 0i64,
                |_k, v, acc| acc + v,
            )
            .to("out");
        let driver = TopologyDriver::new(builder.build().unwrap(), 4);

        let kc = key_codec();
        let vc = JsonCodec::<i64>::new();
        driver.pipe_as("in", &7, &10, &kc, &vc).await.unwrap();
        driver.pipe_as("in", &7, &-3, &kc, &vc).await.unwrap();
        driver.pipe_as("in", &9, &5, &kc, &vc).await.unwrap();

        // One update per input record, in per-key order.
        let out: Vec<(u64, i64)> = driver.sinks().drain_as("out", &kc, &vc).unwrap();
        assert_eq!(out.len(), 3);
        let for_seven: Vec<i64> = out.iter().filter(|(k, _)| *k == 7).map(|(_, v)| *v).collect();
        assert_eq!(for_seven, vec![10, 7]);

        let view = driver
            .view::<u64, i64>("totals", Arc::new(key_codec()), Arc::new(vc))
            .unwrap();
        assert_eq!(view.get(&7).await.unwrap(), Some(7));
        assert_eq!(view.get(&9).await.unwrap(), Some(5));
        assert_eq!(view.get(&1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_channel_rejected() {
        let builder = StreamBuilder::new();
        builder.stream("in", key_codec(), value_codec()).to("out");
        let driver = TopologyDriver::new(builder.build().unwrap(), 2);

        let err = driver
            .pipe("elsewhere", b"k".to_vec(), b"v".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::Topology(TopologyError::UnknownChannel(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_store_view_rejected() {
        let builder = StreamBuilder::new();
        builder.stream("in", key_codec(), value_codec()).to("out");
        let driver = TopologyDriver::new(builder.build().unwrap(), 2);

        let err = driver
            .view::<u64, i64>(
                "missing",
                Arc::new(key_codec()),
                Arc::new(JsonCodec::new()),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::State(StateError::UnknownStore(_))
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_partition_rejected() {
        let builder = StreamBuilder::new();
        builder.stream("in", key_codec(), value_codec()).to("out");
        let driver = TopologyDriver::new(builder.build().unwrap(), 2);

        let record = Record::new(9, 0, b"k".to_vec(), b"v".to_vec());
        assert!(driver.process("in", record).await.is_err());
    }
}
