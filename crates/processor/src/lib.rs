//! Keyed stream processing engine
//!
//! A minimal engine for continuous processing of keyed event streams. Two
//! capabilities carry the weight: stateful per-key aggregation backed by a
//! queryable materialized view, and first-match-wins conditional branching
//! with per-branch transforms and re-merge.
//!
//! A pipeline is declared once through the fluent [`StreamBuilder`] API,
//! compiled into an immutable [`Topology`], and then driven either record
//! by record through a [`TopologyDriver`] (the test and embedding path) or
//! concurrently by a [`StreamExecutor`] running one worker per partition.
//!
//! Per-key ordering is the load-bearing guarantee: all records for one key
//! hash to one partition, each partition is processed by a single worker in
//! arrival order, and every operator handles one record to completion
//! before the next.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use keystream_processor::{JsonCodec, StreamBuilder, TopologyDriver};
//!
//! # #[tokio::main]
//! # async fn main() -> keystream_processor::Result<()> {
//! let builder = StreamBuilder::new();
//! builder
//!     .stream("events", JsonCodec::<u64>::new(), JsonCodec::<i64>::new())
//!     .aggregate(
//!         "running-total",
//!         "totals",
//!         JsonCodec::<i64>::new(),
//!         || 0,
//!         |_key, delta, total| total + delta,
//!     )
//!     .to("totals-out");
//!
//! let driver = TopologyDriver::new(builder.build()?, 4);
//! let view = driver.view::<u64, i64>(
//!     "totals",
//!     Arc::new(JsonCodec::new()),
//!     Arc::new(JsonCodec::new()),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod query;
pub mod sink;
pub mod source;
pub mod state;
pub mod topology;

pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use config::{FaultPolicy, ProcessorConfig};
pub use core::{partition_for_key, Record};
pub use error::{CodecError, ProcessorError, Result, StateError, TopologyError};
pub use query::MaterializedView;
pub use sink::{InMemorySinks, SinkConnector};
pub use source::PartitionedSource;
pub use state::{MemoryStateBackend, StateBackend};
pub use topology::{
    BranchedStreams, KStream, SplitBuilder, StreamBuilder, StreamExecutor, Topology,
    TopologyDriver,
};
