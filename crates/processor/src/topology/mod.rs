//! Topology construction and execution
//!
//! Split across four layers: [`node`] is the erased graph, [`builder`] is
//! the typed API that produces it, [`driver`] walks it record by record,
//! and [`executor`] runs the driver off partitioned sources.

pub mod builder;
pub mod driver;
pub mod executor;
pub mod node;

pub use builder::{BranchedStreams, KStream, SplitBuilder, StreamBuilder};
pub use driver::TopologyDriver;
pub use executor::{ExecutorStats, StatsSnapshot, StreamExecutor};
pub use node::{NodeId, Topology};
