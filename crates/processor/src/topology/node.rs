//! Type-erased topology graph
//!
//! The typed builder API compiles down to this arena: nodes hold erased
//! closures over encoded bytes, so the driver can walk any topology without
//! knowing the domain types that built it. Codecs are captured inside the
//! closures; the graph itself only ever sees `&[u8]`.

use std::collections::HashMap;
use std::fmt;

use crate::error::Result;

/// Index of a node in the topology arena
pub type NodeId = usize;

/// Erased filter predicate over encoded key and value
pub type FilterFn = Box<dyn Fn(&[u8], &[u8]) -> Result<bool> + Send + Sync>;

/// Erased value transform, returns the new encoded value
pub type MapFn = Box<dyn Fn(&[u8], &[u8]) -> Result<Vec<u8>> + Send + Sync>;

/// Erased branch selector, returns the index of the chosen arm
pub type SelectFn = Box<dyn Fn(&[u8], &[u8]) -> Result<usize> + Send + Sync>;

/// Erased reducer: key, value and prior aggregate bytes in, new aggregate
/// bytes out
pub type ReduceFn = Box<dyn Fn(&[u8], &[u8], Option<&[u8]>) -> Result<Vec<u8>> + Send + Sync>;

/// What one node does to a record
pub enum NodeKind {
    /// Entry point subscribed to a named channel
    Source { channel: String },
    /// Drops records whose predicate returns false
    Filter { predicate: FilterFn },
    /// Rewrites the value; the key is untouched
    MapValues { transform: MapFn },
    /// Routes each record to exactly one arm. `targets` is parallel to
    /// `arms`, with the default arm last.
    Branch {
        arms: Vec<String>,
        select: SelectFn,
        targets: Vec<NodeId>,
    },
    /// Folds the value into the per-key aggregate held in the state store
    /// at the given slot, emitting the updated aggregate downstream
    Aggregate { store: usize, reduce: ReduceFn },
    /// Forwards unchanged; used for branch arms and merge points
    Passthrough,
    /// Publishes to a named output channel
    Sink { channel: String },
}

impl NodeKind {
    fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Source { .. } => "source",
            NodeKind::Filter { .. } => "filter",
            NodeKind::MapValues { .. } => "map_values",
            NodeKind::Branch { .. } => "branch",
            NodeKind::Aggregate { .. } => "aggregate",
            NodeKind::Passthrough => "passthrough",
            NodeKind::Sink { .. } => "sink",
        }
    }
}

/// One node of the processing graph
pub struct Node {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            kind,
            children: Vec::new(),
        }
    }

    /// Node name as given at construction
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind.kind_name())
            .field("children", &self.children)
            .finish()
    }
}

/// Immutable processing graph produced by the builder
///
/// Structurally validated at build time; from then on the driver only walks
/// it, never mutates it.
pub struct Topology {
    pub(crate) nodes: Vec<Node>,
    pub(crate) sources: HashMap<String, NodeId>,
    pub(crate) stores: Vec<String>,
    pub(crate) sinks: Vec<String>,
}

impl Topology {
    /// Channels this topology consumes from
    pub fn source_channels(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Channels this topology publishes to
    pub fn sink_channels(&self) -> &[String] {
        &self.sinks
    }

    /// Registered state store names, in registration order
    pub fn store_names(&self) -> &[String] {
        &self.stores
    }

    /// Total number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl fmt::Debug for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topology")
            .field("nodes", &self.nodes)
            .field("sources", &self.sources)
            .field("stores", &self.stores)
            .field("sinks", &self.sinks)
            .finish()
    }
}
