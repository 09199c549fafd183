//! Typed topology construction
//!
//! [`StreamBuilder`] hands out [`KStream`] handles, typed views onto the
//! growing graph. Each fluent operation appends an arena node whose erased
//! closure captures the codecs needed to decode at that hop, so by the time
//! [`StreamBuilder::build`] runs, the domain types have been fully erased.
//!
//! Structural validation is deferred to `build()`: problems found while
//! chaining (a duplicate branch name, say) are recorded and reported there,
//! keeping the fluent API free of mid-chain `Result`s.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use super::node::{
    FilterFn, MapFn, Node, NodeId, NodeKind, ReduceFn, SelectFn, Topology,
};
use crate::codec::Codec;
use crate::error::{ProcessorError, TopologyError};

#[derive(Default)]
struct BuilderInner {
    nodes: Vec<Node>,
    sources: HashMap<String, NodeId>,
    stores: Vec<String>,
    sinks: Vec<String>,
    // Split names whose default branch has not been declared yet.
    pending_splits: Vec<String>,
    // Structural errors found while chaining, reported at build().
    deferred: Vec<TopologyError>,
}

impl BuilderInner {
    fn add_node(&mut self, name: String, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(name, kind));
        id
    }

    fn add_child(&mut self, parent: NodeId, name: String, kind: NodeKind) -> NodeId {
        let id = self.add_node(name, kind);
        self.nodes[parent].children.push(id);
        id
    }
}

/// Entry point for declaring a processing topology
#[derive(Default)]
pub struct StreamBuilder {
    inner: Rc<RefCell<BuilderInner>>,
}

impl StreamBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a stream consuming the given channel
    ///
    /// Calling this twice with the same channel returns a second handle
    /// rooted at the same source node, so one input can feed several
    /// processing chains.
    pub fn stream<K, V>(
        &self,
        channel: &str,
        key_codec: impl Codec<K> + 'static,
        value_codec: impl Codec<V> + 'static,
    ) -> KStream<K, V> {
        let mut inner = self.inner.borrow_mut();
        let node = match inner.sources.get(channel) {
            Some(&id) => id,
            None => {
                let id = inner.add_node(
                    format!("source-{channel}"),
                    NodeKind::Source {
                        channel: channel.to_string(),
                    },
                );
                inner.sources.insert(channel.to_string(), id);
                id
            }
        };
        drop(inner);

        KStream {
            inner: Rc::clone(&self.inner),
            node,
            key_codec: Arc::new(key_codec),
            value_codec: Arc::new(value_codec),
        }
    }

    /// Finalize the graph, running structural validation
    pub fn build(self) -> Result<Topology, TopologyError> {
        let mut inner = self.inner.replace(BuilderInner::default());

        if let Some(split) = inner.pending_splits.pop() {
            return Err(TopologyError::MissingDefaultBranch(split));
        }
        if let Some(err) = inner.deferred.into_iter().next() {
            return Err(err);
        }
        if inner.sources.is_empty() {
            return Err(TopologyError::NoSources);
        }

        debug!(
            nodes = inner.nodes.len(),
            sources = inner.sources.len(),
            stores = inner.stores.len(),
            "topology built"
        );

        Ok(Topology {
            nodes: inner.nodes,
            sources: inner.sources,
            stores: inner.stores,
            sinks: inner.sinks,
        })
    }
}

/// Typed handle onto one point in the graph
///
/// Cheap to clone; a clone names the same node, so cloning before chaining
/// is how one stream fans out into several downstream chains.
pub struct KStream<K, V> {
    inner: Rc<RefCell<BuilderInner>>,
    node: NodeId,
    key_codec: Arc<dyn Codec<K>>,
    value_codec: Arc<dyn Codec<V>>,
}

impl<K, V> std::fmt::Debug for KStream<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KStream")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl<K, V> Clone for KStream<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            node: self.node,
            key_codec: Arc::clone(&self.key_codec),
            value_codec: Arc::clone(&self.value_codec),
        }
    }
}

impl<K: 'static, V: 'static> KStream<K, V> {
    /// Keep only records matching the predicate; the rest are dropped
    /// without a trace
    pub fn filter(
        self,
        name: &str,
        predicate: impl Fn(&K, &V) -> bool + Send + Sync + 'static,
    ) -> KStream<K, V> {
        let key_codec = Arc::clone(&self.key_codec);
        let value_codec = Arc::clone(&self.value_codec);
        let erased: FilterFn = Box::new(move |key, value| {
            let key = key_codec.decode(key)?;
            let value = value_codec.decode(value)?;
            Ok(predicate(&key, &value))
        });

        let node = self.inner.borrow_mut().add_child(
            self.node,
            name.to_string(),
            NodeKind::Filter { predicate: erased },
        );
        self.at(node)
    }

    /// Transform each value, keeping the key
    pub fn map_values<V2: 'static>(
        self,
        name: &str,
        value_codec: impl Codec<V2> + 'static,
        transform: impl Fn(&V) -> V2 + Send + Sync + 'static,
    ) -> KStream<K, V2> {
        self.try_map_values(name, value_codec, move |value| Ok(transform(value)))
    }

    /// Transform each value with a fallible function
    ///
    /// An error fails that record only; how the failure propagates is the
    /// executor's fault policy decision.
    pub fn try_map_values<V2: 'static>(
        self,
        name: &str,
        value_codec: impl Codec<V2> + 'static,
        transform: impl Fn(&V) -> anyhow::Result<V2> + Send + Sync + 'static,
    ) -> KStream<K, V2> {
        let in_codec = Arc::clone(&self.value_codec);
        let out_codec: Arc<dyn Codec<V2>> = Arc::new(value_codec);
        let out = Arc::clone(&out_codec);
        let node_name = name.to_string();
        let erased: MapFn = Box::new(move |_key, value| {
            let value = in_codec.decode(value)?;
            let mapped = transform(&value).map_err(|source| ProcessorError::Transform {
                node: node_name.clone(),
                source,
            })?;
            Ok(out.encode(&mapped)?)
        });

        let node = self.inner.borrow_mut().add_child(
            self.node,
            name.to_string(),
            NodeKind::MapValues { transform: erased },
        );

        KStream {
            inner: self.inner,
            node,
            key_codec: self.key_codec,
            value_codec: out_codec,
        }
    }

    /// Fold each record into a per-key aggregate held in a named store
    ///
    /// `init` produces the aggregate for a key's first record; `reduce`
    /// folds each value into the key's current aggregate. The returned
    /// stream carries the updated aggregate after every input record.
    /// Reducers must be total and deterministic; a panicking reducer is a
    /// programming error, not a processing fault.
    pub fn aggregate<A: 'static>(
        self,
        name: &str,
        store: &str,
        agg_codec: impl Codec<A> + 'static,
        init: impl Fn() -> A + Send + Sync + 'static,
        reduce: impl Fn(&K, V, A) -> A + Send + Sync + 'static,
    ) -> KStream<K, A> {
        let slot = {
            let mut inner = self.inner.borrow_mut();
            if inner.stores.iter().any(|s| s == store) {
                inner
                    .deferred
                    .push(TopologyError::DuplicateStore(store.to_string()));
            }
            inner.stores.push(store.to_string());
            inner.stores.len() - 1
        };

        let key_codec = Arc::clone(&self.key_codec);
        let value_codec = Arc::clone(&self.value_codec);
        let out_codec: Arc<dyn Codec<A>> = Arc::new(agg_codec);
        let out = Arc::clone(&out_codec);
        let erased: ReduceFn = Box::new(move |key, value, prior| {
            let key = key_codec.decode(key)?;
            let value = value_codec.decode(value)?;
            let current = match prior {
                Some(bytes) => out.decode(bytes)?,
                None => init(),
            };
            Ok(out.encode(&reduce(&key, value, current))?)
        });

        let node = self.inner.borrow_mut().add_child(
            self.node,
            name.to_string(),
            NodeKind::Aggregate {
                store: slot,
                reduce: erased,
            },
        );

        KStream {
            inner: self.inner,
            node,
            key_codec: self.key_codec,
            value_codec: out_codec,
        }
    }

    /// Open a split: records will be routed to exactly one of the declared
    /// branches, tried in declaration order
    ///
    /// The split is incomplete until [`SplitBuilder::default_branch`] names
    /// its catch-all arm; building a topology with an unfinished split
    /// fails.
    pub fn split(self, name: &str) -> SplitBuilder<K, V> {
        self.inner
            .borrow_mut()
            .pending_splits
            .push(name.to_string());

        SplitBuilder {
            stream: self,
            split: name.to_string(),
            arms: Vec::new(),
        }
    }

    /// Interleave this stream with another of the same type
    ///
    /// Every record from either parent flows through the merged stream; no
    /// relative order across the parents is promised.
    pub fn merge(self, other: KStream<K, V>) -> KStream<K, V> {
        let node = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.add_node("merge".to_string(), NodeKind::Passthrough);
            inner.nodes[self.node].children.push(id);
            inner.nodes[other.node].children.push(id);
            id
        };
        self.at(node)
    }

    /// Terminate the stream by publishing every record to a channel
    pub fn to(self, channel: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.add_child(
            self.node,
            format!("sink-{channel}"),
            NodeKind::Sink {
                channel: channel.to_string(),
            },
        );
        if !inner.sinks.iter().any(|c| c == channel) {
            inner.sinks.push(channel.to_string());
        }
    }

    fn at(self, node: NodeId) -> KStream<K, V> {
        KStream {
            inner: self.inner,
            node,
            key_codec: self.key_codec,
            value_codec: self.value_codec,
        }
    }
}

type ArmPredicate<K, V> = Box<dyn Fn(&K, &V) -> bool + Send + Sync>;

/// Accumulates the arms of one split
pub struct SplitBuilder<K, V> {
    stream: KStream<K, V>,
    split: String,
    arms: Vec<(String, ArmPredicate<K, V>)>,
}

impl<K: 'static, V: 'static> SplitBuilder<K, V> {
    /// Declare the next arm; earlier arms win ties
    pub fn branch(
        mut self,
        name: &str,
        predicate: impl Fn(&K, &V) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.arms.push((name.to_string(), Box::new(predicate)));
        self
    }

    /// Close the split with a catch-all arm for records no predicate
    /// claimed, and hand back the per-arm streams
    pub fn default_branch(self, name: &str) -> BranchedStreams<K, V> {
        let SplitBuilder {
            stream,
            split,
            arms,
        } = self;

        let mut names: Vec<String> = arms.iter().map(|(n, _)| n.clone()).collect();
        names.push(name.to_string());
        {
            let mut inner = stream.inner.borrow_mut();
            inner.pending_splits.retain(|s| s != &split);
            for (i, a) in names.iter().enumerate() {
                if names[..i].contains(a) {
                    inner.deferred.push(TopologyError::DuplicateBranch {
                        split: split.clone(),
                        name: a.clone(),
                    });
                }
            }
        }

        let key_codec = Arc::clone(&stream.key_codec);
        let value_codec = Arc::clone(&stream.value_codec);
        let predicates: Vec<ArmPredicate<K, V>> = arms.into_iter().map(|(_, p)| p).collect();
        let default_index = predicates.len();
        let select: SelectFn = Box::new(move |key, value| {
            let key = key_codec.decode(key)?;
            let value = value_codec.decode(value)?;
            for (i, predicate) in predicates.iter().enumerate() {
                if predicate(&key, &value) {
                    return Ok(i);
                }
            }
            Ok(default_index)
        });

        let (branch_node, targets) = {
            let mut inner = stream.inner.borrow_mut();
            let targets: Vec<NodeId> = names
                .iter()
                .map(|arm| {
                    inner.add_node(format!("{split}-{arm}"), NodeKind::Passthrough)
                })
                .collect();
            let branch = inner.add_child(
                stream.node,
                split.clone(),
                NodeKind::Branch {
                    arms: names.clone(),
                    select,
                    targets: targets.clone(),
                },
            );
            (branch, targets)
        };
        debug!(split = %split, arms = names.len(), node = branch_node, "split declared");

        let streams = names
            .into_iter()
            .zip(targets)
            .map(|(arm, target)| {
                let handle = KStream {
                    inner: Rc::clone(&stream.inner),
                    node: target,
                    key_codec: Arc::clone(&stream.key_codec),
                    value_codec: Arc::clone(&stream.value_codec),
                };
                (arm, handle)
            })
            .collect();

        BranchedStreams { split, streams }
    }
}

/// Per-arm streams of a completed split
pub struct BranchedStreams<K, V> {
    split: String,
    streams: Vec<(String, KStream<K, V>)>,
}

impl<K, V> BranchedStreams<K, V> {
    /// Take the stream for one arm by name
    ///
    /// Each arm can be taken once; asking for an unknown or already-taken
    /// arm is an error.
    pub fn take(&mut self, name: &str) -> Result<KStream<K, V>, TopologyError> {
        match self.streams.iter().position(|(arm, _)| arm == name) {
            Some(i) => Ok(self.streams.remove(i).1),
            None => Err(TopologyError::UnknownBranch {
                split: self.split.clone(),
                name: name.to_string(),
            }),
        }
    }
}
