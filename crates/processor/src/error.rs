//! Error types for the stream processor
//!
//! Construction-time problems (malformed topologies, bad configuration) are
//! kept apart from processing-time faults (codec, state, transform) because
//! they follow different policies: the former abort before any event is
//! consumed, the latter are governed by the configured [`FaultPolicy`].
//!
//! [`FaultPolicy`]: crate::config::FaultPolicy

use thiserror::Error;

/// Main processor error type
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Encode/decode failure for a record's key or value
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// State store read or write failure
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Malformed topology, detected before any event is processed
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Invalid processor configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A value transform raised an error for a single record
    #[error("transform '{node}' failed: {source}")]
    Transform {
        node: String,
        #[source]
        source: anyhow::Error,
    },

    /// Publishing to a sink channel failed
    #[error("sink '{channel}' unavailable: {reason}")]
    Sink { channel: String, reason: String },

    /// Runtime failure outside the per-record path
    #[error("execution error: {0}")]
    Execution(String),
}

/// Serialization round-trip errors
#[derive(Error, Debug)]
pub enum CodecError {
    /// Value could not be encoded to bytes
    #[error("encode failed ({content_type}): {reason}")]
    Encode {
        content_type: &'static str,
        reason: String,
    },

    /// Bytes could not be decoded into the expected type
    #[error("decode failed ({content_type}): {reason}")]
    Decode {
        content_type: &'static str,
        reason: String,
    },
}

/// State backend operation errors
#[derive(Error, Debug)]
pub enum StateError {
    /// Backend storage failure
    #[error("storage error in {backend}: {details}")]
    Storage { backend: String, details: String },

    /// A query referenced a store the topology never registered
    #[error("unknown state store '{0}'")]
    UnknownStore(String),
}

/// Topology construction errors
///
/// All of these are configuration errors in the sense of the processing
/// contract: they are surfaced when the topology is built, never per event.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// Two branches of the same split share a name
    #[error("duplicate branch name '{name}' in split '{split}'")]
    DuplicateBranch { split: String, name: String },

    /// A split was given no name for its catch-all branch
    #[error("split '{0}' is missing a default branch")]
    MissingDefaultBranch(String),

    /// A branch name was requested that the split never declared
    #[error("split '{split}' has no branch named '{name}'")]
    UnknownBranch { split: String, name: String },

    /// Two aggregations registered the same store name
    #[error("duplicate state store name '{0}'")]
    DuplicateStore(String),

    /// A record arrived on a channel no source subscribes to
    #[error("unknown source channel '{0}'")]
    UnknownChannel(String),

    /// The topology has no source at all
    #[error("topology has no source channels")]
    NoSources,
}

/// Result type alias for processor operations
pub type Result<T> = std::result::Result<T, ProcessorError>;
