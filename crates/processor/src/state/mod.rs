//! Keyed state management
//!
//! The aggregation operator keeps one aggregate per key in a state backend.
//! Ownership is arena style: each partition worker is the single writer for
//! its backend instance, while external readers (the query facade) only
//! ever take snapshot reads. The backend trait is async-first so a durable
//! implementation can slot in without touching the operators; this crate
//! ships the in-memory one.

pub mod backend;
pub mod memory;

pub use backend::StateBackend;
pub use memory::{MemoryBackendStats, MemoryStateBackend};

/// Type alias for state operation results
pub type StateResult<T> = Result<T, crate::error::StateError>;
