//! Configuration for the stream processor
//!
//! Deserializable with serde so deployments can load it from whatever
//! configuration source wires the process together; `validate()` runs at
//! construction time so malformed settings fail before any event is
//! consumed.

use serde::{Deserialize, Serialize};

use crate::error::{ProcessorError, Result};

/// What to do when processing a single record fails
///
/// Covers transform errors and codec errors on the per-record path. Store
/// failures always halt the partition regardless of this setting, since the
/// aggregate for the affected key range can no longer advance safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Halt the owning partition worker with the error (default)
    FailPartition,
    /// Log the error and continue with the next record
    SkipRecord,
}

impl Default for FaultPolicy {
    fn default() -> Self {
        FaultPolicy::FailPartition
    }
}

/// Main processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Number of partitions, and therefore parallel workers
    #[serde(default = "default_partitions")]
    pub partitions: u32,

    /// Per-partition channel capacity before producers block
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Per-record failure policy
    #[serde(default)]
    pub fault_policy: FaultPolicy,
}

fn default_partitions() -> u32 {
    4
}

fn default_buffer_size() -> usize {
    1024
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            buffer_size: default_buffer_size(),
            fault_policy: FaultPolicy::default(),
        }
    }
}

impl ProcessorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(ProcessorError::Configuration(
                "partitions must be greater than 0".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(ProcessorError::Configuration(
                "buffer_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
