//! Serialization codecs for keys, values and aggregates
//!
//! Everything crossing an operator boundary, a sink channel or the state
//! store travels as bytes; a [`Codec`] pins down how a concrete type maps
//! to those bytes. The trait is object safe so stream handles can carry
//! `Arc<dyn Codec<T>>` without infecting the topology with format type
//! parameters.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Lossless byte round-trip for values of one type
///
/// Implementations must guarantee `decode(encode(v)) == v` for every value
/// the engine produces.
pub trait Codec<T>: Send + Sync {
    /// Encode a value to bytes
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes back into a value
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;

    /// Content type identifier for diagnostics
    fn content_type(&self) -> &'static str;
}

/// JSON codec backed by `serde_json`
///
/// The default choice for domain values: human-readable on the wire and in
/// the store, at the cost of some encoding overhead.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Create a new JSON codec
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode {
            content_type: self.content_type(),
            reason: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
            content_type: self.content_type(),
            reason: e.to_string(),
        })
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// Compact binary codec backed by `bincode`
///
/// Preferred for hot internal stores where payload size matters more than
/// readability.
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    /// Create a new bincode codec
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(value).map_err(|e| CodecError::Encode {
            content_type: self.content_type(),
            reason: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode {
            content_type: self.content_type(),
            reason: e.to_string(),
        })
    }

    fn content_type(&self) -> &'static str {
        "application/octet-stream"
    }
}
