//! Serialization protocol for checkpoint payloads
//!
//! The store never looks inside a checkpoint, its metadata, or a pending write
//! value. Everything passes through a [`SerializerProtocol`] on the way in and
//! out, and the resulting bytes are kept as a string field of the JSON table.

use crate::error::{CheckpointError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// Protocol for serializing and deserializing checkpoint data
///
/// Implementations can provide custom serialization strategies. Output must
/// be valid UTF-8, since encoded blobs are persisted as JSON strings.
pub trait SerializerProtocol: Send + Sync {
    /// Serialize a value to bytes
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes
    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;

    /// Serialize to the string form stored in the record table
    fn dumps_str<T: Serialize>(&self, value: &T) -> Result<String> {
        String::from_utf8(self.dumps(value)?)
            .map_err(|e| CheckpointError::Encoding(format!("codec output is not UTF-8: {}", e)))
    }

    /// Deserialize from the string form stored in the record table
    fn loads_str<T: DeserializeOwned>(&self, data: &str) -> Result<T> {
        self.loads(data.as_bytes())
    }
}

/// JSON-based serializer (default)
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl SerializerProtocol for JsonSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}
