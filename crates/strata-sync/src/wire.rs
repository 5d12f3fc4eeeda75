//! JSON codec for change batches.
//!
//! The change record is the wire format; a batch is serialized as a JSON
//! array of flat change objects (optional `col_name` / `value`, absent for
//! deletions). Decoding tolerates and normalizes malformed deletion shapes
//! the way the merge engine expects.

use serde::de::DeserializeOwned;
use serde::Serialize;
use strata_core::Change;
use thiserror::Error;

/// Errors produced by the wire codec.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("change batch serialization failed: {0}")]
    Serialization(String),

    #[error("change batch deserialization failed: {0}")]
    Deserialization(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Serialize a change batch to JSON.
pub fn encode_changes<K, V>(changes: &[Change<K, V>]) -> Result<String>
where
    K: Serialize + Clone,
    V: Serialize + Clone,
{
    serde_json::to_string(changes).map_err(|err| SyncError::Serialization(err.to_string()))
}

/// Deserialize a change batch from JSON.
pub fn decode_changes<K, V>(payload: &str) -> Result<Vec<Change<K, V>>>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    serde_json::from_str(payload).map_err(|err| SyncError::Deserialization(err.to_string()))
}
