//! Codec for the opaque columns of a player row.
//!
//! The store never looks inside these values; it only needs every blob to
//! decode back to exactly what was written.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

pub fn encode_blob<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    rmp_serde::to_vec_named(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub fn decode_blob<T: DeserializeOwned>(bytes: &[u8], column: &str) -> Result<T, StorageError> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| StorageError::Serialization(format!("{column}: {e}")))
}

/// Encode an optional value; absent is NULL.
pub fn encode_optional<T: Serialize>(value: &Option<T>) -> Result<Option<Vec<u8>>, StorageError> {
    value.as_ref().map(encode_blob).transpose()
}

pub fn decode_optional<T: DeserializeOwned>(
    bytes: &Option<Vec<u8>>,
    column: &str,
) -> Result<Option<T>, StorageError> {
    bytes.as_deref().map(|b| decode_blob(b, column)).transpose()
}
