//! Codec trait and implementations for persisted records and snapshots.
//!
//! The airlock layers never write bytes themselves. Entity records (the
//! only state that survives a restart) and diagnostic status snapshots are
//! handed to something implementing [`Codec`], which keeps the on-disk or
//! on-wire format swappable.

use serde::{Serialize, de::DeserializeOwned};

use crate::CodecError;

/// A codec that can encode Rust values to bytes and decode them back.
///
/// `decode` requires `DeserializeOwned` so the decoded value does not
/// borrow from the input buffer; callers usually drop the buffer right
/// after reading a save file.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`CodecError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`CodecError::Decode`] if the bytes are malformed or do not
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Human-readable, which is what the drill binary and save files want.
/// Behind the `json` feature (enabled by default).
///
/// ```rust
/// use airlock_types::{Codec, ContainerId, EntityId, EntityRecord, JsonCodec, LocationState};
///
/// let codec = JsonCodec;
/// let record = EntityRecord {
///     id: EntityId(7),
///     location: LocationState::InSettlement,
///     container: ContainerId(1),
/// };
///
/// let bytes = codec.encode(&record).unwrap();
/// let decoded: EntityRecord = codec.decode(&bytes).unwrap();
/// assert_eq!(record, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl JsonCodec {
    /// Encodes a value as indented JSON, for reports meant to be read by
    /// a person rather than parsed.
    pub fn encode_pretty<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(value).map_err(CodecError::Encode)
    }
}

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Decode)
    }
}
