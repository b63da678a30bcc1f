//! Error types for the codec layer.
//!
//! Each crate in the workspace defines its own error enum. A `CodecError`
//! always means a record or snapshot could not be turned into bytes (or
//! back), never that the airlock protocol itself misbehaved.

/// Errors that can occur while encoding or decoding records.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed input, missing fields, or a
    /// payload that belongs to a different record type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The bytes decoded, but the record they describe is impossible,
    /// e.g. an entity that is `Outside` while owned by a settlement.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
