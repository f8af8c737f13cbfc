//! Error types for the protocol layer.

/// Failures turning messages into bytes or back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not a valid message: malformed JSON, an unknown
    /// `type` tag, or a missing field.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but breaks a protocol rule, for example a first
    /// message that is not `Hello`.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
