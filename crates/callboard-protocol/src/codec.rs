//! Byte encoding for envelopes.
//!
//! The server only ever talks to a [`Codec`], so the wire format can change
//! without touching the handler. [`JsonCodec`] is what browsers speak.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts serde types to bytes and back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes `value`.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Parses `data` into an owned `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON via `serde_json`.
///
/// ```rust
/// use callboard_protocol::{ClientMessage, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let env = Envelope::new(3, 0, ClientMessage::MarkNumber { number: 17 });
/// let bytes = codec.encode(&env).unwrap();
/// let back: Envelope<ClientMessage> = codec.decode(&bytes).unwrap();
/// assert_eq!(env, back);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
