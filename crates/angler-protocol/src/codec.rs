//! Codec trait and implementations for frame payloads.
//!
//! A "codec" (coder/decoder) converts between Rust values and the bytes
//! carried by one transport frame. The session controller only needs
//! "decode the next frame into an [`Event`](crate::Event), or fail" and
//! "encode this [`Packet`](crate::Packet)", so the per-version wire format
//! of a real game server can live behind this trait without the rest of
//! the bot noticing.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to frame payloads and decodes them back.
///
/// `Send + Sync + 'static` because the controller holds its codec across
/// awaits inside a long-lived task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame payload.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't describe a `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Each frame is one JSON document, which makes captured traffic easy to
/// read and lets test servers be written in a few lines.
///
/// ## Example
///
/// ```rust
/// use angler_protocol::{Codec, Event, JsonCodec, Packet};
///
/// let codec = JsonCodec;
///
/// let bytes = codec.encode(&Packet::KeepAlive { id: 5 }).unwrap();
/// assert_eq!(bytes, br#"{"type":"keep_alive","id":5}"#);
///
/// let event: Event = codec.decode(br#"{"type":"keep_alive","id":5}"#).unwrap();
/// assert_eq!(event, Event::KeepAlive { id: 5 });
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
