//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes and the types disagree. It
//! never means the network failed; that is a `TransportError`.

/// Errors that can occur while encoding packets or decoding events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Turning a packet into bytes failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame payload is not a valid value of the expected type:
    /// malformed JSON, unknown event tag, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value decoded but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
