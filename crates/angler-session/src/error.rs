//! Error types for the session layer.

use angler_protocol::ProtocolError;
use angler_transport::TransportError;

use crate::SessionState;

/// The identity backend could not produce an online identity.
///
/// Never fatal: the resolver falls back to an offline identity and
/// reports this as a warning.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The identity cache could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The identity cache is not valid JSON of the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is missing or empty.
    #[error("identity cache is missing {0}")]
    Incomplete(&'static str),

    /// The cached token is past its expiry.
    #[error("cached access token expired")]
    Expired,
}

/// A realm directory call failed.
#[derive(Debug, thiserror::Error)]
pub enum RealmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory answered with an unexpected status.
    #[error("realm directory error ({status}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },
}

/// The liveness probe got no usable answer.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Connecting or exchanging frames failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The answer was not a status report.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server closed the connection without answering.
    #[error("server closed the connection without a status report")]
    NoAnswer,

    /// The server did not answer in time.
    #[error("status probe timed out")]
    Timeout,
}

/// Endpoint resolution failed.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The realm never reported an address. Not retried.
    #[error("realm address not available after {attempts} attempts")]
    RealmUnavailable {
        /// How many times the directory was polled.
        attempts: u32,
    },

    /// The directory returned something that is not `host:port`.
    #[error("invalid server address: {0}")]
    InvalidAddress(String),
}

/// Errors from the session data model.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The lifecycle state machine was asked to skip or reverse a step.
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}
