//! Unified error type for Angler.

use angler_events::ModuleError;
use angler_protocol::ProtocolError;
use angler_session::{AuthError, EndpointError, ProbeError, RealmError, SessionError};
use angler_transport::TransportError;

use crate::{LoggingError, SettingsError};

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum AnglerError {
    /// Connecting, sending, or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bytes and types disagree.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A module refused to activate.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Online authentication failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The realm directory failed.
    #[error(transparent)]
    Realm(#[from] RealmError),

    /// No usable server address.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// The liveness probe failed.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// The lifecycle state machine was misused.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The settings file could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Logging could not be set up.
    #[error(transparent)]
    Logging(#[from] LoggingError),
}
