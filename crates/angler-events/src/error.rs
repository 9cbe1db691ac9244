//! Error types for the event layer.

use crate::ModuleKey;

/// A listener failed while handling an event.
///
/// The bus logs and counts these; it never hands them back to the
/// publisher, so one broken listener can't stall the receive loop.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler panicked. The payload is the panic message if it was a
    /// string.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Errors that can occur while enabling a module.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The module's activation routine refused to start. Nothing was
    /// registered; the module stays fully disabled.
    #[error("module {module} failed to activate: {reason}")]
    ActivationFailed { module: ModuleKey, reason: String },
}
