//! The `Module` trait: the extension point for bot behaviour.
//!
//! A module is a feature unit (fishing, chat commands, webhook posts, ...)
//! that reacts to events and talks back through its [`EventContext`]. The
//! registry drives its lifecycle; the module itself never touches the bus
//! or the connection.

use std::any::Any;
use std::fmt;

use angler_protocol::{Event, EventKind};

use crate::{EventContext, ListenerError, ModuleError};

/// Stable name of a module type.
///
/// The registry keeps at most one module per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey(&'static str);

impl ModuleKey {
    /// Creates a key. Keys are compile-time names like `"fishing"`.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the key as a string.
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A unit of bot behaviour.
///
/// The registry calls `activate` before subscribing the module to its
/// [`interests`](Module::interests), and `deactivate` after unsubscribing
/// it. Between the two, `handle` is called once per matching event.
///
/// ## Example
///
/// ```rust
/// use std::any::Any;
/// use angler_events::{EventContext, ListenerError, Module, ModuleKey};
/// use angler_protocol::{Event, EventKind, Packet};
///
/// /// Answers every keep-alive.
/// struct Pong;
///
/// impl Module for Pong {
///     fn key(&self) -> ModuleKey {
///         ModuleKey::new("pong")
///     }
///
///     fn interests(&self) -> &'static [EventKind] {
///         &[EventKind::KeepAlive]
///     }
///
///     fn handle(&mut self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError> {
///         if let Event::KeepAlive { id } = event {
///             ctx.send(Packet::KeepAlive { id: *id });
///         }
///         Ok(())
///     }
///
///     fn as_any_mut(&mut self) -> &mut dyn Any {
///         self
///     }
/// }
/// ```
pub trait Module: Send + 'static {
    /// The module's type key.
    fn key(&self) -> ModuleKey;

    /// Event kinds this module wants to see.
    fn interests(&self) -> &'static [EventKind];

    /// Acquires whatever the module needs to run. Default: nothing.
    ///
    /// # Errors
    /// A module that can't run returns [`ModuleError::ActivationFailed`];
    /// the registry then leaves it disabled.
    fn activate(&mut self) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Releases what `activate` acquired. Must not rely on other modules
    /// still being enabled. Default: nothing.
    fn deactivate(&mut self) {}

    /// Reacts to one event.
    ///
    /// # Errors
    /// Errors are logged by the bus and never stop delivery.
    fn handle(&mut self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError>;

    /// Upcast used by [`ModuleRegistry::with`](crate::ModuleRegistry::with).
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
