//! Event bus and module registry for Angler.
//!
//! Everything the bot does after connecting happens here: decoded server
//! events are published on an [`EventBus`], and feature [`Module`]s held by
//! a [`ModuleRegistry`] react to them.
//!
//! # Key types
//!
//! - [`EventBus`]: synchronous publish/subscribe, registration order
//! - [`Listener`]: anything the bus can deliver to
//! - [`EventContext`]: how a listener sends packets, emits follow-up
//!   events, or asks to disconnect
//! - [`Module`]: the trait feature units implement
//! - [`ModuleRegistry`]: enables/disables modules, one per [`ModuleKey`]

mod bus;
mod error;
mod module;
mod registry;

pub use bus::{
    Dispatch, DisconnectRequest, EventBus, EventContext, Listener, ListenerId,
    MAX_CASCADE, SharedListener,
};
pub use error::{ListenerError, ModuleError};
pub use module::{Module, ModuleKey};
pub use registry::ModuleRegistry;
