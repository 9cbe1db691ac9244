//! Wire protocol for Angler.
//!
//! This crate defines the "language" between the bot and a game server:
//!
//! - **Types** ([`Event`], [`Packet`], [`StatusReport`], ...): what the
//!   bot hears and what it says.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values are
//!   converted to/from frame payloads.
//! - **Errors** ([`ProtocolError`]): what can go wrong while converting.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (Event / Packet) → Event bus (modules)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Enchantment, EntityId, Event, EventKind, FISHING_BOBBER_OBJECT, Item,
    NextState, Packet, StatusReport,
};
