//! Core protocol types: what the bot hears and what it says.
//!
//! Every inbound frame decodes into one [`Event`]. Every outbound frame is
//! one [`Packet`]. The bit-level encoding of a particular game version is
//! not modelled here; a [`Codec`](crate::Codec) maps these types to bytes.

// Serde derives give us the JSON shape for free. Events and packets are
// "internally tagged": `{ "type": "keep_alive", "id": 7 }` rather than
// `{ "KeepAlive": { "id": 7 } }`.
use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A server-assigned entity id.
///
/// Newtype over `i32` so an entity id can't be confused with a slot
/// number or a protocol version in function signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

/// Object type the server uses for a fishing bobber in `SpawnObject`.
pub const FISHING_BOBBER_OBJECT: i32 = 90;

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// An enchantment on an item, e.g. `mending` level 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enchantment {
    /// Lower-case enchantment name without namespace (`"luck_of_the_sea"`).
    pub name: String,
    /// Enchantment level, starting at 1.
    pub level: u16,
}

impl Enchantment {
    /// Returns the level as a roman numeral (`3` → `"III"`).
    ///
    /// Levels outside 1..=10 fall back to the plain number.
    pub fn roman_level(&self) -> String {
        const NUMERALS: [&str; 10] =
            ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];
        match self.level {
            1..=10 => NUMERALS[self.level as usize - 1].to_string(),
            other => other.to_string(),
        }
    }
}

/// An item stack as the server describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Lower-case item name without namespace (`"fishing_rod"`).
    pub name: String,
    /// Stack size.
    #[serde(default = "default_count")]
    pub count: u8,
    /// Damage value (durability used) for tools.
    #[serde(default)]
    pub damage: u16,
    /// Enchantments, empty when the item has none.
    #[serde(default)]
    pub enchantments: Vec<Enchantment>,
}

fn default_count() -> u8 {
    1
}

impl Item {
    /// Creates a plain, single, undamaged item.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 1,
            damage: 0,
            enchantments: Vec::new(),
        }
    }

    /// Returns `true` if the item carries at least one enchantment.
    pub fn is_enchanted(&self) -> bool {
        !self.enchantments.is_empty()
    }

    /// Returns `true` for the fish a rod can pull out of the water.
    pub fn is_fish(&self) -> bool {
        matches!(
            self.name.as_str(),
            "cod" | "salmon" | "pufferfish" | "tropical_fish"
                | "raw_fish" | "raw_salmon" | "clownfish"
        )
    }

    /// Human-readable name: `"enchanted_book"` → `"Enchanted Book"`.
    pub fn display_name(&self) -> String {
        self.name
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().chain(chars).collect::<String>()
                    }
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Event: facts published on the bus
// ---------------------------------------------------------------------------

/// An immutable fact the bot learned or a module announced.
///
/// Most variants are decoded from the server. A few are published by the
/// controller (`SessionOpened`) or by modules (`FishCaught`, ...) so other
/// modules can react without holding a reference to the publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // -- Decoded from the server --
    /// Login finished; the server accepted our name.
    LoginSuccess { uuid: String, username: String },

    /// The server closed the session on us.
    Kicked { reason: String },

    /// Server keep-alive; must be echoed back.
    KeepAlive { id: i64 },

    /// We have joined the world as `entity_id`.
    JoinGame { entity_id: EntityId },

    /// A chat line, already flattened to plain text.
    ChatReceived { message: String },

    /// Our own health changed.
    UpdateHealth { health: f32, food: i32, saturation: f32 },

    /// Our experience changed.
    UpdateExperience { level: i32, total: i32, progress: f32 },

    /// A non-living object (arrow, bobber, ...) appeared.
    SpawnObject {
        entity_id: EntityId,
        object_type: i32,
        owner_id: EntityId,
    },

    /// An entity's velocity changed, in 1/8000 blocks per tick.
    EntityVelocity {
        entity_id: EntityId,
        dx: i16,
        dy: i16,
        dz: i16,
    },

    /// Entities left view or were removed.
    DestroyEntities { entity_ids: Vec<EntityId> },

    /// An inventory slot changed. `item` is `None` when the slot emptied.
    SetSlot {
        window_id: i8,
        slot: i16,
        item: Option<Item>,
    },

    /// We picked up an item.
    ItemRetrieved { item: Item },

    /// The selected hotbar entry changed (`0..=8`).
    HeldItemChange { slot: i8 },

    // -- Published by the controller --
    /// The transport is open; modules should start their conversation.
    SessionOpened {
        host: String,
        port: u16,
        protocol_version: i32,
    },

    // -- Published by modules --
    /// We respawned after dying.
    Respawned,

    /// A reeled-in item was identified as the catch.
    FishCaught { item: Item },

    /// Some module wants a line said in chat.
    ChatOutgoing { text: String },

    /// The rod should be cast again from scratch.
    RecastRequested,

    /// Anything else; `kind` names it, `payload` is opaque to the bus.
    Custom { kind: String, payload: String },
}

/// The discriminant of an [`Event`], used for listener registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LoginSuccess,
    Kicked,
    KeepAlive,
    JoinGame,
    ChatReceived,
    UpdateHealth,
    UpdateExperience,
    SpawnObject,
    EntityVelocity,
    DestroyEntities,
    SetSlot,
    ItemRetrieved,
    HeldItemChange,
    SessionOpened,
    Respawned,
    FishCaught,
    ChatOutgoing,
    RecastRequested,
    Custom,
}

impl Event {
    /// Returns this event's kind.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::LoginSuccess { .. } => EventKind::LoginSuccess,
            Self::Kicked { .. } => EventKind::Kicked,
            Self::KeepAlive { .. } => EventKind::KeepAlive,
            Self::JoinGame { .. } => EventKind::JoinGame,
            Self::ChatReceived { .. } => EventKind::ChatReceived,
            Self::UpdateHealth { .. } => EventKind::UpdateHealth,
            Self::UpdateExperience { .. } => EventKind::UpdateExperience,
            Self::SpawnObject { .. } => EventKind::SpawnObject,
            Self::EntityVelocity { .. } => EventKind::EntityVelocity,
            Self::DestroyEntities { .. } => EventKind::DestroyEntities,
            Self::SetSlot { .. } => EventKind::SetSlot,
            Self::ItemRetrieved { .. } => EventKind::ItemRetrieved,
            Self::HeldItemChange { .. } => EventKind::HeldItemChange,
            Self::SessionOpened { .. } => EventKind::SessionOpened,
            Self::Respawned => EventKind::Respawned,
            Self::FishCaught { .. } => EventKind::FishCaught,
            Self::ChatOutgoing { .. } => EventKind::ChatOutgoing,
            Self::RecastRequested => EventKind::RecastRequested,
            Self::Custom { .. } => EventKind::Custom,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Packet: what the bot sends
// ---------------------------------------------------------------------------

/// What the handshake asks the server to switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextState {
    Status,
    Login,
}

/// An outbound message from the bot to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packet {
    /// First packet of every connection.
    Handshake {
        protocol_version: i32,
        host: String,
        port: u16,
        next_state: NextState,
    },

    /// Starts the login with our display name.
    LoginStart { username: String },

    /// Client options the server expects after joining.
    ClientSettings { locale: String, view_distance: u8 },

    /// Echo of a server keep-alive.
    KeepAlive { id: i64 },

    /// Right-click with the held item (cast or reel the rod).
    UseItem,

    /// A chat line or command.
    ChatMessage { text: String },

    /// Drops the content of an inventory slot.
    DropSlot { slot: i16, whole_stack: bool },

    /// Turns the head, in degrees. Yaw 0 faces south, pitch 0 the horizon.
    PlayerLook { yaw: f32, pitch: f32 },

    /// Asks the server to respawn us.
    Respawn,

    /// Asks for the server's status (liveness probe).
    StatusRequest,
}

// ---------------------------------------------------------------------------
// StatusReport: liveness probe answer
// ---------------------------------------------------------------------------

/// The server's answer to a [`Packet::StatusRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Protocol version the server speaks; picks the decode table.
    pub protocol_version: i32,
    /// Message of the day, as plain text.
    #[serde(default)]
    pub motd: String,
    /// Players currently online.
    #[serde(default)]
    pub online_players: u32,
}

// =========================================================================
// Tests
// =========================================================================
