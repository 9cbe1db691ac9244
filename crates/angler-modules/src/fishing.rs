//! The fishing loop: cast, wait for a bite, reel in, record, repeat.
//!
//! ```text
//! cast ──→ bobber spawned ──(bite)──→ reel in ──→ item retrieved ──→ cast
//!  ↑                                                                  │
//!  └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A bite shows up as the bobber being yanked down: a velocity update for
//! our bobber whose vertical component is below [`BITE_THRESHOLD`].

use std::any::Any;

use angler_events::{EventContext, ListenerError, Module, ModuleKey};
use angler_protocol::{EntityId, Event, EventKind, FISHING_BOBBER_OBJECT, Item, Packet};

use crate::{AnnounceType, FishingConfig, LootHistory};

/// Bobber vertical velocity (1/8000 blocks per tick) that counts as a bite.
pub const BITE_THRESHOLD: i16 = -300;

/// Where the rod is in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FishingStage {
    /// Not in the world yet.
    Idle,
    /// Cast sent, waiting for our bobber to appear.
    Casting,
    /// Bobber in the water.
    Waiting(EntityId),
    /// Reeled in, waiting for the catch to land in the inventory.
    Reeling,
}

/// Automates fishing and keeps the [`LootHistory`].
#[derive(Debug)]
pub struct FishingModule {
    announce: AnnounceType,
    loot: LootHistory,
    own_id: Option<EntityId>,
    stage: FishingStage,
}

impl FishingModule {
    pub const KEY: ModuleKey = ModuleKey::new("fishing");

    /// Creates the module, continuing an earlier `loot` history.
    pub fn new(config: &FishingConfig, loot: LootHistory) -> Self {
        Self {
            announce: config.announce_type_chat,
            loot,
            own_id: None,
            stage: FishingStage::Idle,
        }
    }

    pub fn loot_history(&self) -> &LootHistory {
        &self.loot
    }

    /// Takes the history out, leaving an empty one behind.
    pub fn take_loot_history(&mut self) -> LootHistory {
        std::mem::take(&mut self.loot)
    }

    pub fn stage(&self) -> FishingStage {
        self.stage
    }

    fn cast(&mut self, ctx: &mut EventContext) {
        ctx.send(Packet::UseItem);
        self.stage = FishingStage::Casting;
    }

    fn caught(&mut self, item: &Item, ctx: &mut EventContext) {
        tracing::info!(item = %item.display_name(), count = item.count, "fishing-caught");
        self.loot.record(item.clone());
        if self.announce.admits(item) {
            ctx.emit(Event::ChatOutgoing {
                text: announcement(item),
            });
        }
        ctx.emit(Event::FishCaught { item: item.clone() });
        self.cast(ctx);
    }
}

/// Chat line for a catch: `Caught Enchanted Book (Mending, Unbreaking III)`.
pub fn announcement(item: &Item) -> String {
    let mut text = format!("Caught {}", item.display_name());
    if item.is_enchanted() {
        let enchantments: Vec<String> = item
            .enchantments
            .iter()
            .map(|e| {
                let name = Item::named(e.name.as_str()).display_name();
                if e.level > 1 {
                    format!("{name} {}", e.roman_level())
                } else {
                    name
                }
            })
            .collect();
        text.push_str(&format!(" ({})", enchantments.join(", ")));
    }
    text
}

impl Module for FishingModule {
    fn key(&self) -> ModuleKey {
        Self::KEY
    }

    fn interests(&self) -> &'static [EventKind] {
        &[
            EventKind::JoinGame,
            EventKind::Respawned,
            EventKind::RecastRequested,
            EventKind::SpawnObject,
            EventKind::EntityVelocity,
            EventKind::DestroyEntities,
            EventKind::ItemRetrieved,
        ]
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError> {
        match event {
            Event::JoinGame { entity_id } => {
                self.own_id = Some(*entity_id);
                self.cast(ctx);
            }
            Event::Respawned | Event::RecastRequested => {
                if self.own_id.is_some() {
                    self.cast(ctx);
                }
            }
            Event::SpawnObject { entity_id, object_type, owner_id }
                if *object_type == FISHING_BOBBER_OBJECT
                    && Some(*owner_id) == self.own_id
                    && self.stage == FishingStage::Casting =>
            {
                tracing::debug!(bobber = %entity_id, "bobber in the water");
                self.stage = FishingStage::Waiting(*entity_id);
            }
            Event::EntityVelocity { entity_id, dy, .. }
                if self.stage == FishingStage::Waiting(*entity_id) && *dy < BITE_THRESHOLD =>
            {
                tracing::debug!(bobber = %entity_id, dy, "bite");
                ctx.send(Packet::UseItem);
                self.stage = FishingStage::Reeling;
            }
            Event::DestroyEntities { entity_ids } => {
                // The bobber vanished without a bite (hooked a mob, drifted
                // too far, ...). Throw a new one.
                if let FishingStage::Waiting(bobber) = self.stage {
                    if entity_ids.contains(&bobber) {
                        self.cast(ctx);
                    }
                }
            }
            Event::ItemRetrieved { item } if self.stage == FishingStage::Reeling => {
                self.caught(item, ctx);
            }
            _ => {}
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
