//! Throws unwanted loot out of the inventory.

use std::any::Any;

use angler_events::{EventContext, ListenerError, Module, ModuleKey};
use angler_protocol::{Event, EventKind, Packet};

use crate::{EjectionConfig, PLAYER_INVENTORY};

/// Drops listed items as soon as they show up in the inventory.
#[derive(Debug)]
pub struct EjectionModule {
    items: Vec<String>,
}

impl EjectionModule {
    pub const KEY: ModuleKey = ModuleKey::new("ejection");

    pub fn new(config: EjectionConfig) -> Self {
        Self { items: config.items }
    }
}

impl Module for EjectionModule {
    fn key(&self) -> ModuleKey {
        Self::KEY
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::SetSlot]
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError> {
        if let Event::SetSlot { window_id: PLAYER_INVENTORY, slot, item: Some(item) } = event {
            if self.items.iter().any(|name| *name == item.name) {
                tracing::info!(item = %item.name, slot, "ejecting-item");
                ctx.send(Packet::DropSlot {
                    slot: *slot,
                    whole_stack: true,
                });
            }
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
