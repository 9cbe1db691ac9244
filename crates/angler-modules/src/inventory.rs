//! The bot's own inventory, rebuilt from `SetSlot` and `HeldItemChange`.

use std::collections::BTreeMap;

use angler_protocol::{Event, Item};

/// Window id of the player's own inventory.
pub const PLAYER_INVENTORY: i8 = 0;

/// Inventory slot of the first hotbar entry.
pub const HOTBAR_START: i16 = 36;

/// Uses a new fishing rod has.
pub const ROD_DURABILITY: u16 = 64;

/// Main inventory and hotbar; crafting grid and armour slots lie below.
const STORAGE_SLOTS: std::ops::RangeInclusive<i16> = 9..=44;

/// What the server last told us about our inventory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    slots: BTreeMap<i16, Item>,
    /// Selected hotbar entry, `0..=8`.
    held: i8,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies inventory events; ignores everything else.
    pub fn observe(&mut self, event: &Event) {
        match event {
            Event::SetSlot {
                window_id: PLAYER_INVENTORY,
                slot,
                item,
            } => match item {
                Some(item) => {
                    self.slots.insert(*slot, item.clone());
                }
                None => {
                    self.slots.remove(slot);
                }
            },
            Event::HeldItemChange { slot } if (0..9).contains(slot) => self.held = *slot,
            _ => {}
        }
    }

    /// Inventory slot of the selected hotbar entry.
    pub fn held_slot(&self) -> i16 {
        HOTBAR_START + i16::from(self.held)
    }

    pub fn held_item(&self) -> Option<&Item> {
        self.slots.get(&self.held_slot())
    }

    /// The held item if it is a fishing rod.
    pub fn held_rod(&self) -> Option<&Item> {
        self.held_item().filter(|item| item.name == "fishing_rod")
    }

    /// Occupied storage slots except the held one, in slot order.
    pub fn droppable_slots(&self) -> Vec<i16> {
        let held = self.held_slot();
        self.slots
            .keys()
            .copied()
            .filter(|slot| STORAGE_SLOTS.contains(slot) && *slot != held)
            .collect()
    }
}

/// Uses left on a rod.
pub fn rod_durability(rod: &Item) -> u16 {
    ROD_DURABILITY.saturating_sub(rod.damage)
}
