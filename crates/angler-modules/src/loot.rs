//! Loot History: everything the rod has pulled out of the water.

use angler_protocol::Item;

/// Catches in the order they were made.
///
/// Owned by the fishing module but handed from one session to the next,
/// so it survives reconnects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LootHistory {
    items: Vec<Item>,
}

impl LootHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a catch.
    pub fn record(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total count per display name, in order of first catch.
    pub fn summary(&self) -> Vec<(String, u32)> {
        let mut totals: Vec<(String, u32)> = Vec::new();
        for item in &self.items {
            let name = item.display_name();
            let count = u32::from(item.count);
            match totals.iter_mut().find(|(n, _)| *n == name) {
                Some((_, total)) => *total += count,
                None => totals.push((name, count)),
            }
        }
        totals
    }
}

impl FromIterator<Item> for LootHistory {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
