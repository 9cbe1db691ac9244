//! What the bot knows about itself in the world.

use std::sync::{Mutex, PoisonError};

use angler_events::{EventContext, Listener, ListenerError};
use angler_protocol::{EntityId, Event, EventKind};

/// A copy of the tracked player state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub username: Option<String>,
    pub entity_id: Option<EntityId>,
    pub health: Option<f32>,
    pub food: Option<i32>,
    pub level: Option<i32>,
    pub experience: Option<i32>,
}

/// Follows login, join, health, and experience events.
///
/// Registered by the controller after the modules and dropped at
/// teardown, so a snapshot only ever describes the current session.
#[derive(Debug, Default)]
pub struct PlayerTracker {
    state: Mutex<PlayerSnapshot>,
}

impl PlayerTracker {
    pub const INTERESTS: &'static [EventKind] = &[
        EventKind::LoginSuccess,
        EventKind::JoinGame,
        EventKind::UpdateHealth,
        EventKind::UpdateExperience,
    ];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Listener for PlayerTracker {
    fn name(&self) -> &str {
        "player"
    }

    fn on_event(&self, event: &Event, _ctx: &mut EventContext) -> Result<(), ListenerError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match event {
            Event::LoginSuccess { username, .. } => state.username = Some(username.clone()),
            Event::JoinGame { entity_id } => state.entity_id = Some(*entity_id),
            Event::UpdateHealth { health, food, .. } => {
                state.health = Some(*health);
                state.food = Some(*food);
            }
            Event::UpdateExperience { level, total, .. } => {
                state.level = Some(*level);
                state.experience = Some(*total);
            }
            _ => {}
        }
        Ok(())
    }
}
