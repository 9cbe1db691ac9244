//! Default client behaviour every server expects.

use std::any::Any;

use angler_events::{EventContext, ListenerError, Module, ModuleKey};
use angler_protocol::{Event, EventKind, Packet};

use crate::ClientConfig;

/// Sends client settings on join, answers keep-alives, and respawns.
#[derive(Debug)]
pub struct ClientDefaultsModule {
    config: ClientConfig,
}

impl ClientDefaultsModule {
    pub const KEY: ModuleKey = ModuleKey::new("client-defaults");

    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl Module for ClientDefaultsModule {
    fn key(&self) -> ModuleKey {
        Self::KEY
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::JoinGame, EventKind::KeepAlive, EventKind::UpdateHealth]
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError> {
        match event {
            Event::JoinGame { .. } => ctx.send(Packet::ClientSettings {
                locale: self.config.locale.clone(),
                view_distance: self.config.view_distance,
            }),
            Event::KeepAlive { id } => ctx.send(Packet::KeepAlive { id: *id }),
            Event::UpdateHealth { health, .. } if *health <= 0.0 => {
                tracing::info!("bot-died-respawning");
                ctx.send(Packet::Respawn);
                ctx.emit(Event::Respawned);
            }
            _ => {}
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
