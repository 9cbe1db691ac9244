//! Opens the conversation with the server.

use std::any::Any;

use angler_events::{EventContext, ListenerError, Module, ModuleKey};
use angler_protocol::{Event, EventKind, NextState, Packet};

/// Sends the handshake as soon as the connection is open.
///
/// The address and protocol come from the `SessionOpened` event, so the
/// module holds no configuration of its own.
#[derive(Debug, Default)]
pub struct HandshakeModule;

impl HandshakeModule {
    pub const KEY: ModuleKey = ModuleKey::new("handshake");
}

impl Module for HandshakeModule {
    fn key(&self) -> ModuleKey {
        Self::KEY
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::SessionOpened]
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError> {
        if let Event::SessionOpened { host, port, protocol_version } = event {
            tracing::debug!(%host, port, protocol_version, "sending handshake");
            ctx.send(Packet::Handshake {
                protocol_version: *protocol_version,
                host: host.clone(),
                port: *port,
                next_state: NextState::Login,
            });
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
