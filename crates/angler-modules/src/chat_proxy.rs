//! Bridges chat between the server and the other modules.

use std::any::Any;

use angler_events::{EventContext, ListenerError, Module, ModuleKey};
use angler_protocol::{Event, EventKind, Packet};

/// Longest chat line the server accepts, in characters.
pub const MAX_CHAT_LEN: usize = 256;

/// Logs incoming chat and says what other modules ask it to say.
#[derive(Debug, Default)]
pub struct ChatProxyModule;

impl ChatProxyModule {
    pub const KEY: ModuleKey = ModuleKey::new("chat-proxy");
}

impl Module for ChatProxyModule {
    fn key(&self) -> ModuleKey {
        Self::KEY
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::ChatReceived, EventKind::ChatOutgoing]
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError> {
        match event {
            Event::ChatReceived { message } => tracing::info!(%message, "chat"),
            Event::ChatOutgoing { text } => {
                let text: String = text.chars().take(MAX_CHAT_LEN).collect();
                if !text.trim().is_empty() {
                    ctx.send(Packet::ChatMessage { text });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
