//! Login: introduces the bot and watches for kicks.

use std::any::Any;

use angler_events::{EventContext, ListenerError, Module, ModuleKey};
use angler_protocol::{Event, EventKind, Packet};

/// Kick reasons that mean our credentials are no longer accepted.
const SESSION_REJECTED: &[&str] = &[
    "invalid session",
    "failed to verify username",
    "not authenticated",
];

/// Sends the login request and turns kicks into disconnects.
#[derive(Debug)]
pub struct LoginModule {
    username: String,
}

impl LoginModule {
    pub const KEY: ModuleKey = ModuleKey::new("login");

    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl Module for LoginModule {
    fn key(&self) -> ModuleKey {
        Self::KEY
    }

    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::SessionOpened, EventKind::LoginSuccess, EventKind::Kicked]
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError> {
        match event {
            Event::SessionOpened { .. } => {
                ctx.send(Packet::LoginStart {
                    username: self.username.clone(),
                });
            }
            Event::LoginSuccess { uuid, username } => {
                tracing::info!(%username, %uuid, "login-successful");
            }
            Event::Kicked { reason } => {
                tracing::warn!(%reason, "login-kicked");
                let lowered = reason.to_lowercase();
                if SESSION_REJECTED.iter().any(|r| lowered.contains(r)) {
                    ctx.invalidate_identity(format!("kicked: {reason}"));
                } else {
                    ctx.disconnect(format!("kicked: {reason}"));
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
