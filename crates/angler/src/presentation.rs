//! Lifecycle notices for whatever front end is listening.
//!
//! The controller never knows who is listening. It broadcasts a
//! [`LifecycleNotice`] and moves on; a console printer, a GUI, or nothing
//! at all may be subscribed.

use std::fmt;

use angler_events::ModuleKey;
use tokio::sync::broadcast;

use crate::Termination;

/// Notices kept for a slow subscriber before the oldest are dropped.
pub const NOTICE_CAPACITY: usize = 32;

/// Something a user of the bot may want to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleNotice {
    /// The session is open and these modules are running.
    Started { modules: Vec<ModuleKey> },
    /// The controller has parked in `Idle` for good.
    Stopped { termination: Termination },
    /// The settings still hold the placeholder account.
    AwaitingCredentials,
    /// No realm id set; these are the candidates.
    AwaitingRealmSelection { realms: Vec<String> },
    /// Realm terms of service have to be accepted in the settings.
    AwaitingTermsAcceptance,
    /// The next attempt starts in `secs` seconds.
    Reconnecting { secs: u64 },
    /// Online authentication failed; playing offline as `username`.
    IdentityFallback { username: String, reason: String },
}

impl fmt::Display for LifecycleNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { modules } => {
                let names: Vec<&str> = modules.iter().map(|k| k.as_str()).collect();
                write!(f, "Bot started ({})", names.join(", "))
            }
            Self::Stopped { termination } => write!(f, "Bot stopped: {termination}"),
            Self::AwaitingCredentials => {
                write!(f, "Set your account in the settings file, then start again")
            }
            Self::AwaitingRealmSelection { realms } => {
                write!(f, "Pick a realm id in the settings file")?;
                for realm in realms {
                    write!(f, "\n  {realm}")?;
                }
                Ok(())
            }
            Self::AwaitingTermsAcceptance => {
                write!(f, "Accept the realm terms of service in the settings file")
            }
            Self::Reconnecting { secs } => write!(f, "Reconnecting in {secs} seconds"),
            Self::IdentityFallback { username, reason } => {
                write!(f, "Authentication failed ({reason}); playing offline as {username}")
            }
        }
    }
}

/// Sending half of the notice channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<LifecycleNotice>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { tx }
    }

    /// Broadcasts `notice`. Nobody listening is fine.
    pub fn notify(&self, notice: LifecycleNotice) {
        tracing::debug!(?notice, "lifecycle notice");
        let _ = self.tx.send(notice);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleNotice> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
