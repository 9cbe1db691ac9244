//! Session types: the data that describes one attempt at being connected.
//!
//! A "session" is the bot's record of the current connection attempt:
//! - WHERE it connects (host, port)
//! - HOW it talks (negotiated protocol version)
//! - WHO it is (the resolved [`Identity`])
//! - WHAT it is allowed to do next (the lifecycle [`SessionFlags`])

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Identity, SessionError};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the controller is in its lifecycle.
///
/// ```text
/// Idle → Resolving → Probing → Connecting → Active → TearingDown
///          │            │           │                    │
///          └────────────┴───────────┴──→ Backoff ←───────┘
///                                          │
///                                          └──→ Resolving | Idle
/// ```
///
/// Any state except `Active` and `TearingDown` may fall back to `Idle`
/// when the run ends for good. `Connecting` always goes through
/// `TearingDown` so a half-opened connection is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolving,
    Probing,
    Connecting,
    Active,
    TearingDown,
    Backoff,
}

impl SessionState {
    /// Returns `true` if a connection may exist in this state.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Active | Self::TearingDown)
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Idle, Resolving)
                | (Resolving, Probing | Backoff | Idle)
                | (Probing, Connecting | Backoff | Idle)
                | (Connecting, Active | TearingDown)
                | (Active, TearingDown)
                | (TearingDown, Backoff | Idle)
                | (Backoff, Resolving | Idle)
        )
    }

    /// Checked transition.
    ///
    /// # Errors
    /// [`SessionError::InvalidTransition`] if `target` is not reachable
    /// from `self` in one step.
    pub fn transition(self, target: Self) -> Result<Self, SessionError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(SessionError::InvalidTransition {
                from: self,
                to: target,
            })
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Resolving => write!(f, "Resolving"),
            Self::Probing => write!(f, "Probing"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Active => write!(f, "Active"),
            Self::TearingDown => write!(f, "TearingDown"),
            Self::Backoff => write!(f, "Backoff"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionFlags
// ---------------------------------------------------------------------------

/// Lifecycle flags shared between the controller and its handles.
///
/// Cloning shares the flags. `prevent_startup`, `prevent_reconnect`, and
/// `stop_requested` only ever go from `false` to `true`.
#[derive(Debug, Clone, Default)]
pub struct SessionFlags {
    running: Arc<AtomicBool>,
    prevent_startup: Arc<AtomicBool>,
    wont_connect: Arc<AtomicBool>,
    prevent_reconnect: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
}

/// A point-in-time copy of [`SessionFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlagSnapshot {
    pub running: bool,
    pub prevent_startup: bool,
    pub wont_connect: bool,
    pub prevent_reconnect: bool,
    pub stop_requested: bool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn startup_prevented(&self) -> bool {
        self.prevent_startup.load(Ordering::SeqCst)
    }

    pub fn prevent_startup(&self) {
        self.prevent_startup.store(true, Ordering::SeqCst);
    }

    /// Cleared at the start of every attempt.
    pub fn wont_connect(&self) -> bool {
        self.wont_connect.load(Ordering::SeqCst)
    }

    pub fn set_wont_connect(&self, value: bool) {
        self.wont_connect.store(value, Ordering::SeqCst);
    }

    pub fn reconnect_prevented(&self) -> bool {
        self.prevent_reconnect.load(Ordering::SeqCst)
    }

    pub fn prevent_reconnect(&self) {
        self.prevent_reconnect.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Clears `running` and latches the stop request.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> FlagSnapshot {
        FlagSnapshot {
            running: self.is_running(),
            prevent_startup: self.startup_prevented(),
            wont_connect: self.wont_connect(),
            prevent_reconnect: self.reconnect_prevented(),
            stop_requested: self.stop_requested(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The live connection attempt.
///
/// Target and protocol are reset at the end of every run. The identity is
/// kept across runs until something invalidates it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub protocol_version: Option<i32>,
    pub identity: Option<Identity>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything tied to the run that just ended.
    pub fn reset_transient(&mut self) {
        self.host = None;
        self.port = None;
        self.protocol_version = None;
    }

    /// Drops the identity so the next attempt resolves a fresh one.
    pub fn invalidate_identity(&mut self) {
        self.identity = None;
    }
}
