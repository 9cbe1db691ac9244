//! # Angler
//!
//! A headless fishing bot. This crate ties the layers together: it owns
//! the settings, the [`SessionController`] that drives one connection
//! after another, and the glue around it (logging, lifecycle notices, the
//! module plan).
//!
//! ```text
//! anglerbot (binary)         ← command line, signals
//!     ↕
//! angler (this crate)        ← controller, settings, logging
//!     ↕
//! angler-modules             ← handshake, login, fishing, ...
//!     ↕
//! angler-events              ← event bus, module registry
//!     ↕
//! angler-session             ← identity, endpoint, probe
//!     ↕
//! angler-protocol / angler-transport
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use angler::prelude::*;
//!
//! # async fn run() -> Result<(), AnglerError> {
//! let settings = Settings::load_or_create("config.json")?;
//! let collaborators = Collaborators::new(
//!     TcpConnector::new(),
//!     AccountCacheBackend,
//!     RealmsClient::new(),
//!     TcpProber::new(),
//! );
//! let mut controller = SessionController::new(settings, "account.json", collaborators);
//! let termination = controller.start().await;
//! println!("{termination}");
//! # Ok(())
//! # }
//! ```

mod controller;
mod error;
mod logging;
mod plan;
mod player;
mod presentation;
mod settings;

pub use controller::{Collaborators, SessionController, ShutdownHook, StopHandle, Termination};
pub use error::AnglerError;
pub use logging::{DEFAULT_FILTER, LoggingError, init_logging, rotate_logs};
pub use plan::{MODULE_PLAN, PlanEntry, PlanInputs, build_modules};
pub use player::{PlayerSnapshot, PlayerTracker};
pub use presentation::{LifecycleNotice, NOTICE_CAPACITY, Notifier};
pub use settings::{
    AccountSettings, DEFAULT_USERNAME, RealmSettings, ServerSettings, Settings, SettingsError,
};

/// Everything a binary needs to run the bot.
pub mod prelude {
    pub use crate::{
        AnglerError, Collaborators, LifecycleNotice, SessionController, Settings, StopHandle,
        Termination, init_logging,
    };
    pub use angler_session::{AccountCacheBackend, RealmsClient, TcpProber};
    pub use angler_transport::TcpConnector;
}
