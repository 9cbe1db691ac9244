//! Identity, endpoint resolution, and session state for Angler.
//!
//! This crate answers the questions the controller asks before it can
//! open a connection:
//!
//! 1. **Who are we?**: [`IdentityResolver`] over an [`IdentityBackend`]
//! 2. **Where do we connect?**: [`EndpointResolver`] over a
//!    [`RealmDirectory`]
//! 3. **Is anyone there?**: a [`Prober`]
//!
//! and holds the data model of one connection attempt ([`Session`],
//! [`SessionState`], [`SessionFlags`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Controller (above)  ← drives the lifecycle
//!     ↕
//! Session Layer (this crate)  ← identity, address, liveness
//!     ↕
//! Transport / Protocol (below)  ← probe connections, status reports
//! ```

mod endpoint;
mod error;
mod identity;
mod probe;
mod realms;
mod session;

pub use endpoint::{
    EndpointConfig, EndpointResolver, NotReadyReason, REALM_POLL_ATTEMPTS,
    REALM_POLL_INTERVAL, RealmSelection, Resolution, parse_address,
};
pub use error::{AuthError, EndpointError, ProbeError, RealmError, SessionError};
pub use identity::{
    AccountCacheBackend, AuthMode, Identity, IdentityBackend, IdentityResolver,
    ResolvedIdentity,
};
pub use probe::{PROBE_TIMEOUT, Prober, TcpProber};
pub use realms::{
    DEFAULT_CLIENT_VERSION, REALMS_URL, RealmDirectory, RealmsClient, session_cookie,
};
pub use session::{FlagSnapshot, Session, SessionFlags, SessionState};
