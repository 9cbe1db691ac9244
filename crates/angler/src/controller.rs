//! The session controller: one connect, play, tear down, back off cycle,
//! repeated until something says stop.
//!
//! ```text
//! start()
//!   │
//!   ▼
//! Idle → Resolving → Probing → Connecting → Active → TearingDown
//!           │           │          │                     │
//!           └───────────┴──────────┴─────→ Backoff ←─────┘
//!                                             │
//!                                             └─→ Resolving (after the delay)
//! ```
//!
//! Every fault is classified into one of a handful of outcomes:
//!
//! | fault                                   | latch                              | next      |
//! |-----------------------------------------|------------------------------------|-----------|
//! | placeholder account, realm not chosen, terms not accepted | `prevent_startup` | Idle |
//! | realm address never appeared            | `wont_connect` + `prevent_reconnect` | Idle    |
//! | probe failed, open failed, stream ended | `wont_connect` (this attempt only) | Backoff   |
//! | online authentication failed            | none, plays offline                | continues |
//! | a module handler failed                 | none, isolated by the bus          | continues |

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use angler_events::{Dispatch, EventBus, ListenerId, ModuleKey, ModuleRegistry};
use angler_modules::{FishingModule, LootHistory};
use angler_protocol::{Codec, Event, JsonCodec, Packet};
use angler_session::{
    EndpointError, EndpointResolver, FlagSnapshot, Identity, IdentityBackend, IdentityResolver,
    NotReadyReason, Prober, RealmDirectory, Resolution, Session, SessionFlags, SessionState,
};
use angler_transport::{Connection, Connector};
use tokio::sync::{Notify, broadcast};

use crate::plan::build_modules;
use crate::{AnglerError, LifecycleNotice, Notifier, PlayerSnapshot, PlayerTracker, Settings};

/// Why [`SessionController::start`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The settings need fixing before the bot can start.
    PreventedStartup,
    /// A failure that retrying won't fix, or a module asked not to come back.
    ReconnectForbidden,
    /// Someone called [`StopHandle::stop`].
    Stopped,
    /// The session ended and automatic reconnect is off.
    Finished,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreventedStartup => write!(f, "startup prevented"),
            Self::ReconnectForbidden => write!(f, "reconnect forbidden"),
            Self::Stopped => write!(f, "stopped"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// The boundary implementations the controller drives.
pub struct Collaborators<T, A, D, P, C = JsonCodec> {
    pub connector: T,
    pub identity: A,
    pub realms: D,
    pub prober: P,
    pub codec: C,
}

impl<T, A, D, P> Collaborators<T, A, D, P, JsonCodec> {
    pub fn new(connector: T, identity: A, realms: D, prober: P) -> Self {
        Self {
            connector,
            identity,
            realms,
            prober,
            codec: JsonCodec,
        }
    }
}

/// Asks a running controller to stop.
///
/// The current session is torn down and no further attempt is made. A
/// pending backoff or receive is interrupted.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flags: SessionFlags,
    wake: Arc<Notify>,
}

impl StopHandle {
    pub fn stop(&self) {
        tracing::info!("bot-stopping");
        self.flags.request_stop();
        self.wake.notify_one();
    }
}

type LiveConnection<C> = Arc<Mutex<Option<Arc<C>>>>;

/// Closes whatever connection is live, from any task.
pub struct ShutdownHook<C> {
    live: LiveConnection<C>,
}

impl<C> Clone for ShutdownHook<C> {
    fn clone(&self) -> Self {
        Self {
            live: Arc::clone(&self.live),
        }
    }
}

impl<C: Connection> ShutdownHook<C> {
    pub async fn close(&self) {
        let conn = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(conn) = conn {
            tracing::info!(connection = %conn.id(), "shutdown-closing-connection");
            conn.close().await;
        }
    }
}

/// Owns the bus, the modules, and the session, and runs the lifecycle.
pub struct SessionController<T: Connector, A, D, P, C = JsonCodec> {
    settings: Settings,
    identity: IdentityResolver<A>,
    endpoint: EndpointResolver<D>,
    prober: P,
    connector: T,
    codec: C,
    session: Session,
    state: SessionState,
    flags: SessionFlags,
    bus: EventBus,
    registry: ModuleRegistry,
    notifier: Notifier,
    live: LiveConnection<T::Connection>,
    wake: Arc<Notify>,
    player: Option<(Arc<PlayerTracker>, ListenerId)>,
    /// Loot carried between sessions while no fishing module holds it.
    loot: LootHistory,
}

impl<T, A, D, P, C> SessionController<T, A, D, P, C>
where
    T: Connector,
    A: IdentityBackend,
    D: RealmDirectory,
    P: Prober,
    C: Codec,
{
    /// `account_file` is the identity cache handed to the backend.
    pub fn new(
        settings: Settings,
        account_file: impl Into<PathBuf>,
        collaborators: Collaborators<T, A, D, P, C>,
    ) -> Self {
        let identity = IdentityResolver::new(
            collaborators.identity,
            settings.account.username.clone(),
            account_file,
        );
        Self {
            settings,
            identity,
            endpoint: EndpointResolver::new(collaborators.realms),
            prober: collaborators.prober,
            connector: collaborators.connector,
            codec: collaborators.codec,
            session: Session::new(),
            state: SessionState::Idle,
            flags: SessionFlags::new(),
            bus: EventBus::new(),
            registry: ModuleRegistry::new(),
            notifier: Notifier::new(),
            live: Arc::new(Mutex::new(None)),
            wake: Arc::new(Notify::new()),
            player: None,
            loot: LootHistory::new(),
        }
    }

    /// Runs sessions until one of the [`Termination`] conditions holds.
    pub async fn start(&mut self) -> Termination {
        if self.settings.has_default_credentials() {
            tracing::warn!(username = %self.settings.account.username, "credentials-not-set");
            self.flags.prevent_startup();
            self.notifier.notify(LifecycleNotice::AwaitingCredentials);
        }
        if self.flags.startup_prevented() {
            return self.finish(Termination::PreventedStartup);
        }

        loop {
            if self.flags.stop_requested() {
                return self.finish(Termination::Stopped);
            }
            self.flags.set_running(true);
            self.run_once().await;
            // Early exits from resolving or probing skip teardown.
            self.session.reset_transient();

            if let Some(termination) = self.terminal() {
                return self.finish(termination);
            }

            self.transition(SessionState::Backoff);
            let delay = self.settings.reconnect_delay();
            self.notifier.notify(LifecycleNotice::Reconnecting {
                secs: delay.as_secs(),
            });
            tracing::info!(secs = delay.as_secs(), "bot-automatic-reconnect");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.wake.notified() => {}
            }
        }
    }

    /// One attempt, from resolution to teardown.
    async fn run_once(&mut self) {
        self.transition(SessionState::Resolving);
        self.flags.set_wont_connect(false);

        let identity = self.current_identity().await;
        let endpoint = self.settings.endpoint_config();

        let (host, port) = match self.endpoint.resolve(&endpoint, &identity).await {
            Ok(Resolution::Ready { host, port }) => (host, port),
            Ok(Resolution::NotReady(reason)) => {
                self.flags.prevent_startup();
                self.flags.set_wont_connect(true);
                self.notifier.notify(match reason {
                    NotReadyReason::AwaitingRealmSelection { realms } => {
                        LifecycleNotice::AwaitingRealmSelection { realms }
                    }
                    NotReadyReason::AwaitingTermsAcceptance => {
                        LifecycleNotice::AwaitingTermsAcceptance
                    }
                });
                return;
            }
            Err(e @ EndpointError::RealmUnavailable { .. }) => {
                tracing::error!(error = %e, "bot-will-not-connect");
                self.flags.set_wont_connect(true);
                self.flags.prevent_reconnect();
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "bot-will-not-connect");
                self.flags.set_wont_connect(true);
                return;
            }
        };
        self.session.host = Some(host.clone());
        self.session.port = Some(port);
        if self.flags.stop_requested() {
            return;
        }

        self.transition(SessionState::Probing);
        let protocol_version = match self.prober.probe(&host, port).await {
            Ok(report) => {
                let version = self
                    .settings
                    .server
                    .default_protocol
                    .unwrap_or(report.protocol_version);
                tracing::info!(
                    %host,
                    port,
                    protocol_version = version,
                    motd = %report.motd,
                    players = report.online_players,
                    "server-reachable"
                );
                version
            }
            Err(e) => {
                tracing::warn!(%host, port, error = %e, "server-not-reachable");
                self.flags.set_wont_connect(true);
                return;
            }
        };
        self.session.protocol_version = Some(protocol_version);
        if self.flags.stop_requested() {
            return;
        }

        self.transition(SessionState::Connecting);
        let conn = match self.connector.open(&host, port).await {
            Ok(conn) => Arc::new(conn),
            Err(e) => {
                tracing::error!(%host, port, error = %e, "bot-could-not-be-started");
                self.transition(SessionState::TearingDown);
                self.teardown().await;
                return;
            }
        };
        *self.live.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&conn));
        tracing::info!(%host, port, connection = %conn.id(), "bot-connected");

        self.transition(SessionState::Active);
        self.enable_modules(identity.username());
        self.notifier.notify(LifecycleNotice::Started {
            modules: self.registry.keys(),
        });

        let dispatch = self.bus.publish(Event::SessionOpened {
            host,
            port,
            protocol_version,
        });
        if self.apply(&conn, dispatch).await {
            self.receive_loop(&conn).await;
        }

        self.transition(SessionState::TearingDown);
        self.teardown().await;
    }

    /// The session identity, resolving a new one if there is none.
    async fn current_identity(&mut self) -> Identity {
        if let Some(identity) = &self.session.identity {
            return identity.clone();
        }
        let resolved = self.identity.resolve(self.settings.auth_mode()).await;
        if let Some(warning) = &resolved.warning {
            self.notifier.notify(LifecycleNotice::IdentityFallback {
                username: resolved.identity.username().to_string(),
                reason: warning.to_string(),
            });
        }
        self.session.identity = Some(resolved.identity.clone());
        resolved.identity
    }

    fn enable_modules(&mut self, username: &str) {
        let loot = std::mem::take(&mut self.loot);
        for module in build_modules(&self.settings, username, loot) {
            let key = module.key();
            if let Err(e) = self.registry.enable(&mut self.bus, module) {
                tracing::warn!(module = %key, error = %e, "module-could-not-be-enabled");
            }
        }

        // After the modules, so it sees each event once they have.
        let tracker = Arc::new(PlayerTracker::new());
        let id = self
            .bus
            .register(tracker.clone(), PlayerTracker::INTERESTS);
        self.player = Some((tracker, id));
    }

    async fn receive_loop(&mut self, conn: &T::Connection) {
        while self.flags.is_running() {
            let received = tokio::select! {
                received = conn.recv() => Some(received),
                () = self.wake.notified() => None,
            };
            let Some(received) = received else {
                continue;
            };

            let frame = match received {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::warn!(reason = "end of stream", "packet-could-not-be-received");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "packet-could-not-be-received");
                    break;
                }
            };
            let event: Event = match self.codec.decode(&frame) {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "packet-could-not-be-received");
                    break;
                }
            };

            let dispatch = self.bus.publish(event);
            if !self.apply(conn, dispatch).await {
                break;
            }
        }
    }

    /// Sends what the listeners queued and honours a disconnect request.
    ///
    /// Returns `false` when the session should end.
    async fn apply(&mut self, conn: &T::Connection, dispatch: Dispatch) -> bool {
        for packet in &dispatch.outbound {
            if let Err(e) = self.send(conn, packet).await {
                tracing::error!(error = %e, "packet-could-not-be-sent");
                self.flags.set_running(false);
                return false;
            }
        }

        if let Some(request) = dispatch.disconnect {
            tracing::info!(
                reason = %request.reason,
                reconnect = request.reconnect,
                invalidate_identity = request.invalidate_identity,
                "bot-disconnecting"
            );
            if !request.reconnect {
                self.flags.prevent_reconnect();
            }
            if request.invalidate_identity {
                self.session.invalidate_identity();
            }
            self.flags.set_running(false);
            return false;
        }
        self.flags.is_running()
    }

    async fn send(&self, conn: &T::Connection, packet: &Packet) -> Result<(), AnglerError> {
        let bytes = self.codec.encode(packet)?;
        conn.send(&bytes).await?;
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some((_, id)) = self.player.take() {
            self.bus.unregister(id);
        }
        self.bus.clear();

        if let Some(loot) = self
            .registry
            .with::<FishingModule, _>(FishingModule::take_loot_history)
        {
            self.loot = loot;
        }
        self.registry.disable_all(&mut self.bus);

        let conn = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(conn) = conn {
            conn.close().await;
        }

        self.session.reset_transient();
        tracing::info!(loot = self.loot.len(), "bot-disconnected");
    }

    fn terminal(&self) -> Option<Termination> {
        if self.flags.startup_prevented() {
            Some(Termination::PreventedStartup)
        } else if self.flags.reconnect_prevented() {
            Some(Termination::ReconnectForbidden)
        } else if self.flags.stop_requested() {
            Some(Termination::Stopped)
        } else if !self.settings.auto_reconnect {
            Some(Termination::Finished)
        } else {
            None
        }
    }

    fn finish(&mut self, termination: Termination) -> Termination {
        if self.state != SessionState::Idle {
            self.transition(SessionState::Idle);
        }
        self.flags.set_running(false);
        tracing::info!(%termination, "bot-stopped");
        self.notifier
            .notify(LifecycleNotice::Stopped { termination });
        termination
    }

    fn transition(&mut self, next: SessionState) {
        match self.state.transition(next) {
            Ok(state) => tracing::debug!(from = %self.state, to = %state, "session state"),
            Err(e) => tracing::warn!(error = %e, "unexpected-state-change"),
        }
        self.state = next;
    }

    // -- Read-only accessors --

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The identity the bot plays as, once resolved.
    pub fn identity(&self) -> Option<&Identity> {
        self.session.identity.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn flags(&self) -> FlagSnapshot {
        self.flags.snapshot()
    }

    /// Player state of the current session, if one is active.
    pub fn player(&self) -> Option<PlayerSnapshot> {
        self.player.as_ref().map(|(tracker, _)| tracker.snapshot())
    }

    /// Everything caught since the controller was built.
    pub fn loot_history(&self) -> LootHistory {
        self.registry
            .with::<FishingModule, _>(|fishing| fishing.loot_history().clone())
            .unwrap_or_else(|| self.loot.clone())
    }

    /// Keys of the running modules, in enable order.
    pub fn module_keys(&self) -> Vec<ModuleKey> {
        self.registry.keys()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flags: self.flags.clone(),
            wake: Arc::clone(&self.wake),
        }
    }

    pub fn shutdown_hook(&self) -> ShutdownHook<T::Connection> {
        ShutdownHook {
            live: Arc::clone(&self.live),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleNotice> {
        self.notifier.subscribe()
    }
}
