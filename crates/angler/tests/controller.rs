//! The session controller against scripted collaborators.
//!
//! Every test runs on a paused clock, so backoff and realm polling take no
//! wall time and elapsed durations are exact.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use angler::{
    Collaborators, LifecycleNotice, SessionController, Settings, StopHandle, Termination,
};
use angler_protocol::{
    Codec, EntityId, Event, FISHING_BOBBER_OBJECT, Item, JsonCodec, Packet, StatusReport,
};
use angler_session::{
    AuthError, Identity, IdentityBackend, ProbeError, Prober, RealmDirectory, RealmError,
    SessionState,
};
use angler_transport::{Connection, ConnectionId, Connector, TransportError};
use tokio::sync::{Notify, broadcast};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

/// Shared record of everything the connector and its connections saw.
#[derive(Default)]
struct Wire {
    /// One script of server frames per successful open. An open with no
    /// script left fails.
    scripts: Mutex<VecDeque<Vec<Vec<u8>>>>,
    /// Keep connections open after their script instead of ending the
    /// stream.
    hold_open: bool,
    /// Stop the controller during this open.
    stop_on_open: Option<usize>,
    stopper: OnceLock<StopHandle>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    addresses: Mutex<Vec<(String, u16)>>,
    sent: Mutex<Vec<Packet>>,
}

impl Wire {
    fn new(scripts: Vec<Vec<Event>>) -> Self {
        Self::raw(
            scripts
                .iter()
                .map(|events| events.iter().map(|e| JsonCodec.encode(e).unwrap()).collect())
                .collect(),
        )
    }

    fn raw(scripts: Vec<Vec<Vec<u8>>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        }
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn sent(&self) -> Vec<Packet> {
        self.sent.lock().unwrap().clone()
    }
}

struct ScriptedConnector {
    wire: Arc<Wire>,
}

impl Connector for ScriptedConnector {
    type Connection = ScriptedConnection;

    async fn open(&self, host: &str, port: u16) -> Result<ScriptedConnection, TransportError> {
        let n = self.wire.opens.fetch_add(1, Ordering::SeqCst) + 1;
        self.wire.addresses.lock().unwrap().push((host.to_string(), port));
        if self.wire.stop_on_open == Some(n) {
            if let Some(stopper) = self.wire.stopper.get() {
                stopper.stop();
            }
        }

        let script = self.wire.scripts.lock().unwrap().pop_front();
        match script {
            Some(frames) => Ok(ScriptedConnection {
                id: ConnectionId::new(n as u64),
                frames: Mutex::new(frames.into()),
                closed: AtomicBool::new(false),
                close_signal: Notify::new(),
                wire: Arc::clone(&self.wire),
            }),
            None => Err(TransportError::ConnectFailed {
                addr: format!("{host}:{port}"),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            }),
        }
    }
}

struct ScriptedConnection {
    id: ConnectionId,
    frames: Mutex<VecDeque<Vec<u8>>>,
    closed: AtomicBool,
    close_signal: Notify,
    wire: Arc<Wire>,
}

impl Connection for ScriptedConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let packet: Packet = JsonCodec.decode(data).unwrap();
        self.wire.sent.lock().unwrap().push(packet);
        Ok(())
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let next = self.frames.lock().unwrap().pop_front();
        if next.is_some() {
            return Ok(next);
        }
        if self.wire.hold_open && !self.closed.load(Ordering::SeqCst) {
            self.close_signal.notified().await;
        }
        Ok(None)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.wire.closes.fetch_add(1, Ordering::SeqCst);
            self.close_signal.notify_one();
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Online when `online`, otherwise always failing.
#[derive(Clone, Default)]
struct Backend {
    online: bool,
    calls: Arc<AtomicUsize>,
}

impl IdentityBackend for Backend {
    async fn authenticate(&self, _cache: &Path) -> Result<Identity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.online {
            Ok(Identity::Online {
                profile_id: "0f3c".into(),
                access_token: "token".into(),
                username: "Angler".into(),
            })
        } else {
            Err(AuthError::Expired)
        }
    }
}

/// Reports "not ready" for the first `misses` polls.
#[derive(Clone, Default)]
struct Realms {
    misses: u32,
    polls: Arc<AtomicU32>,
}

impl RealmDirectory for Realms {
    async fn list_candidate_realms(&self, _: &Identity) -> Result<Vec<String>, RealmError> {
        Ok(vec!["7: Lake by Alex (fish)".into()])
    }

    async fn accept_terms(&self, _: &Identity) -> Result<(), RealmError> {
        Ok(())
    }

    async fn resolve_address(&self, _: &Identity, _: i64) -> Result<Option<String>, RealmError> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok((poll > self.misses).then(|| "realm.example:25570".to_string()))
    }
}

/// Reports a fixed status, or times out on every probe while `down`.
#[derive(Clone, Default)]
struct StubProber {
    down: bool,
    /// Stop the controller during this probe.
    stop_on_probe: Option<usize>,
    stopper: Arc<OnceLock<StopHandle>>,
    probes: Arc<AtomicUsize>,
}

impl StubProber {
    fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl Prober for StubProber {
    async fn probe(&self, _host: &str, _port: u16) -> Result<StatusReport, ProbeError> {
        let n = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.stop_on_probe == Some(n) {
            if let Some(stopper) = self.stopper.get() {
                stopper.stop();
            }
        }
        if self.down {
            return Err(ProbeError::Timeout);
        }
        Ok(StatusReport {
            protocol_version: 765,
            motd: "A Minecraft Server".into(),
            online_players: 1,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type TestController = SessionController<ScriptedConnector, Backend, Realms, StubProber>;

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.account.username = "Angler".into();
    settings.account.online_mode = false;
    settings.auto_reconnect = false;
    settings.auto_reconnect_secs = 3;
    settings
}

fn controller(settings: Settings, wire: &Arc<Wire>, backend: Backend, realms: Realms) -> TestController {
    controller_probing(settings, wire, backend, realms, StubProber::default())
}

fn controller_probing(
    settings: Settings,
    wire: &Arc<Wire>,
    backend: Backend,
    realms: Realms,
    prober: StubProber,
) -> TestController {
    let stopper = Arc::clone(&prober.stopper);
    let collaborators = Collaborators::new(
        ScriptedConnector {
            wire: Arc::clone(wire),
        },
        backend,
        realms,
        prober,
    );
    let controller = SessionController::new(settings, "account.json", collaborators);
    let _ = wire.stopper.set(controller.stop_handle());
    let _ = stopper.set(controller.stop_handle());
    controller
}

fn drain(rx: &mut broadcast::Receiver<LifecycleNotice>) -> Vec<LifecycleNotice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

const ME: EntityId = EntityId(10);
const BOBBER: EntityId = EntityId(77);

/// Join, bite, and land `item`.
fn catch(item: &str) -> Vec<Event> {
    vec![
        Event::JoinGame { entity_id: ME },
        Event::SpawnObject {
            entity_id: BOBBER,
            object_type: FISHING_BOBBER_OBJECT,
            owner_id: ME,
        },
        Event::EntityVelocity {
            entity_id: BOBBER,
            dx: 0,
            dy: -400,
            dz: 0,
        },
        Event::ItemRetrieved {
            item: Item::named(item),
        },
    ]
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_start_default_credentials_prevents_startup() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let mut settings = settings();
    settings.account.username = angler::DEFAULT_USERNAME.into();
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());
    let mut notices = controller.subscribe();

    let termination = controller.start().await;

    assert_eq!(termination, Termination::PreventedStartup);
    assert_eq!(wire.opens(), 0);
    assert!(controller.flags().prevent_startup);
    assert_eq!(
        drain(&mut notices),
        vec![
            LifecycleNotice::AwaitingCredentials,
            LifecycleNotice::Stopped {
                termination: Termination::PreventedStartup
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_realm_not_chosen_lists_realms_and_waits() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let mut settings = settings();
    settings.realm.id = 0;
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());
    let mut notices = controller.subscribe();

    let termination = controller.start().await;

    assert_eq!(termination, Termination::PreventedStartup);
    assert_eq!(wire.opens(), 0);
    assert_eq!(
        drain(&mut notices)[0],
        LifecycleNotice::AwaitingRealmSelection {
            realms: vec!["7: Lake by Alex (fish)".into()]
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_terms_not_accepted_waits() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let mut settings = settings();
    settings.realm.id = 7;
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());
    let mut notices = controller.subscribe();

    let termination = controller.start().await;

    assert_eq!(termination, Termination::PreventedStartup);
    assert_eq!(wire.opens(), 0);
    assert_eq!(drain(&mut notices)[0], LifecycleNotice::AwaitingTermsAcceptance);
}

// ---------------------------------------------------------------------------
// Realm resolution
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_start_realm_ready_on_fifth_poll_connects() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let mut settings = settings();
    settings.realm.id = 7;
    settings.realm.accept_tos = true;
    let realms = Realms {
        misses: 4,
        ..Realms::default()
    };
    let mut controller = controller(settings, &wire, Backend::default(), realms.clone());
    let began = Instant::now();

    let termination = controller.start().await;

    assert_eq!(termination, Termination::Finished);
    assert_eq!(realms.polls.load(Ordering::SeqCst), 5);
    assert_eq!(began.elapsed(), Duration::from_secs(8));
    assert_eq!(
        *wire.addresses.lock().unwrap(),
        vec![("realm.example".to_string(), 25570)]
    );
    assert!(!controller.flags().prevent_reconnect);
}

#[tokio::test(start_paused = true)]
async fn test_start_realm_never_ready_forbids_reconnect() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let mut settings = settings();
    settings.realm.id = 7;
    settings.realm.accept_tos = true;
    settings.auto_reconnect = true;
    let realms = Realms {
        misses: u32::MAX,
        ..Realms::default()
    };
    let mut controller = controller(settings, &wire, Backend::default(), realms.clone());

    let termination = controller.start().await;

    assert_eq!(termination, Termination::ReconnectForbidden);
    assert_eq!(realms.polls.load(Ordering::SeqCst), 5);
    assert_eq!(wire.opens(), 0);
    let flags = controller.flags();
    assert!(flags.prevent_reconnect);
    assert!(flags.wont_connect);
    assert!(!flags.running);
    assert_eq!(controller.state(), SessionState::Idle);
}

// ---------------------------------------------------------------------------
// Reconnect
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_start_open_always_fails_retries_at_interval() {
    let wire = Arc::new(Wire {
        stop_on_open: Some(4),
        ..Wire::new(vec![])
    });
    let mut settings = settings();
    settings.auto_reconnect = true;
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());
    let mut notices = controller.subscribe();
    let began = Instant::now();

    let termination = controller.start().await;

    assert_eq!(termination, Termination::Stopped);
    assert_eq!(wire.opens(), 4);
    assert_eq!(began.elapsed(), Duration::from_secs(9));
    assert!(!controller.flags().prevent_reconnect);
    let reconnects = drain(&mut notices)
        .into_iter()
        .filter(|n| *n == LifecycleNotice::Reconnecting { secs: 3 })
        .count();
    assert_eq!(reconnects, 3);
}

#[tokio::test(start_paused = true)]
async fn test_start_probe_fails_retries_at_interval() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let prober = StubProber {
        stop_on_probe: Some(3),
        ..StubProber::down()
    };
    let mut settings = settings();
    settings.auto_reconnect = true;
    let mut controller = controller_probing(
        settings,
        &wire,
        Backend::default(),
        Realms::default(),
        prober.clone(),
    );
    let mut notices = controller.subscribe();
    let began = Instant::now();

    let termination = controller.start().await;

    assert_eq!(termination, Termination::Stopped);
    assert_eq!(prober.probes(), 3);
    assert_eq!(wire.opens(), 0);
    assert_eq!(began.elapsed(), Duration::from_secs(6));
    let flags = controller.flags();
    assert!(!flags.prevent_reconnect);
    assert!(flags.wont_connect);
    let reconnects = drain(&mut notices)
        .into_iter()
        .filter(|n| *n == LifecycleNotice::Reconnecting { secs: 3 })
        .count();
    assert_eq!(reconnects, 2);
}

#[tokio::test(start_paused = true)]
async fn test_start_probe_fails_without_auto_reconnect_finishes() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let prober = StubProber::down();
    let mut controller = controller_probing(
        settings(),
        &wire,
        Backend::default(),
        Realms::default(),
        prober.clone(),
    );

    let termination = controller.start().await;

    assert_eq!(termination, Termination::Finished);
    assert_eq!(prober.probes(), 1);
    assert_eq!(wire.opens(), 0);
    assert!(!controller.flags().prevent_reconnect);
}

#[tokio::test(start_paused = true)]
async fn test_start_failed_probe_resets_session_fields() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let mut controller = controller_probing(
        settings(),
        &wire,
        Backend::default(),
        Realms::default(),
        StubProber::down(),
    );

    controller.start().await;

    let session = controller.session();
    assert_eq!(session.host, None);
    assert_eq!(session.port, None);
    assert_eq!(session.protocol_version, None);
}

#[tokio::test(start_paused = true)]
async fn test_start_auto_reconnect_off_finishes_after_one_session() {
    let wire = Arc::new(Wire::new(vec![vec![], vec![]]));
    let mut controller = controller(settings(), &wire, Backend::default(), Realms::default());

    let termination = controller.start().await;

    assert_eq!(termination, Termination::Finished);
    assert_eq!(wire.opens(), 1);
    assert_eq!(wire.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_loot_history_survives_reconnect() {
    let wire = Arc::new(Wire {
        stop_on_open: Some(3),
        ..Wire::new(vec![catch("cod"), catch("salmon")])
    });
    let mut settings = settings();
    settings.auto_reconnect = true;
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());

    let termination = controller.start().await;

    assert_eq!(termination, Termination::Stopped);
    assert_eq!(
        controller.loot_history().items(),
        &[Item::named("cod"), Item::named("salmon")]
    );
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_start_online_auth_failure_plays_offline() {
    let wire = Arc::new(Wire::new(vec![vec![Event::LoginSuccess {
        uuid: "u".into(),
        username: "Angler".into(),
    }]]));
    let mut settings = settings();
    settings.account.online_mode = true;
    let backend = Backend::default();
    let mut controller = controller(settings, &wire, backend.clone(), Realms::default());
    let mut notices = controller.subscribe();

    controller.start().await;

    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.identity(), Some(&Identity::offline("Angler")));
    let notices = drain(&mut notices);
    assert!(matches!(
        &notices[0],
        LifecycleNotice::IdentityFallback { username, .. } if username == "Angler"
    ));
    assert!(matches!(&notices[1], LifecycleNotice::Started { .. }));
    assert!(wire.sent().contains(&Packet::LoginStart {
        username: "Angler".into()
    }));
}

#[tokio::test(start_paused = true)]
async fn test_start_invalid_session_kick_resolves_identity_again() {
    let wire = Arc::new(Wire {
        stop_on_open: Some(2),
        ..Wire::new(vec![vec![Event::Kicked {
            reason: "Invalid session (Try restarting your game)".into(),
        }]])
    });
    let mut settings = settings();
    settings.account.online_mode = true;
    settings.auto_reconnect = true;
    let backend = Backend {
        online: true,
        ..Backend::default()
    };
    let mut controller = controller(settings, &wire, backend.clone(), Realms::default());

    let termination = controller.start().await;

    assert_eq!(termination, Termination::Stopped);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    assert!(controller.identity().is_some_and(Identity::is_online));
}

// ---------------------------------------------------------------------------
// Active session
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_start_enables_modules_in_plan_order() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let mut settings = settings();
    settings.chat_commands.enabled = true;
    settings.webhook.enabled = true;
    settings.auto_loot_ejection.enabled = true;
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());
    let mut notices = controller.subscribe();

    controller.start().await;

    let Some(LifecycleNotice::Started { modules }) = drain(&mut notices).into_iter().next()
    else {
        panic!("no started notice");
    };
    let keys: Vec<&str> = modules.iter().map(|k| k.as_str()).collect();
    assert_eq!(
        keys,
        [
            "handshake",
            "login",
            "client-defaults",
            "fishing",
            "chat-proxy",
            "chat-command",
            "webhook",
            "ejection",
        ]
    );
    assert!(controller.module_keys().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_start_session_opened_sends_handshake_then_login() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let mut settings = settings();
    settings.server.host = "mc.example".into();
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());

    controller.start().await;

    let sent = wire.sent();
    assert_eq!(
        sent[..2],
        [
            Packet::Handshake {
                protocol_version: 765,
                host: "mc.example".into(),
                port: 25565,
                next_state: angler_protocol::NextState::Login,
            },
            Packet::LoginStart {
                username: "Angler".into()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_default_protocol_overrides_probe() {
    let wire = Arc::new(Wire::new(vec![vec![]]));
    let mut settings = settings();
    settings.server.default_protocol = Some(340);
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());

    controller.start().await;

    assert!(matches!(
        wire.sent()[0],
        Packet::Handshake {
            protocol_version: 340,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_start_bye_command_forbids_reconnect() {
    let wire = Arc::new(Wire::new(vec![
        vec![Event::ChatReceived {
            message: "<Alex> Angler, bye".into(),
        }],
        vec![],
    ]));
    let mut settings = settings();
    settings.auto_reconnect = true;
    settings.chat_commands.enabled = true;
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());

    let termination = controller.start().await;

    assert_eq!(termination, Termination::ReconnectForbidden);
    assert_eq!(wire.opens(), 1);
    assert!(wire.sent().contains(&Packet::ChatMessage { text: "Bye!".into() }));
}

#[tokio::test(start_paused = true)]
async fn test_start_undecodable_frame_tears_down() {
    let wire = Arc::new(Wire::raw(vec![vec![
        br#"{"type":"keep_alive","id":1}"#.to_vec(),
        b"not an event".to_vec(),
        br#"{"type":"keep_alive","id":2}"#.to_vec(),
    ]]));
    let mut controller = controller(settings(), &wire, Backend::default(), Realms::default());

    let termination = controller.start().await;

    assert_eq!(termination, Termination::Finished);
    assert!(wire.sent().contains(&Packet::KeepAlive { id: 1 }));
    assert!(!wire.sent().contains(&Packet::KeepAlive { id: 2 }));
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(controller.player().is_none());
    assert_eq!(controller.session().host, None);
}

#[tokio::test(start_paused = true)]
async fn test_stop_interrupts_receive() {
    let wire = Arc::new(Wire {
        hold_open: true,
        ..Wire::new(vec![vec![Event::JoinGame { entity_id: ME }]])
    });
    let mut settings = settings();
    settings.auto_reconnect = true;
    let mut controller = controller(settings, &wire, Backend::default(), Realms::default());
    let stop = controller.stop_handle();

    let (termination, ()) = tokio::join!(controller.start(), async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        stop.stop();
    });

    assert_eq!(termination, Termination::Stopped);
    assert_eq!(wire.opens(), 1);
    assert_eq!(wire.closes.load(Ordering::SeqCst), 1);
    let flags = controller.flags();
    assert!(flags.stop_requested);
    assert!(!flags.prevent_reconnect);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_hook_closes_live_connection() {
    let wire = Arc::new(Wire {
        hold_open: true,
        ..Wire::new(vec![vec![]])
    });
    let mut controller = controller(settings(), &wire, Backend::default(), Realms::default());
    let hook = controller.shutdown_hook();

    let (termination, ()) = tokio::join!(controller.start(), async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        hook.close().await;
    });

    assert_eq!(termination, Termination::Finished);
    assert_eq!(wire.closes.load(Ordering::SeqCst), 1);
}
