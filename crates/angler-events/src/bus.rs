//! The event bus: synchronous, ordered publish/subscribe.
//!
//! Listeners register for a set of [`EventKind`]s. `publish` walks the
//! registrations in the order they were made and hands the event to each
//! listener whose kind-set matches. Delivery is synchronous and transient:
//! nothing is queued for later, nothing is replayed.
//!
//! Listeners never get `&mut EventBus`. Anything they want to happen next
//! goes through their [`EventContext`]: outbound packets, follow-up events
//! (delivered after the current event reached everyone, FIFO), and
//! disconnect requests. That keeps a single total order of deliveries per
//! session even when modules talk to each other.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use angler_protocol::{Event, EventKind, Packet};

use crate::ListenerError;

/// Upper bound on events delivered by one `publish`, follow-ups included.
///
/// Two modules that keep answering each other would otherwise loop
/// forever inside the receive loop.
pub const MAX_CASCADE: usize = 64;

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Something that reacts to events.
///
/// Handlers take `&self`: a listener that keeps state guards it itself.
/// The bus only ever calls handlers from the task that owns it, so those
/// guards are uncontended.
pub trait Listener: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Handles one event.
    ///
    /// # Errors
    /// A returned error is logged and counted by the bus; delivery to the
    /// remaining listeners continues.
    fn on_event(
        &self,
        event: &Event,
        ctx: &mut EventContext,
    ) -> Result<(), ListenerError>;
}

/// A listener as the bus stores it.
pub type SharedListener = Arc<dyn Listener>;

/// Handle returned by [`EventBus::register`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// ---------------------------------------------------------------------------
// EventContext
// ---------------------------------------------------------------------------

/// A listener asking for the current session to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectRequest {
    /// Human-readable reason, logged by the controller.
    pub reason: String,
    /// `false` when automatic reconnection must not follow.
    pub reconnect: bool,
    /// `true` when the current identity must be resolved again before the
    /// next attempt.
    pub invalidate_identity: bool,
}

/// What a listener may do in response to an event.
#[derive(Debug, Default)]
pub struct EventContext {
    outbound: Vec<Packet>,
    follow_ups: VecDeque<Event>,
    disconnect: Option<DisconnectRequest>,
}

impl EventContext {
    /// Queues a packet for the server.
    pub fn send(&mut self, packet: Packet) {
        self.outbound.push(packet);
    }

    /// Publishes a follow-up event once the current one is fully delivered.
    pub fn emit(&mut self, event: Event) {
        self.follow_ups.push_back(event);
    }

    /// Ends the session; automatic reconnection may follow.
    pub fn disconnect(&mut self, reason: impl Into<String>) {
        self.request(reason.into(), true, false);
    }

    /// Ends the session and forbids automatic reconnection.
    pub fn stop(&mut self, reason: impl Into<String>) {
        self.request(reason.into(), false, false);
    }

    /// Ends the session and marks the identity as no longer valid.
    pub fn invalidate_identity(&mut self, reason: impl Into<String>) {
        self.request(reason.into(), true, true);
    }

    /// The disconnect requested so far, if any.
    pub fn disconnect_request(&self) -> Option<&DisconnectRequest> {
        self.disconnect.as_ref()
    }

    /// Splits the context into queued packets and follow-up events.
    ///
    /// Lets a module be driven directly, without a bus.
    pub fn into_parts(self) -> (Vec<Packet>, Vec<Event>) {
        (self.outbound, self.follow_ups.into())
    }

    /// Merges requests: the strictest answer wins.
    fn request(&mut self, reason: String, reconnect: bool, invalidate: bool) {
        match &mut self.disconnect {
            Some(existing) => {
                existing.reconnect &= reconnect;
                existing.invalidate_identity |= invalidate;
            }
            None => {
                self.disconnect = Some(DisconnectRequest {
                    reason,
                    reconnect,
                    invalidate_identity: invalidate,
                });
            }
        }
    }
}

/// The outcome of one [`EventBus::publish`].
#[derive(Debug, Default)]
pub struct Dispatch {
    /// Packets listeners asked to send, in the order they asked.
    pub outbound: Vec<Packet>,
    /// A disconnect request, if any listener made one.
    pub disconnect: Option<DisconnectRequest>,
    /// Number of (listener, event) deliveries made.
    pub delivered: usize,
    /// Number of deliveries whose handler failed.
    pub faults: usize,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

struct Registration {
    id: ListenerId,
    kinds: Vec<EventKind>,
    listener: SharedListener,
}

impl Registration {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Typed publish/subscribe core.
///
/// Owned by the session controller; registrations are session-scoped and
/// wiped by [`clear`](Self::clear) on every teardown.
#[derive(Default)]
pub struct EventBus {
    registrations: Vec<Registration>,
    next_id: u64,
    faults: u64,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `kinds`.
    ///
    /// Registering the same listener object again widens its kind-set and
    /// returns the original id, so one listener never sees one event twice.
    pub fn register(
        &mut self,
        listener: SharedListener,
        kinds: &[EventKind],
    ) -> ListenerId {
        if let Some(existing) = self
            .registrations
            .iter_mut()
            .find(|r| same_listener(&r.listener, &listener))
        {
            for kind in kinds {
                if !existing.kinds.contains(kind) {
                    existing.kinds.push(*kind);
                }
            }
            return existing.id;
        }

        self.next_id += 1;
        let id = ListenerId(self.next_id);
        tracing::debug!(listener = listener.name(), ?kinds, "listener registered");
        self.registrations.push(Registration {
            id,
            kinds: kinds.to_vec(),
            listener,
        });
        id
    }

    /// Removes a registration. Unknown ids are ignored.
    ///
    /// Returns `true` if something was removed.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        before != self.registrations.len()
    }

    /// Drops every registration.
    pub fn clear(&mut self) {
        self.registrations.clear();
    }

    /// Delivers `event`, then any follow-ups listeners emitted, in order.
    pub fn publish(&mut self, event: Event) -> Dispatch {
        let mut ctx = EventContext::default();
        let mut dispatch = Dispatch::default();
        ctx.follow_ups.push_back(event);

        let mut processed = 0;
        while let Some(event) = ctx.follow_ups.pop_front() {
            if processed == MAX_CASCADE {
                tracing::warn!(
                    dropped = ctx.follow_ups.len() + 1,
                    "event cascade limit reached, dropping follow-ups"
                );
                break;
            }
            processed += 1;
            self.deliver(&event, &mut ctx, &mut dispatch);
        }

        self.faults += dispatch.faults as u64;
        dispatch.outbound = ctx.outbound;
        dispatch.disconnect = ctx.disconnect;
        dispatch
    }

    fn deliver(&self, event: &Event, ctx: &mut EventContext, dispatch: &mut Dispatch) {
        let kind = event.kind();
        for registration in self.registrations.iter().filter(|r| r.wants(kind)) {
            dispatch.delivered += 1;
            let listener = &registration.listener;
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_event(event, ctx)))
                .unwrap_or_else(|panic| Err(ListenerError::Panicked(panic_message(&*panic))));

            if let Err(e) = result {
                dispatch.faults += 1;
                tracing::warn!(
                    listener = listener.name(),
                    %kind,
                    error = %e,
                    "listener-fault"
                );
            }
        }
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Listener failures recorded since the bus was created.
    pub fn fault_count(&self) -> u64 {
        self.faults
    }
}

fn same_listener(a: &SharedListener, b: &SharedListener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =========================================================================
// Tests
// =========================================================================
