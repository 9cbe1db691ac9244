//! Module registry: one enabled instance per module key.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use angler_protocol::Event;

use crate::{
    EventBus, EventContext, Listener, ListenerError, ListenerId, Module,
    ModuleError, ModuleKey,
};

/// Adapts a boxed module to the bus's [`Listener`] interface.
///
/// The mutex is only ever taken by the task that owns the bus and the
/// registry, so it never blocks.
struct ModuleCell {
    key: ModuleKey,
    module: Mutex<Box<dyn Module>>,
}

impl ModuleCell {
    fn lock(&self) -> MutexGuard<'_, Box<dyn Module>> {
        // A panicking handler poisons the lock; the bus already reported
        // the panic, and the module keeps running.
        self.module.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Listener for ModuleCell {
    fn name(&self) -> &str {
        self.key.as_str()
    }

    fn on_event(&self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError> {
        self.lock().handle(event, ctx)
    }
}

struct Entry {
    cell: Arc<ModuleCell>,
    listener: ListenerId,
}

/// Lifecycle container for modules.
///
/// Enabling activates the module and subscribes it to the bus; disabling
/// unsubscribes it and deactivates it. No half-enabled state is ever
/// visible: a module whose activation fails is not stored and not
/// subscribed.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<Entry>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates `module` and subscribes it to `bus`.
    ///
    /// If a module with the same key is already enabled it is replaced.
    /// The old instance is unsubscribed but not deactivated; callers that
    /// need its resources released disable it first.
    ///
    /// # Errors
    /// Returns the module's own [`ModuleError`] if activation fails.
    pub fn enable(
        &mut self,
        bus: &mut EventBus,
        mut module: Box<dyn Module>,
    ) -> Result<(), ModuleError> {
        let key = module.key();
        module.activate()?;

        if let Some(pos) = self.position(key) {
            let old = self.entries.remove(pos);
            bus.unregister(old.listener);
            tracing::debug!(module = %key, "module replaced");
        }

        let interests = module.interests();
        let cell = Arc::new(ModuleCell {
            key,
            module: Mutex::new(module),
        });
        let listener = bus.register(cell.clone(), interests);
        self.entries.push(Entry { cell, listener });
        tracing::debug!(module = %key, "module enabled");
        Ok(())
    }

    /// Unsubscribes and deactivates the module with `key`.
    ///
    /// Returns `false` if no such module was enabled.
    pub fn disable(&mut self, bus: &mut EventBus, key: ModuleKey) -> bool {
        let Some(pos) = self.position(key) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        bus.unregister(entry.listener);
        entry.cell.lock().deactivate();
        tracing::debug!(module = %key, "module disabled");
        true
    }

    /// Disables every module and empties the registry.
    pub fn disable_all(&mut self, bus: &mut EventBus) {
        for entry in self.entries.drain(..) {
            bus.unregister(entry.listener);
            entry.cell.lock().deactivate();
        }
    }

    /// Runs `f` on the enabled module of concrete type `M`, if any.
    pub fn with<M: Module, R>(&self, f: impl FnOnce(&mut M) -> R) -> Option<R> {
        for entry in &self.entries {
            let mut guard = entry.cell.lock();
            if let Some(module) = guard.as_any_mut().downcast_mut::<M>() {
                return Some(f(module));
            }
        }
        None
    }

    /// Returns `true` if a module with `key` is enabled.
    pub fn contains(&self, key: ModuleKey) -> bool {
        self.position(key).is_some()
    }

    /// Keys of the enabled modules, in the order they were enabled.
    pub fn keys(&self) -> Vec<ModuleKey> {
        self.entries.iter().map(|e| e.cell.key).collect()
    }

    /// Number of enabled modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no module is enabled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: ModuleKey) -> Option<usize> {
        self.entries.iter().position(|e| e.cell.key == key)
    }
}
