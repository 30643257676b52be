//! Synchronous named-event emitter.
//!
//! Used by the bridge to fan host events out to subscribers, and usable
//! on its own. Listeners run on the emitting thread in registration
//! order. A failing or panicking listener is logged and does not stop the
//! others.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle identifying one registration.
pub type ListenerId = u64;

/// Error type listeners may return.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

type ListenerFn<E> = Arc<dyn Fn(&E) -> Result<(), ListenerError> + Send + Sync>;

struct Slot<E> {
    id: ListenerId,
    once: bool,
    f: ListenerFn<E>,
}

struct EmitterState<E> {
    next_id: ListenerId,
    listeners: HashMap<String, Vec<Slot<E>>>,
}

/// Event emitter over payloads of type `E`. Clones share listeners.
pub struct EventEmitter<E> {
    state: Arc<Mutex<EmitterState<E>>>,
}

impl<E> Clone for EventEmitter<E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<E: 'static> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(EmitterState {
                next_id: 1,
                listeners: HashMap::new(),
            })),
        }
    }

    fn add<F>(&self, event: &str, once: bool, f: F) -> ListenerId
    where
        F: Fn(&E) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state
            .listeners
            .entry(event.to_string())
            .or_default()
            .push(Slot {
                id,
                once,
                f: Arc::new(f),
            });
        id
    }

    /// Subscribe to `event`.
    pub fn on<F>(&self, event: &str, f: F) -> ListenerId
    where
        F: Fn(&E) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.add(event, false, f)
    }

    /// Subscribe to the next occurrence of `event` only.
    ///
    /// The listener is removed before it runs, so a re-entrant emit from
    /// inside it does not call it again.
    pub fn once<F>(&self, event: &str, f: F) -> ListenerId
    where
        F: Fn(&E) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.add(event, true, f)
    }

    /// Remove one registration. `false` if it was already gone.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        let Some(slots) = state.listeners.get_mut(event) else {
            return false;
        };
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        let removed = slots.len() != before;
        if slots.is_empty() {
            state.listeners.remove(event);
        }
        removed
    }

    /// Call every listener of `event` with `payload`; returns how many ran.
    ///
    /// Listeners are snapshotted first, so subscribing or unsubscribing
    /// from inside a listener affects the next emit, not this one.
    pub fn emit(&self, event: &str, payload: &E) -> usize {
        let snapshot: Vec<(ListenerId, ListenerFn<E>)> = {
            let mut state = self.state.lock();
            let Some(slots) = state.listeners.get_mut(event) else {
                return 0;
            };
            let snapshot = slots.iter().map(|s| (s.id, s.f.clone())).collect();
            slots.retain(|s| !s.once);
            if slots.is_empty() {
                state.listeners.remove(event);
            }
            snapshot
        };

        for (id, f) in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| f(payload))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(event, listener = id, error = %e, "event listener failed");
                }
                Err(_) => {
                    tracing::error!(event, listener = id, "event listener panicked");
                }
            }
        }
        snapshot.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.state
            .lock()
            .listeners
            .get(event)
            .map_or(0, |slots| slots.len())
    }

    /// Event names with at least one listener, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().listeners.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove the listeners of `event`, or of every event when `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        let mut state = self.state.lock();
        match event {
            Some(event) => {
                state.listeners.remove(event);
            }
            None => state.listeners.clear(),
        }
    }
}
