//! Fan-out of state/arrival/error notifications to embedder-supplied
//! listeners (component D). Firing is synchronous from the worker thread;
//! listener implementations must not block for long.

use std::sync::Mutex;

use crate::{error::ProtocolError, state::LifecycleState};

/// Capability set a listener is polymorphic over. All methods default to
/// no-ops so implementers only override what they care about.
pub trait Listener: Send {
    fn state_changed(&self, _new_state: LifecycleState) {}
    fn message_received(&self) {}
    fn error(&self, _error: &ProtocolError) {}
}

/// An ordered set of listeners, guarded by its own mutex so `add_listener`
/// (called from application threads) and firing (from the worker thread)
/// can never race each other.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Mutex<Vec<Box<dyn Listener>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Box<dyn Listener>) {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).push(listener);
    }

    pub fn fire_state_changed(&self, new_state: LifecycleState) {
        for l in self.listeners.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            l.state_changed(new_state);
        }
    }

    pub fn fire_message_received(&self) {
        for l in self.listeners.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            l.message_received();
        }
    }

    pub fn fire_error(&self, error: &ProtocolError) {
        for l in self.listeners.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            l.error(error);
        }
    }
}
