//! The public endpoint API (component H) and the state shared between an
//! `Endpoint` handle and its worker thread.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use crate::{
    config::EndpointConfig,
    error::{ErrorRecord, ProtocolError},
    listener::{Listener, ListenerSet},
    queue::MessageQueue,
    registry::{Message, MessageRegistry},
    state::LifecycleState,
    worker::{self, Mode},
};

/// Everything the worker thread needs, reachable from the `Endpoint` handle
/// without borrowing it. Lives for as long as either side holds a clone of
/// the `Arc`.
pub(crate) struct Shared {
    pub(crate) state: Mutex<LifecycleState>,
    pub(crate) config: EndpointConfig,
    pub(crate) registry: Arc<dyn MessageRegistry>,
    pub(crate) listeners: ListenerSet,
    pub(crate) errors: ErrorRecord,
    pub(crate) send_queue: MessageQueue<Box<dyn Message>>,
    pub(crate) recv_queue: MessageQueue<Box<dyn Message>>,
}

/// One end of a framed socket connection: configure it, add listeners, then
/// call `listen` or `connect` exactly once. All I/O happens on a dedicated
/// worker thread; this handle only ever touches the queues, the listener
/// list (append-only from here), and the state/error snapshots.
pub struct Endpoint {
    shared: Arc<Shared>,
    close_requested: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Endpoint {
    pub fn new(config: EndpointConfig, registry: Arc<dyn MessageRegistry>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LifecycleState::Initial),
                config,
                registry,
                listeners: ListenerSet::new(),
                errors: ErrorRecord::new(),
                send_queue: MessageQueue::new(),
                recv_queue: MessageQueue::new(),
            }),
            close_requested: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// `L` receives every future `state_changed`/`message_received`/`error`
    /// notification. Past notifications are not replayed.
    pub fn add_listener(&self, listener: Box<dyn Listener>) {
        self.shared.listeners.add(listener);
    }

    /// Spawns the worker thread in the connecting role. Must be called from
    /// `Initial`; ignored (logged) otherwise.
    pub fn connect(&self, addr: &str, port: u16) {
        self.spawn(Mode::Connect { addr: addr.to_string(), port });
    }

    /// Spawns the worker thread in the listening role. Must be called from
    /// `Initial`; ignored (logged) otherwise.
    pub fn listen(&self, addr: &str, port: u16) {
        self.spawn(Mode::Listen { addr: addr.to_string(), port });
    }

    fn spawn(&self, mode: Mode) {
        let mut worker_guard = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if worker_guard.is_some() {
            tracing::warn!("listen/connect called with a worker already running; ignored");
            return;
        }
        if *self.shared.state.lock().unwrap_or_else(|e| e.into_inner()) != LifecycleState::Initial {
            tracing::warn!("listen/connect called outside Initial; ignored");
            return;
        }

        self.close_requested.store(false, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let close_requested = Arc::clone(&self.close_requested);
        let handle = thread::Builder::new()
            .name("sockframe-worker".to_string())
            .spawn(move || worker::run(shared, close_requested, mode))
            .expect("failed to spawn sockframe worker thread");
        *worker_guard = Some(handle);
    }

    /// Enqueues `msg` for transmission. Returns immediately regardless of
    /// the current state; if the connection never reaches `Connected` again
    /// the message is silently dropped with the rest of the queue (§9 open
    /// question 5 — see DESIGN.md).
    pub fn send(&self, msg: Box<dyn Message>) {
        self.shared.send_queue.enqueue(msg);
    }

    /// Non-blocking pop of the next fully parsed message, if any.
    pub fn take_received(&self) -> Option<Box<dyn Message>> {
        self.shared.recv_queue.dequeue()
    }

    /// Requests a transition to `Closing`. Idempotent; returns immediately.
    pub fn close(&self) {
        self.close_requested.store(true, Ordering::Release);
    }

    pub fn state(&self) -> LifecycleState {
        *self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn last_error(&self) -> Option<ProtocolError> {
        self.shared.errors.get()
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.close_requested.store(true, Ordering::Release);
        if let Some(handle) = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = handle.join();
        }
    }
}
