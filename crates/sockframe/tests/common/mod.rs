//! Shared test-only registry and listener, in the spirit of the teacher's
//! `TestMsg` helpers — a minimal in-memory registry good enough to drive
//! loopback scenarios, never shipped as part of the public API.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use sockframe::{LifecycleState, Listener, Message, MessageRegistry, ParseError, ProtocolError};

/// Installs a `tracing` subscriber that writes to the test harness's
/// captured stdout, so a failing loopback test shows the worker thread's
/// `warn!`/`error!` lines instead of just the assertion that failed.
/// Idempotent across the many `#[test]` functions in this binary.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("sockframe=debug").try_init();
    });
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TestMsg {
    pub type_id: u32,
    pub payload: Vec<u8>,
}

impl TestMsg {
    pub fn new(type_id: u32, payload: impl Into<Vec<u8>>) -> Self {
        Self { type_id, payload: payload.into() }
    }
}

impl Message for TestMsg {
    fn type_id(&self) -> u32 {
        self.type_id
    }

    fn encoded_length(&self) -> i32 {
        self.payload.len() as i32
    }

    fn serialize(&self) -> Vec<u8> {
        self.payload.clone()
    }

    fn parse(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        self.payload = bytes.to_vec();
        Ok(())
    }
}

/// Registers a fixed set of numeric type ids, all constructed as `TestMsg`.
pub struct TestRegistry {
    types: Vec<u32>,
}

impl TestRegistry {
    pub fn new(types: impl IntoIterator<Item = u32>) -> Self {
        Self { types: types.into_iter().collect() }
    }
}

impl MessageRegistry for TestRegistry {
    fn has_type(&self, id: u32) -> bool {
        self.types.contains(&id)
    }

    fn create(&self, id: u32) -> Option<Box<dyn Message>> {
        self.has_type(id).then(|| Box::new(TestMsg::new(id, Vec::new())) as Box<dyn Message>)
    }
}

/// Records every notification it receives so tests can assert on ordering
/// and counts after the fact.
#[derive(Default)]
pub struct RecordingListener {
    pub states: Mutex<Vec<LifecycleState>>,
    pub errors: Mutex<Vec<ProtocolError>>,
    pub message_count: AtomicUsize,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states_snapshot(&self) -> Vec<LifecycleState> {
        self.states.lock().unwrap().clone()
    }

    pub fn errors_snapshot(&self) -> Vec<ProtocolError> {
        self.errors.lock().unwrap().clone()
    }

    pub fn message_count(&self) -> usize {
        self.message_count.load(Ordering::Acquire)
    }
}

impl Listener for RecordingListener {
    fn state_changed(&self, new_state: LifecycleState) {
        self.states.lock().unwrap().push(new_state);
    }

    fn message_received(&self) {
        self.message_count.fetch_add(1, Ordering::AcqRel);
    }

    fn error(&self, error: &ProtocolError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}

/// Lets a shared `Arc<RecordingListener>` be registered directly with an
/// endpoint while the test keeps its own handle to read back results.
impl Listener for Arc<RecordingListener> {
    fn state_changed(&self, new_state: LifecycleState) {
        (**self).state_changed(new_state);
    }

    fn message_received(&self) {
        (**self).message_received();
    }

    fn error(&self, error: &ProtocolError) {
        (**self).error(error);
    }
}

/// Polls `f` until it returns `Some`, or panics after `timeout`.
pub fn wait_for<T>(timeout: std::time::Duration, mut f: impl FnMut() -> Option<T>) -> T {
    let start = std::time::Instant::now();
    loop {
        if let Some(v) = f() {
            return v;
        }
        if start.elapsed() > timeout {
            panic!("timed out waiting for condition");
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// An ephemeral 127.0.0.1 port, picked by binding and immediately dropping.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
