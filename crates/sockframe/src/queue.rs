//! Thread-safe FIFO queues for outgoing/incoming messages (component C).
//!
//! Each queue owns its own mutex, held only across push/pop and never
//! across I/O — deliberately simple, and deliberately not combined under
//! one lock so sends never serialize against receives.

use std::{collections::VecDeque, sync::Mutex};

pub struct MessageQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self { inner: Mutex::new(VecDeque::new()) }
    }
}

impl<T> MessageQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ownership transfers from caller to queue.
    pub fn enqueue(&self, item: T) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).push_back(item);
    }

    /// Drains every pending item into a local sequence in a single critical
    /// section, so the caller can hand them off (e.g. transmit) without
    /// holding the lock.
    pub fn take_all(&self) -> VecDeque<T> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    /// Non-blocking pop of a single item, if any.
    pub fn dequeue(&self) -> Option<T> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
    }
}
