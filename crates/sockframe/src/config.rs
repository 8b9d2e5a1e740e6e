//! Endpoint configuration (component K / data model §3). Immutable once
//! the worker thread has started.

use std::time::Duration;

use crate::frame::{MAX_PAYLOAD_BYTES, SOFT_PAYLOAD_WARN_BYTES};

/// Tunables the spec fixes as constants but which a real embedder usually
/// wants to override for tests (shorter timeouts) or tuning (larger
/// payload caps). Defaults match the spec's fixed values exactly.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Socket receive timeout once Connected; gives the tick loop its
    /// cooperative cadence. Spec default: 250ms.
    pub receive_timeout: Duration,
    /// Minimum interval between keep-alive sends. Spec default: 500ms.
    pub keep_alive_interval: Duration,
    /// Retry interval for failed `connect`/`bind` attempts (resolves Open
    /// Questions 1 & 2 — see DESIGN.md).
    pub reconnect_backoff: Duration,
    /// Hard payload size cap, in bytes.
    pub max_payload_bytes: u32,
    /// Soft payload size warning threshold, in bytes.
    pub soft_payload_warn_bytes: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_millis(250),
            keep_alive_interval: Duration::from_millis(500),
            reconnect_backoff: Duration::from_secs(1),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            soft_payload_warn_bytes: SOFT_PAYLOAD_WARN_BYTES,
        }
    }
}

impl EndpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_receive_timeout(mut self, d: Duration) -> Self {
        self.receive_timeout = d;
        self
    }

    pub fn with_keep_alive_interval(mut self, d: Duration) -> Self {
        self.keep_alive_interval = d;
        self
    }

    pub fn with_reconnect_backoff(mut self, d: Duration) -> Self {
        self.reconnect_backoff = d;
        self
    }

    pub fn with_max_payload_bytes(mut self, n: u32) -> Self {
        self.max_payload_bytes = n;
        self
    }
}
