//! Error kinds (§7), the last-error record (component E), and the
//! protocol error type reported to listeners.

use std::sync::Mutex;

use thiserror::Error;

/// Numeric error kinds. Fatality is fixed per kind (§7's table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `accept()` failed while Listening.
    AcceptFailed,
    /// Header signature mismatch, negative size, or a hard read error
    /// mid-frame.
    ReceiveFailed,
    /// The payload codec rejected the bytes.
    ParseFailed,
    /// The type id was not found in the registry.
    UnknownMessageType,
    /// The payload buffer allocation failed.
    OutOfMemory,
    /// A keep-alive send failed; triggers Closing.
    ConnectionReset,
    /// A non-keep-alive send failed or wrote short.
    SendFailed,
    /// `connect()` failed in the Connecting state.
    ConnectFailed,
    /// `bind()` failed in the Opening state.
    BindFailed,
}

impl ErrorKind {
    /// Whether this kind drives the lifecycle to `Error` (§7).
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::AcceptFailed | ErrorKind::OutOfMemory)
    }
}

/// A single reported error: kind, human-readable description, fatal flag.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ProtocolError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProtocolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

/// Holds the most recent error. Only the worker thread writes to it;
/// application threads may read a snapshot at any time.
#[derive(Debug, Default)]
pub struct ErrorRecord {
    last: Mutex<Option<ProtocolError>>,
}

impl ErrorRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, error: ProtocolError) {
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Snapshot of the last reported error, if any.
    pub fn get(&self) -> Option<ProtocolError> {
        self.last.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
