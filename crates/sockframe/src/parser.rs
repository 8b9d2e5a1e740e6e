//! The wire message parser state machine (component A) — the hard part:
//! a resumable, tagged-variant parser that survives `WouldBlock` between
//! ticks without corrupting its place in the frame.

use std::net::TcpStream;

use crate::{
    error::{ErrorKind, ProtocolError},
    frame::{HEADER_WORD, header_matches_signature},
    io::{FillOutcome, fill},
    registry::{Message, MessageRegistry},
};

/// The parser's in-flight record for a frame being incrementally received.
///
/// Exactly one variant is live at a time; `bytes-received <= size` is
/// maintained by construction (`payload` is exactly `size` bytes and
/// `received` only grows up to `payload.len()`), `size` is frozen the
/// instant it leaves `Size`, and the payload buffer is allocated exactly
/// once, on leaving `Type`.
enum ParseState {
    Header { buf: [u8; 4], have: usize },
    Size { buf: [u8; 4], have: usize },
    Type { size: i32, buf: [u8; 4], have: usize },
    /// `valid = false` means a Type-phase hard read error happened after
    /// `size` was already known: the frame is still drained byte-for-byte
    /// to stay aligned with the next frame, but it is discarded instead of
    /// dispatched (§4.A Type row, "short read marks the message invalid
    /// but consumes through Data").
    Data { size: i32, type_id: u32, payload: Vec<u8>, received: usize, valid: bool },
}

impl Default for ParseState {
    fn default() -> Self {
        ParseState::Header { buf: [0; 4], have: 0 }
    }
}

/// What happened on one call to [`FrameParser::tick`].
pub enum ParseEvent {
    /// Nothing to report — either `WouldBlock` with no bytes read, or a
    /// frame is still in flight (state was preserved).
    Idle,
    /// A keep-alive word was consumed at a frame boundary.
    KeepAlive,
    /// A complete, valid, registered message was parsed.
    Dispatched(Box<dyn Message>),
    /// A non-fatal error: the current frame was discarded, the connection
    /// stays Connected.
    NonFatal(ProtocolError),
    /// A fatal error: the in-flight frame is cleared and the endpoint must
    /// move to `Error`.
    Fatal(ProtocolError),
    /// The peer closed the connection (a read returned zero bytes).
    Disconnected,
}

pub struct FrameParser {
    state: ParseState,
    max_payload_bytes: u32,
    soft_payload_warn_bytes: u32,
}

impl FrameParser {
    pub fn new(max_payload_bytes: u32, soft_payload_warn_bytes: u32) -> Self {
        Self { state: ParseState::default(), max_payload_bytes, soft_payload_warn_bytes }
    }

    /// One pass through the state machine for (at most) one frame. Loops
    /// internally across states while data keeps arriving, per §4.A.
    pub fn tick(&mut self, stream: &mut TcpStream, registry: &dyn MessageRegistry) -> ParseEvent {
        loop {
            match &mut self.state {
                ParseState::Header { mut buf, mut have } => {
                    match fill(stream, &mut buf, &mut have) {
                        FillOutcome::Complete => {
                            let word = u32::from_be_bytes(buf);
                            if word == 0 {
                                // Keep-alive only legal at a frame boundary (`have` was 0
                                // when this read started) — `Header` only ever starts a
                                // new frame, so this is always a boundary.
                                self.state = ParseState::default();
                                return ParseEvent::KeepAlive;
                            }
                            if !header_matches_signature(word) {
                                self.state = ParseState::default();
                                return ParseEvent::NonFatal(ProtocolError::new(
                                    ErrorKind::ReceiveFailed,
                                    "Header mismatch",
                                ));
                            }
                            debug_assert_eq!(word & 0xFFFF_0000, HEADER_WORD & 0xFFFF_0000);
                            self.state = ParseState::Size { buf: [0; 4], have: 0 };
                        }
                        FillOutcome::Pending => {
                            self.state = ParseState::Header { buf, have };
                            return ParseEvent::Idle;
                        }
                        FillOutcome::Disconnected => return ParseEvent::Disconnected,
                        FillOutcome::HardError(_) => {
                            self.state = ParseState::default();
                            return ParseEvent::NonFatal(ProtocolError::new(
                                ErrorKind::ReceiveFailed,
                                "hard read error reading header",
                            ));
                        }
                    }
                }

                ParseState::Size { mut buf, mut have } => match fill(stream, &mut buf, &mut have) {
                    FillOutcome::Complete => {
                        let size = i32::from_be_bytes(buf);
                        if size < 0 {
                            self.state = ParseState::default();
                            return ParseEvent::NonFatal(ProtocolError::new(
                                ErrorKind::ReceiveFailed,
                                "Size invalid",
                            ));
                        }
                        self.state = ParseState::Type { size, buf: [0; 4], have: 0 };
                    }
                    FillOutcome::Pending => {
                        self.state = ParseState::Size { buf, have };
                        return ParseEvent::Idle;
                    }
                    FillOutcome::Disconnected => return ParseEvent::Disconnected,
                    FillOutcome::HardError(_) => {
                        self.state = ParseState::default();
                        return ParseEvent::NonFatal(ProtocolError::new(
                            ErrorKind::ReceiveFailed,
                            "Size invalid",
                        ));
                    }
                },

                ParseState::Type { size, mut buf, mut have } => {
                    let size = *size;
                    match fill(stream, &mut buf, &mut have) {
                        FillOutcome::Complete => {
                            let type_id = u32::from_be_bytes(buf);
                            match self.allocate_payload(size) {
                                Ok(payload) => {
                                    self.state =
                                        ParseState::Data { size, type_id, payload, received: 0, valid: true };
                                }
                                Err(AllocDecision::Oversized) => {
                                    self.state = ParseState::default();
                                    return ParseEvent::NonFatal(ProtocolError::new(
                                        ErrorKind::ReceiveFailed,
                                        format!("payload of {size} bytes exceeds the maximum"),
                                    ));
                                }
                                Err(AllocDecision::OutOfMemory) => {
                                    self.state = ParseState::default();
                                    return ParseEvent::Fatal(ProtocolError::new(
                                        ErrorKind::OutOfMemory,
                                        "payload buffer allocation failed",
                                    ));
                                }
                            }
                        }
                        FillOutcome::Pending => {
                            self.state = ParseState::Type { size, buf, have };
                            return ParseEvent::Idle;
                        }
                        FillOutcome::Disconnected => return ParseEvent::Disconnected,
                        FillOutcome::HardError(_) => {
                            // size is already known; stay frame-aligned by draining
                            // `size` bytes of payload, but never dispatch them.
                            self.state = ParseState::Data {
                                size,
                                type_id: 0,
                                payload: vec![0u8; size.max(0) as usize],
                                received: 0,
                                valid: false,
                            };
                        }
                    }
                }

                ParseState::Data { size, type_id, payload, received, valid } => {
                    let size = *size;
                    let type_id = *type_id;
                    let valid = *valid;
                    match fill(stream, payload, received) {
                        FillOutcome::Complete => {
                            debug_assert_eq!(*received, size.max(0) as usize);
                            let payload = std::mem::take(payload);
                            self.state = ParseState::default();
                            if !valid {
                                return ParseEvent::Idle;
                            }
                            return self.dispatch(type_id, payload, registry);
                        }
                        FillOutcome::Pending => return ParseEvent::Idle,
                        FillOutcome::Disconnected => return ParseEvent::Disconnected,
                        FillOutcome::HardError(_) => {
                            self.state = ParseState::default();
                            return ParseEvent::NonFatal(ProtocolError::new(
                                ErrorKind::ReceiveFailed,
                                "hard read error reading payload",
                            ));
                        }
                    }
                }
            }
        }
    }

    fn allocate_payload(&self, size: i32) -> Result<Vec<u8>, AllocDecision> {
        let size = size.max(0) as u32;
        if size > self.max_payload_bytes {
            return Err(AllocDecision::Oversized);
        }
        if size > self.soft_payload_warn_bytes {
            tracing::warn!(size, "payload exceeds the soft warning threshold");
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(size as usize).map_err(|_| AllocDecision::OutOfMemory)?;
        buf.resize(size as usize, 0);
        Ok(buf)
    }

    fn dispatch(&self, type_id: u32, payload: Vec<u8>, registry: &dyn MessageRegistry) -> ParseEvent {
        if !registry.has_type(type_id) {
            return ParseEvent::NonFatal(ProtocolError::new(
                ErrorKind::UnknownMessageType,
                format!("unregistered message type {type_id}"),
            ));
        }
        let Some(mut message) = registry.create(type_id) else {
            return ParseEvent::NonFatal(ProtocolError::new(
                ErrorKind::UnknownMessageType,
                format!("unregistered message type {type_id}"),
            ));
        };
        match message.parse(&payload) {
            Ok(()) => ParseEvent::Dispatched(message),
            Err(e) => ParseEvent::NonFatal(ProtocolError::new(ErrorKind::ParseFailed, e.to_string())),
        }
    }
}

enum AllocDecision {
    Oversized,
    OutOfMemory,
}
