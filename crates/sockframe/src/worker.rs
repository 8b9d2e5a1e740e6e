//! The dedicated I/O worker thread (component F, behavior half): owns the
//! socket, drives the lifecycle state machine, and is the only thread that
//! ever touches the parser, the listener list, or the error record.

use std::{
    net::{Ipv4Addr, SocketAddrV4, TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crate::{
    endpoint::Shared,
    error::ErrorKind,
    io as frame_io, platform,
    parser::{FrameParser, ParseEvent},
    state::LifecycleState,
    timer::Repeater,
};

/// Which role this worker was spawned to play. Fixed for the worker's whole
/// lifetime — `listen`/`connect` may only be called once, from `Initial`.
pub(crate) enum Mode {
    Connect { addr: String, port: u16 },
    Listen { addr: String, port: u16 },
}

pub(crate) fn run(shared: Arc<Shared>, close_requested: Arc<AtomicBool>, mode: Mode) {
    sockframe_utils::thread_boot(None, sockframe_utils::ThreadPriority::OSDefault);

    let mut state = match &mode {
        Mode::Connect { .. } => LifecycleState::Connecting,
        Mode::Listen { .. } => LifecycleState::Opening,
    };
    set_state(&shared, state);

    let mut stream: Option<TcpStream> = None;
    let mut listener: Option<TcpListener> = None;
    let mut parser = FrameParser::new(shared.config.max_payload_bytes, shared.config.soft_payload_warn_bytes);
    let mut keep_alive = Repeater::every(shared.config.keep_alive_interval);

    loop {
        let mut next = state;

        if close_requested.load(Ordering::Acquire) && state != LifecycleState::Closing && !state.is_terminal() {
            next = LifecycleState::Closing;
        }

        match state {
            LifecycleState::Initial => unreachable!("worker never ticks while Initial"),

            LifecycleState::Connecting => {
                let Mode::Connect { addr, port } = &mode else {
                    unreachable!("Connecting implies Connect mode")
                };
                match try_connect(addr, *port, shared.config.receive_timeout) {
                    Ok(s) => {
                        stream = Some(s);
                        keep_alive.reset();
                        next = LifecycleState::Connected;
                    }
                    Err(e) => {
                        report_error(&shared, ErrorKind::ConnectFailed, format!("connect to {addr}:{port} failed: {e}"));
                        thread::sleep(shared.config.reconnect_backoff);
                    }
                }
            }

            LifecycleState::Opening => {
                let Mode::Listen { addr, port } = &mode else {
                    unreachable!("Opening implies Listen mode")
                };
                match try_bind(addr, *port) {
                    Ok(l) => {
                        listener = Some(l);
                        next = LifecycleState::Listening;
                    }
                    Err(e) => {
                        report_error(&shared, ErrorKind::BindFailed, format!("bind to {addr}:{port} failed: {e}"));
                        thread::sleep(shared.config.reconnect_backoff);
                    }
                }
            }

            LifecycleState::Listening => {
                // std's TcpListener doesn't expose a backlog knob; we accept
                // exactly once and drop the listening socket regardless.
                if let Some(l) = listener.take() {
                    match l.accept() {
                        Ok((s, peer)) => {
                            tracing::debug!(%peer, "accepted connection");
                            if let Err(e) = s.set_read_timeout(Some(shared.config.receive_timeout)) {
                                tracing::warn!(error = %e, "failed to set receive timeout on accepted socket");
                            }
                            platform::configure_no_sigpipe(&s);
                            stream = Some(s);
                            keep_alive.reset();
                            next = LifecycleState::Connected;
                        }
                        Err(e) => {
                            report_error(&shared, ErrorKind::AcceptFailed, format!("accept failed: {e}"));
                            next = LifecycleState::Error;
                        }
                    }
                }
            }

            LifecycleState::Connected => {
                if let Some(s) = stream.as_mut() {
                    tick_connected(s, &shared, &mut parser, &mut keep_alive, &mut next);
                }
            }

            LifecycleState::Closing => {
                stream = None;
                listener = None;
                next = LifecycleState::Closed;
            }

            LifecycleState::Closed | LifecycleState::Error => break,
        }

        if next != state {
            state = next;
            set_state(&shared, state);
        }
        if state.is_terminal() {
            break;
        }
    }

    tracing::debug!(?state, "sockframe worker exiting");
}

/// Drains the send queue, advances the parser by one frame, and — only if
/// neither step raised an error this tick — checks the keep-alive clock,
/// exactly the order §4.F's Connected row specifies.
fn tick_connected(
    stream: &mut TcpStream,
    shared: &Shared,
    parser: &mut FrameParser,
    keep_alive: &mut Repeater,
    next: &mut LifecycleState,
) {
    let mut error_raised = false;

    for msg in shared.send_queue.take_all() {
        if let Err((kind, message)) = frame_io::send_message(stream, msg.as_ref()) {
            report_error(shared, kind, message);
            error_raised = true;
            break;
        }
    }

    match parser.tick(stream, shared.registry.as_ref()) {
        ParseEvent::Idle | ParseEvent::KeepAlive => {}
        ParseEvent::Dispatched(message) => {
            shared.recv_queue.enqueue(message);
            shared.listeners.fire_message_received();
        }
        ParseEvent::NonFatal(e) => {
            report_error(shared, e.kind, e.message);
            error_raised = true;
        }
        ParseEvent::Fatal(e) => {
            report_error(shared, e.kind, e.message);
            *next = LifecycleState::Error;
            return;
        }
        ParseEvent::Disconnected => {
            report_error(shared, ErrorKind::ConnectionReset, "connection closed by peer");
            *next = LifecycleState::Closing;
            return;
        }
    }

    if error_raised {
        return;
    }

    if keep_alive.fired() {
        if let Err(e) = frame_io::send_keep_alive(stream) {
            report_error(shared, ErrorKind::ConnectionReset, format!("keep-alive send failed: {e}"));
            *next = LifecycleState::Closing;
        }
    }
}

fn try_connect(addr: &str, port: u16, receive_timeout: std::time::Duration) -> std::io::Result<TcpStream> {
    let ip: Ipv4Addr = addr
        .parse()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "address is not a dotted IPv4 quad"))?;
    let stream = TcpStream::connect(SocketAddrV4::new(ip, port))?;
    stream.set_read_timeout(Some(receive_timeout))?;
    platform::configure_no_sigpipe(&stream);
    Ok(stream)
}

fn try_bind(addr: &str, port: u16) -> std::io::Result<TcpListener> {
    let ip: Ipv4Addr = addr
        .parse()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "address is not a dotted IPv4 quad"))?;
    TcpListener::bind(SocketAddrV4::new(ip, port))
}

fn set_state(shared: &Shared, new_state: LifecycleState) {
    *shared.state.lock().unwrap_or_else(|e| e.into_inner()) = new_state;
    shared.listeners.fire_state_changed(new_state);
}

fn report_error(shared: &Shared, kind: ErrorKind, message: impl Into<String>) {
    let error = crate::error::ProtocolError::new(kind, message);
    if error.is_fatal() {
        tracing::error!(kind = ?error.kind, message = %error.message, "fatal protocol error");
    } else {
        tracing::warn!(kind = ?error.kind, message = %error.message, "protocol error");
    }
    shared.listeners.fire_error(&error);
    shared.errors.set(error);
}
