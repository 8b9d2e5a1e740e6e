//! Frame I/O (component G): reading/writing the header, size, type and
//! payload words, and the keep-alive send.

use std::{
    io::{self, Read},
    net::TcpStream,
};

use crate::{error::ErrorKind, platform, registry::Message};

/// Treats a read-timeout the same as a non-blocking `WouldBlock`: the
/// socket has a receive timeout set (§5) specifically so `recv` returns
/// here instead of blocking forever.
pub(crate) fn is_would_block(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Outcome of attempting to fill a fixed-size scratch buffer from the
/// stream, possibly across several calls.
pub(crate) enum FillOutcome {
    Complete,
    Pending,
    Disconnected,
    HardError(io::Error),
}

/// Reads into `buf[*have..]`, looping while bytes keep arriving, exactly as
/// §4.A allows ("partial-data phase may read multiple times in one tick as
/// long as bytes keep arriving").
pub(crate) fn fill(stream: &mut TcpStream, buf: &mut [u8], have: &mut usize) -> FillOutcome {
    while *have < buf.len() {
        match stream.read(&mut buf[*have..]) {
            Ok(0) => return FillOutcome::Disconnected,
            Ok(n) => *have += n,
            Err(e) if is_would_block(&e) => return FillOutcome::Pending,
            Err(e) => return FillOutcome::HardError(e),
        }
    }
    FillOutcome::Complete
}

/// Sends a complete frame: header, size, type, payload. Big-endian
/// throughout. Loops through short writes instead of silently tolerating
/// them (resolves Open Question 3 — see DESIGN.md).
pub fn send_message(stream: &mut TcpStream, msg: &dyn Message) -> Result<(), (ErrorKind, String)> {
    let payload = msg.serialize();
    let len = payload.len() as i32;

    let mut frame = Vec::with_capacity(12 + payload.len());
    frame.extend_from_slice(&crate::frame::HEADER_WORD.to_be_bytes());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&msg.type_id().to_be_bytes());
    frame.extend_from_slice(&payload);

    write_all_no_sigpipe(stream, &frame)
        .map_err(|e| (ErrorKind::SendFailed, format!("send failed: {e}")))
}

/// Sends the 4-byte zero keep-alive word.
pub fn send_keep_alive(stream: &mut TcpStream) -> io::Result<()> {
    write_all_no_sigpipe_raw(stream, &crate::frame::KEEP_ALIVE_WORD)
}

fn write_all_no_sigpipe(stream: &mut TcpStream, buf: &[u8]) -> io::Result<()> {
    write_all_no_sigpipe_raw(stream, buf)
}

fn write_all_no_sigpipe_raw(stream: &mut TcpStream, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match platform::write_no_sigpipe(stream, buf) {
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "failed to write whole frame"));
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
