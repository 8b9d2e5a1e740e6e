//! Platform socket details that have no portable std equivalent: disabling
//! `SIGPIPE` delivery on write to a peer that has reset the connection.
//!
//! Grounded in the same raw-fd + `libc::setsockopt` pattern the teacher
//! uses for `SO_SNDBUF`/`SO_RCVBUF` tuning.

use std::{io, net::TcpStream};

#[cfg(target_os = "linux")]
pub fn write_no_sigpipe(stream: &mut TcpStream, buf: &[u8]) -> io::Result<usize> {
    use std::os::unix::io::AsRawFd;
    let fd = stream.as_raw_fd();
    let n = unsafe {
        libc::send(fd, buf.as_ptr().cast::<libc::c_void>(), buf.len(), libc::MSG_NOSIGNAL)
    };
    if n < 0 { Err(io::Error::last_os_error()) } else { Ok(n as usize) }
}

#[cfg(not(target_os = "linux"))]
pub fn write_no_sigpipe(stream: &mut TcpStream, buf: &[u8]) -> io::Result<usize> {
    use std::io::Write;
    stream.write(buf)
}

/// One-time best-effort opt-out of `SIGPIPE` delivery for this socket.
/// `MSG_NOSIGNAL` (used on every `write_no_sigpipe` call on Linux) already
/// covers the common case; this additionally arms `SO_NOSIGPIPE` on
/// platforms whose `send` doesn't support a per-call flag.
#[cfg(target_os = "macos")]
pub fn configure_no_sigpipe(stream: &TcpStream) {
    use std::{mem::size_of, os::unix::io::AsRawFd};
    let fd = stream.as_raw_fd();
    let one: libc::c_int = 1;
    unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_NOSIGPIPE,
            (&raw const one).cast::<libc::c_void>(),
            size_of::<libc::c_int>() as libc::socklen_t,
        );
    }
}

#[cfg(not(target_os = "macos"))]
pub fn configure_no_sigpipe(_stream: &TcpStream) {}
