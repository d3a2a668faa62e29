//! Transport and clock seams consumed by the reader.
//!
//! The parser core never touches a socket directly: it pulls bytes
//! through [`ByteSource`] and reads time through [`Clock`], so the whole
//! request pipeline runs against in-memory fakes in tests.

use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream},
    thread,
    time::{Duration, Instant},
};

/// Byte-level view of one inbound connection.
///
/// A source is polled, not blocked on: [`read_raw`](Self::read_raw)
/// returns `None` when no byte is available *right now*, and the caller
/// (the [`PushbackReader`](crate::PushbackReader)) decides how long to
/// keep polling. End-of-stream is signaled by
/// [`is_connected`](Self::is_connected) turning false.
pub trait ByteSource {
    /// Polls for the next byte. `None` means nothing is buffered yet,
    /// or the peer is gone - callers distinguish the two through
    /// [`is_connected`](Self::is_connected).
    fn read_raw(&mut self) -> Option<u8>;

    /// Whether the peer is still reachable. Once this returns false it
    /// never returns true again for the same connection.
    fn is_connected(&self) -> bool;

    /// Writes the whole buffer to the peer.
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()>;

    /// Tears the connection down. Subsequent reads yield `None` and
    /// [`is_connected`](Self::is_connected) reports false.
    fn close(&mut self);
}

/// Monotonic millisecond clock.
///
/// Injected into the reader instead of calling `Instant::now` inline so
/// timeout behavior is testable with a simulated clock.
pub trait Clock {
    /// Milliseconds elapsed since an arbitrary fixed origin.
    fn now_millis(&self) -> u64;
}

/// [`Clock`] backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    #[inline]
    fn default() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// [`ByteSource`] over a nonblocking [`TcpStream`].
///
/// Reads are one byte at a time, matching the byte-level interface the
/// parser consumes; an empty poll sleeps briefly so the reader's poll
/// loop does not spin a core while waiting on a slow peer.
pub struct TcpByteSource {
    stream: TcpStream,
    connected: bool,
}

// Back-off for an empty poll. Small enough to be invisible next to
// network latency.
const POLL_PAUSE: Duration = Duration::from_millis(1);

impl TcpByteSource {
    /// Wraps an accepted stream, switching it to nonblocking mode.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(TcpByteSource {
            stream,
            connected: true,
        })
    }

    /// Address of the connected peer, if the socket can still report it.
    #[inline]
    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.stream.peer_addr().ok()
    }
}

impl ByteSource for TcpByteSource {
    fn read_raw(&mut self) -> Option<u8> {
        if !self.connected {
            return None;
        }

        let mut byte = [0u8; 1];
        loop {
            match self.stream.read(&mut byte) {
                Ok(0) => {
                    self.connected = false;
                    return None;
                }
                Ok(_) => return Some(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(POLL_PAUSE);
                    return None;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "read failed, dropping connection");
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    #[inline]
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.connected {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "peer disconnected",
            ));
        }

        let mut rest = data;
        while !rest.is_empty() {
            match self.stream.write(rest) {
                Ok(0) => {
                    self.connected = false;
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "connection closed mid-write",
                    ));
                }
                Ok(n) => rest = &rest[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL_PAUSE),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.connected = false;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.connected {
            let _ = self.stream.shutdown(Shutdown::Both);
            self.connected = false;
        }
    }
}
