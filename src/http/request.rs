//! Request-line and header scanning.
//!
//! The wire subset is deliberately small: `METHOD SP PATH SP ...CRLF`
//! for GET/HEAD/POST, then header lines scanned only for
//! `Content-Length:` and the `Upgrade: WebSocket` marker, terminated by
//! a blank line. Everything else in the header block is skipped one
//! byte at a time, which keeps the scanner ignorant of header syntax in
//! general while still guaranteeing forward progress.

use crate::{
    io::source::{ByteSource, Clock},
    limits::ServerLimits,
    server::connection::Connection,
};

/// Kind of request received, passed to every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// The request line did not start with a recognized method.
    Invalid,
    Get,
    Head,
    Post,
}

/// Parsed request line: method plus the path token, stored in a
/// bounded buffer.
///
/// The buffer's final byte is reserved for a terminator and never holds
/// path data. When the wire path is longer than the buffer, the stored
/// path is silently truncated while the stream is still drained to the
/// end of the token; truncation is visible through
/// [`tail_complete`](Self::tail_complete).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: Box<[u8]>,
    pub(crate) len: usize,
    pub(crate) remaining: isize,
    pub(crate) seen_input: bool,
}

impl Request {
    pub(crate) fn new(limits: &ServerLimits) -> Self {
        Request {
            method: Method::Invalid,
            path: vec![0; limits.request_buffer].into_boxed_slice(),
            len: 0,
            remaining: limits.request_buffer as isize,
            seen_input: false,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.method = Method::Invalid;
        self.path.fill(0);
        self.len = 0;
        self.remaining = self.path.len() as isize;
        self.seen_input = false;
    }
}

// Public API
impl Request {
    #[inline]
    pub fn method(&self) -> Method {
        self.method
    }

    /// The stored path bytes, possibly truncated.
    #[inline]
    pub fn path(&self) -> &[u8] {
        &self.path[..self.len]
    }

    /// The stored path as UTF-8, or `None` for non-UTF-8 bytes.
    #[inline]
    pub fn path_str(&self) -> Option<&str> {
        simdutf8::basic::from_utf8(self.path()).ok()
    }

    /// False when the wire path was longer than the buffer and had to
    /// be truncated.
    #[inline]
    pub fn tail_complete(&self) -> bool {
        self.remaining >= 0
    }
}

impl<S: ByteSource, C: Clock> Connection<S, C> {
    /// Reads and parses the first line of the request.
    ///
    /// The method is fixed by probing `GET `, `HEAD `, `POST ` in
    /// order; if none match the method is [`Method::Invalid`] and the
    /// line is still consumed so the stream stays synchronized. Path
    /// bytes are copied until a space, CR, or LF; once the buffer's
    /// data capacity is exhausted, consumption continues but copying
    /// stops and the remaining-capacity counter goes negative. The
    /// HTTP version token, if the client sent one, is left in the
    /// stream for the header scanner to discard.
    pub(crate) fn read_request(&mut self, request: &mut Request) {
        request.reset();
        // Reserve the terminator byte.
        request.remaining -= 1;

        // Distinguish "a request line arrived, however malformed" from
        // "the peer never sent a byte": only the latter skips routing.
        match self.reader.read() {
            Some(ch) => {
                request.seen_input = true;
                self.reader.push(ch);
            }
            None => return,
        }

        request.method = if self.reader.expect(b"GET ") {
            Method::Get
        } else if self.reader.expect(b"HEAD ") {
            Method::Head
        } else if self.reader.expect(b"POST ") {
            Method::Post
        } else {
            Method::Invalid
        };

        while let Some(ch) = self.reader.read() {
            if ch == b' ' || ch == b'\r' || ch == b'\n' {
                break;
            }
            if request.remaining > 0 {
                request.path[request.len] = ch;
                request.len += 1;
            }
            request.remaining -= 1;
        }
    }

    /// Scans the header block for the tokens the server cares about:
    /// `Content-Length:` (parsed into the reader's body budget) and the
    /// `Upgrade: WebSocket` marker (recorded as a flag). Unrecognized
    /// bytes are consumed one at a time until the blank line ends the
    /// block and body-consumption mode begins.
    ///
    /// Returns false when the stream ended before the blank line; the
    /// headers are then complete by necessity, not success, and the
    /// caller decides how to treat the incomplete request.
    pub(crate) fn process_headers(&mut self) -> bool {
        loop {
            if self.reader.expect(b"Content-Length:") {
                let length = self.reader.read_int().unwrap_or(0);
                self.reader.set_content_length(length);
                continue;
            }

            if self.reader.expect(b"Upgrade: WebSocket") {
                self.upgrade_requested = true;
                continue;
            }

            if self.reader.expect(b"\r\n\r\n") {
                self.reader.begin_body();
                return true;
            }

            // No probe hit: absorb one byte and retry.
            if self.reader.read().is_none() {
                return false;
            }
        }
    }
}
