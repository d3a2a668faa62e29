//! Pushback-capable, timeout-bounded byte reader.
//!
//! Everything above this layer parses by *probing*: try to consume a
//! literal token, and if the stream turns out to hold something else,
//! un-read every byte so the next probe starts from the same position.
//! The pushback stack is what makes that cheap.

use crate::io::source::{ByteSource, Clock};
use std::time::Duration;

/// Capacity of the pushback stack.
///
/// Must exceed the longest token ever probed with
/// [`expect`](PushbackReader::expect), or a failed probe cannot restore
/// the stream. The longest token this crate probes is
/// `"Upgrade: WebSocket"` (18 bytes); external callers probing longer
/// tokens than this capacity get the documented lossy clamp instead of
/// corruption.
pub const PUSHBACK_CAPACITY: usize = 32;

/// Blocking byte reader over a polled [`ByteSource`].
///
/// Combines four concerns that every parser layer above it relies on:
///
/// - a LIFO pushback stack, drained before the source is touched;
/// - timeout-bounded reads: a fresh read polls the source until a byte
///   arrives, the peer disconnects, or the deadline passes - on timeout
///   the connection is torn down and every later read yields `None`;
/// - a content-length budget: once [`begin_body`](Self::begin_body) is
///   called, reads stop at the budget even if the peer keeps the socket
///   open expecting keep-alive;
/// - speculative token matching ([`expect`](Self::expect)) and integer
///   scanning ([`read_int`](Self::read_int)) built on the above.
pub struct PushbackReader<S: ByteSource, C: Clock> {
    source: S,
    clock: C,

    pushback: [u8; PUSHBACK_CAPACITY],
    depth: usize,

    timeout_ms: u64,
    content_length: i32,
    reading_content: bool,
}

impl<S: ByteSource, C: Clock> PushbackReader<S, C> {
    pub fn new(source: S, clock: C, read_timeout: Duration) -> Self {
        PushbackReader {
            source,
            clock,
            pushback: [0; PUSHBACK_CAPACITY],
            depth: 0,
            timeout_ms: read_timeout.as_millis() as u64,
            content_length: 0,
            reading_content: false,
        }
    }

    /// Returns the next byte, or `None` at end-of-stream.
    ///
    /// Pushed-back bytes are returned first, newest first, without
    /// touching the source or the content-length budget. A fresh read
    /// polls the source until a byte arrives or the read times out;
    /// timing out closes the underlying connection.
    pub fn read(&mut self) -> Option<u8> {
        if self.depth > 0 {
            self.depth -= 1;
            return Some(self.pushback[self.depth]);
        }

        let deadline = self.clock.now_millis().saturating_add(self.timeout_ms);
        while self.source.is_connected() {
            // Stop at the content-length budget: clients assuming
            // keep-alive leave the socket open after the body, and
            // waiting on them would stall until the timeout.
            if self.reading_content && self.content_length <= 0 {
                return None;
            }

            match self.source.read_raw() {
                Some(ch) => {
                    if self.reading_content {
                        self.content_length -= 1;
                    }
                    return Some(ch);
                }
                None => {
                    if self.clock.now_millis() > deadline {
                        tracing::debug!("read timed out, tearing connection down");
                        self.source.close();
                        return None;
                    }
                }
            }
        }

        None
    }

    /// Returns a byte to the front of the stream.
    ///
    /// Bytes are re-read in reverse push order. Once the depth has
    /// saturated at capacity − 1, further pushed bytes are discarded:
    /// they land in the one slot the saturated depth never exposes to
    /// [`read`](Self::read). Lossy, not a crash; see
    /// [`PUSHBACK_CAPACITY`].
    pub fn push(&mut self, ch: u8) {
        self.pushback[self.depth] = ch;
        if self.depth < PUSHBACK_CAPACITY - 1 {
            self.depth += 1;
        }
    }

    /// Tries to consume `token` from the stream.
    ///
    /// On a full match the stream has advanced past the token. On the
    /// first mismatch the non-matching byte and every matched byte are
    /// pushed back in reverse order, restoring the exact original
    /// position, so callers can probe alternatives:
    ///
    /// ```
    /// # use solo_web::{PushbackReader, SystemClock};
    /// # use std::time::Duration;
    /// # let source = solo_web::testing::SliceSource::open("HEAD /x");
    /// let mut reader = PushbackReader::new(source, SystemClock::default(),
    ///     Duration::from_secs(1));
    /// assert!(!reader.expect(b"GET "));
    /// assert!(reader.expect(b"HEAD ")); // sees the same bytes again
    /// ```
    pub fn expect(&mut self, token: &[u8]) -> bool {
        for (matched, &want) in token.iter().enumerate() {
            let got = self.read();
            if got != Some(want) {
                if let Some(ch) = got {
                    self.push(ch);
                }
                for &ch in token[..matched].iter().rev() {
                    self.push(ch);
                }
                return false;
            }
        }
        true
    }

    /// Scans a decimal integer: optional space/tab padding, optional
    /// leading minus, then digits. The first non-digit is pushed back.
    ///
    /// Returns `None` when no digit was consumed - the absence of a
    /// number, which callers must not confuse with a literal zero.
    /// Accumulation wraps on very large inputs; there is no overflow
    /// protection.
    pub fn read_int(&mut self) -> Option<i32> {
        let mut ch = self.read();
        while ch == Some(b' ') || ch == Some(b'\t') {
            ch = self.read();
        }

        let mut negate = false;
        if ch == Some(b'-') {
            negate = true;
            ch = self.read();
        }

        let mut number: i32 = 0;
        let mut got_number = false;
        while let Some(digit) = ch.filter(u8::is_ascii_digit) {
            got_number = true;
            number = number.wrapping_mul(10).wrapping_add((digit - b'0') as i32);
            ch = self.read();
        }

        if let Some(ch) = ch {
            self.push(ch);
        }

        match got_number {
            true if negate => Some(number.wrapping_neg()),
            true => Some(number),
            false => None,
        }
    }

    /// Remaining content-length budget.
    #[inline]
    pub fn content_length(&self) -> i32 {
        self.content_length
    }

    #[inline]
    pub(crate) fn set_content_length(&mut self, length: i32) {
        self.content_length = length;
    }

    /// Switches to body-consumption mode: from now on every byte read
    /// counts against the content-length budget, and reads past it
    /// report end-of-stream.
    #[inline]
    pub(crate) fn begin_body(&mut self) {
        self.reading_content = true;
    }

    #[inline]
    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    #[inline]
    pub(crate) fn close(&mut self) {
        self.source.close();
    }
}
