//! Per-connection state handed to commands.

use crate::{
    io::{
        reader::PushbackReader,
        source::{ByteSource, Clock},
    },
    limits::ServerLimits,
};

/// One accepted connection: the reader on the inbound side, the
/// response writer on the outbound side, and the flags the header scan
/// left behind.
///
/// Commands receive `&mut Connection` and use it both ways - reading a
/// POST body with [`read_post_param`](Self::read_post_param) and
/// writing the response with the `http_*` methods from the response
/// module.
pub struct Connection<S: ByteSource, C: Clock> {
    pub(crate) reader: PushbackReader<S, C>,
    pub(crate) upgrade_requested: bool,
    pub(crate) emit_server_header: bool,
    pub(crate) fail_body: &'static str,
}

impl<S: ByteSource, C: Clock> Connection<S, C> {
    pub(crate) fn new(source: S, clock: C, limits: &ServerLimits) -> Self {
        Connection {
            reader: PushbackReader::new(source, clock, limits.read_timeout),
            upgrade_requested: false,
            emit_server_header: limits.server_header,
            fail_body: limits.fail_body,
        }
    }

    /// Reads the next byte; in a POST command this walks the body.
    /// See [`PushbackReader::read`].
    #[inline]
    pub fn read(&mut self) -> Option<u8> {
        self.reader.read()
    }

    /// Returns a byte to the front of the stream.
    #[inline]
    pub fn push(&mut self, ch: u8) {
        self.reader.push(ch);
    }

    /// Probes for a literal token. See [`PushbackReader::expect`].
    #[inline]
    pub fn expect(&mut self, token: &[u8]) -> bool {
        self.reader.expect(token)
    }

    /// Scans a decimal integer. See [`PushbackReader::read_int`].
    #[inline]
    pub fn read_int(&mut self) -> Option<i32> {
        self.reader.read_int()
    }

    /// Decodes the next URL-encoded pair from the POST body.
    /// See [`PushbackReader::read_post_param`].
    #[inline]
    pub fn read_post_param(&mut self, name: &mut [u8], value: &mut [u8]) -> bool {
        self.reader.read_post_param(name, value)
    }

    /// Remaining content-length budget for the body.
    #[inline]
    pub fn content_length(&self) -> i32 {
        self.reader.content_length()
    }

    /// Whether the request carried an `Upgrade: WebSocket` header.
    #[inline]
    pub fn upgrade_requested(&self) -> bool {
        self.upgrade_requested
    }

    pub(crate) fn close(&mut self) {
        self.reader.close();
    }
}
