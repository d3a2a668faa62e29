//! Response emission.
//!
//! Handlers build responses in two steps: one of the `http_*` methods
//! writes the status line and header block, then [`Connection::print`]
//! and [`Connection::write`] stream the body directly to the peer.
//! Nothing is buffered server-side, so a handler can interleave
//! computation with output.

use crate::{
    io::source::{ByteSource, Clock},
    server::connection::Connection,
    Method,
};
use std::io;

const SERVER_HEADER: &str = concat!("Server: solo_web/", env!("CARGO_PKG_VERSION"), "\r\n");

impl<S: ByteSource, C: Clock> Connection<S, C> {
    /// Writes raw bytes to the peer.
    #[inline]
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.reader.source_mut().write_bytes(data)
    }

    /// Writes a string to the peer.
    #[inline]
    pub fn print(&mut self, text: &str) -> io::Result<()> {
        self.write(text.as_bytes())
    }

    /// Writes a CRLF line ending.
    #[inline]
    pub fn print_crlf(&mut self) -> io::Result<()> {
        self.write(b"\r\n")
    }

    /// Writes a `200 OK` status line and header block.
    ///
    /// `extra_headers`, when given, is spliced in verbatim between the
    /// `Content-Type` header and the terminating blank line; the caller
    /// CRLF-terminates each line it supplies. The body follows via
    /// [`print`](Self::print) or [`write`](Self::write).
    ///
    /// ```no_run
    /// # use solo_web::{Connection, ByteSource, Clock};
    /// # fn handler<S: ByteSource, C: Clock>(conn: &mut Connection<S, C>) -> std::io::Result<()> {
    /// conn.http_success("text/html", None)?;
    /// conn.print("<h1>hello</h1>")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn http_success(&mut self, content_type: &str, extra_headers: Option<&str>) -> io::Result<()> {
        self.print("HTTP/1.0 200 OK\r\n")?;
        if self.emit_server_header {
            self.print(SERVER_HEADER)?;
        }
        self.print("Content-Type: ")?;
        self.print(content_type)?;
        self.print_crlf()?;
        if let Some(extra) = extra_headers {
            self.print(extra)?;
        }
        self.print_crlf()
    }

    /// Writes a complete `400 Bad Request` response, headers and body.
    pub fn http_fail(&mut self) -> io::Result<()> {
        self.print("HTTP/1.0 400 Bad Request\r\n")?;
        if self.emit_server_header {
            self.print(SERVER_HEADER)?;
        }
        self.print("Content-Type: text/html\r\n")?;
        self.print_crlf()?;
        let body = self.fail_body;
        self.print(body)
    }

    /// Writes a complete `303 See Other` redirect to `location`.
    pub fn http_see_other(&mut self, location: &str) -> io::Result<()> {
        self.print("HTTP/1.0 303 See Other\r\n")?;
        if self.emit_server_header {
            self.print(SERVER_HEADER)?;
        }
        self.print("Location: ")?;
        self.print(location)?;
        self.print_crlf()?;
        self.print_crlf()
    }

    /// `robots.txt` built-in: forbids all crawling. HEAD gets the
    /// headers only.
    pub(crate) fn no_robots(&mut self, method: Method) -> io::Result<()> {
        self.http_success("text/plain", None)?;
        if method != Method::Head {
            self.print("User-agent: *\r\nDisallow: /\r\n")?;
        }
        Ok(())
    }
}
