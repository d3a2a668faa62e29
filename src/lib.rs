//! # solo_web
//!
//! A deliberately small, synchronous HTTP/1.0 server: one connection at
//! a time, bounded buffers, no per-request allocation on the hot path.
//! Commands are registered against path verbs and receive the
//! connection directly, reading URL-encoded parameters from the query
//! string or POST body and streaming their response straight back.
//!
//! The wire subset is GET/HEAD/POST request lines, `Content-Length` and
//! the `Upgrade: WebSocket` marker from the headers, and a blank line
//! before the body. Everything else in the header block is skipped.
//!
//! # Examples
//!
//! ```no_run
//! use solo_web::{limits::ServerLimits, Connection, Server, SystemClock, TcpServer};
//!
//! fn main() -> std::io::Result<()> {
//!     let mut server: TcpServer = Server::new("", ServerLimits::default(),
//!         SystemClock::default());
//!
//!     server.set_default_command(|conn: &mut Connection<_, _>, _: solo_web::Method, _: &[u8], _: bool| {
//!         let _ = conn.http_success("text/html", None);
//!         let _ = conn.print("<h1>hello</h1>");
//!     });
//!
//!     let listener = TcpServer::bind("0.0.0.0:8080".parse().unwrap())?;
//!     server.run(&listener)
//! }
//! ```

pub(crate) mod http {
    pub(crate) mod params;
    pub(crate) mod request;
    pub(crate) mod response;
}

pub(crate) mod io {
    pub(crate) mod reader;
    pub(crate) mod source;
}

pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod router;
    pub(crate) mod server_impl;
}

pub mod limits;

pub use http::{
    params::{UrlParamResult, UrlParams},
    request::{Method, Request},
};
pub use io::{
    reader::{PushbackReader, PUSHBACK_CAPACITY},
    source::{ByteSource, Clock, SystemClock, TcpByteSource},
};
pub use server::{
    connection::Connection,
    router::Command,
    server_impl::{Server, TcpServer},
};

/// In-memory [`ByteSource`] and [`Clock`] implementations for driving
/// the pipeline without sockets. Public because doctests use them; not
/// part of the server API proper.
pub mod testing {
    use crate::io::source::{ByteSource, Clock};
    use std::{
        cell::{Cell, RefCell},
        io,
        rc::Rc,
    };

    /// [`ByteSource`] over a fixed byte slice, capturing writes.
    ///
    /// The peer "disconnects" when the data runs out, unless the source
    /// was created with [`stalled`](Self::stalled), which simulates a
    /// connected peer that never sends.
    pub struct SliceSource {
        data: Vec<u8>,
        pos: usize,
        connected: bool,
        hold_open: bool,
        written: Rc<RefCell<Vec<u8>>>,
    }

    impl SliceSource {
        pub fn open(data: impl AsRef<[u8]>) -> Self {
            SliceSource {
                data: data.as_ref().to_vec(),
                pos: 0,
                connected: true,
                hold_open: false,
                written: Rc::new(RefCell::new(Vec::new())),
            }
        }

        /// A peer that stays connected but never sends a byte.
        pub fn stalled() -> Self {
            SliceSource {
                hold_open: true,
                ..SliceSource::open("")
            }
        }

        /// Handle to everything written to this source, shared so it
        /// survives the source being consumed by the server.
        pub fn written_handle(&self) -> Rc<RefCell<Vec<u8>>> {
            Rc::clone(&self.written)
        }
    }

    impl ByteSource for SliceSource {
        fn read_raw(&mut self) -> Option<u8> {
            if !self.connected {
                return None;
            }
            match self.data.get(self.pos) {
                Some(&ch) => {
                    self.pos += 1;
                    Some(ch)
                }
                None => {
                    if !self.hold_open {
                        self.connected = false;
                    }
                    None
                }
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
            self.written.borrow_mut().extend_from_slice(data);
            Ok(())
        }

        fn close(&mut self) {
            self.connected = false;
        }
    }

    /// [`Clock`] that advances by a fixed step every time it is read,
    /// so timeout deadlines pass deterministically.
    #[derive(Clone)]
    pub struct TickClock {
        now: Cell<u64>,
        step: u64,
    }

    impl TickClock {
        pub fn new(step: u64) -> Self {
            TickClock {
                now: Cell::new(0),
                step,
            }
        }
    }

    impl Clock for TickClock {
        fn now_millis(&self) -> u64 {
            let now = self.now.get();
            self.now.set(now + self.step);
            now
        }
    }
}
