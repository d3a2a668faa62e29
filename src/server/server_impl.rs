//! The server front door: listener setup, the accept loop, and the
//! per-connection request pipeline.

use crate::{
    http::request::{Method, Request},
    io::source::{ByteSource, Clock, SystemClock, TcpByteSource},
    limits::ServerLimits,
    server::{connection::Connection, router::Router},
    Command,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    io,
    net::{SocketAddr, TcpListener},
};

/// Synchronous HTTP/1.0 server processing one connection at a time.
///
/// Generic over the byte source and clock so the whole pipeline runs
/// against in-memory fakes in tests; production code uses the
/// [`TcpServer`] alias and [`run`](Server::run).
///
/// ```no_run
/// use solo_web::{limits::ServerLimits, Server, SystemClock, TcpServer};
///
/// fn main() -> std::io::Result<()> {
///     let mut server: TcpServer = Server::new("", ServerLimits::default(),
///         SystemClock::default());
///     server.set_default_command(|conn: &mut solo_web::Connection<_, _>, _: solo_web::Method, _: &[u8], _: bool| {
///         let _ = conn.http_success("text/html", None);
///         let _ = conn.print("<h1>hello</h1>");
///     });
///
///     let listener = TcpServer::bind("0.0.0.0:8080".parse().unwrap())?;
///     server.run(&listener)
/// }
/// ```
pub struct Server<S: ByteSource, C: Clock = SystemClock> {
    url_prefix: &'static str,
    limits: ServerLimits,
    clock: C,
    router: Router<S, C>,
}

impl<S: ByteSource + 'static, C: Clock + Clone + 'static> Server<S, C> {
    /// Creates a server routing paths under `url_prefix`.
    ///
    /// A request path must start with the prefix to be routed; the
    /// router sees only the part after it. The common case is the empty
    /// prefix, which routes everything.
    pub fn new(url_prefix: &'static str, limits: ServerLimits, clock: C) -> Self {
        let router = Router::new(limits.command_capacity);
        Server {
            url_prefix,
            limits,
            clock,
            router,
        }
    }

    /// Binds `verb` to `command`. First-registered wins on duplicate
    /// verbs; registrations past
    /// [`command_capacity`](ServerLimits::command_capacity) are dropped.
    pub fn add_command(&mut self, verb: &'static str, command: impl Command<S, C> + 'static) {
        self.router.add(verb, Box::new(command));
    }

    /// Installs the command run for the empty path and bare `/`.
    pub fn set_default_command(&mut self, command: impl Command<S, C> + 'static) {
        self.router.set_default(Box::new(command));
    }

    /// Installs the command run when no verb matches. It receives the
    /// full stored path, not a tail.
    pub fn set_failure_command(&mut self, command: impl Command<S, C> + 'static) {
        self.router.set_failure(Box::new(command));
    }

    /// Runs one connection through the full pipeline: parse the request
    /// line, scan the headers, route, close.
    ///
    /// When the connection dies before any request line is formed (the
    /// read timed out or the peer hung up immediately) nothing is
    /// routed, not even the failure command; there is no request to
    /// fail on.
    pub fn process_connection(&self, source: S) {
        let mut request = Request::new(&self.limits);
        let mut conn = Connection::new(source, self.clock.clone(), &self.limits);

        conn.read_request(&mut request);
        if !conn.process_headers() {
            tracing::warn!("connection ended inside the header block");
        }

        // A peer that never sent a byte (timed out or hung up on
        // connect) formed no request; anything it did send, even a
        // malformed line collapsing to an empty path, still reaches
        // the failure command.
        if !request.seen_input {
            conn.close();
            return;
        }

        tracing::debug!(
            method = ?request.method(),
            path = %String::from_utf8_lossy(request.path()),
            "dispatching request"
        );

        if request.path() == b"/robots.txt" {
            if let Err(e) = conn.no_robots(request.method()) {
                tracing::debug!(error = %e, "failed writing robots response");
            }
        } else {
            let routed = request.method() != Method::Invalid
                && request.path().starts_with(self.url_prefix.as_bytes())
                && self.router.dispatch(
                    &mut conn,
                    request.method(),
                    &request.path()[self.url_prefix.len()..],
                    request.tail_complete(),
                );
            if !routed {
                self.router.fail(
                    &mut conn,
                    request.method(),
                    request.path(),
                    request.tail_complete(),
                );
            }
        }

        conn.close();
    }
}

/// The production instantiation: TCP transport, wall clock.
pub type TcpServer = Server<TcpByteSource, SystemClock>;

impl Server<TcpByteSource, SystemClock> {
    /// Creates a TCP listener on `addr` with `SO_REUSEADDR`, ready for
    /// [`run`](Server::run).
    pub fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
        let domain = match addr {
            SocketAddr::V4(_) => Domain::IPV4,
            SocketAddr::V6(_) => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(8)?;
        Ok(socket.into())
    }

    /// Accept loop: serves connections from `listener` one at a time,
    /// forever. Only a failing `accept` ends the loop.
    pub fn run(&self, listener: &TcpListener) -> io::Result<()> {
        loop {
            let (stream, peer) = listener.accept()?;
            tracing::debug!(%peer, "connection accepted");
            match TcpByteSource::new(stream) {
                Ok(source) => self.process_connection(source),
                Err(e) => tracing::warn!(error = %e, %peer, "failed to prepare stream"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testing::{SliceSource, TickClock},
        UrlParamResult, UrlParams,
    };
    use std::{cell::RefCell, rc::Rc};

    type TestServer = Server<SliceSource, TickClock>;
    type TestConn = Connection<SliceSource, TickClock>;

    fn server() -> TestServer {
        Server::new("", ServerLimits::default(), TickClock::new(1))
    }

    fn str_of(buf: &[u8]) -> String {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        String::from_utf8_lossy(&buf[..end]).into_owned()
    }

    #[test]
    fn get_with_query_string() {
        let mut server = server();
        let log = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&log);
        server.add_command(
            "search",
            move |conn: &mut TestConn, method: Method, tail: &[u8], complete: bool| {
                assert_eq!(method, Method::Get);
                assert!(complete);

                let mut params = UrlParams::new(tail);
                let (mut name, mut value) = ([0u8; 16], [0u8; 16]);
                while params.next_param(&mut name, &mut value) != UrlParamResult::EndOfParams {
                    seen.borrow_mut()
                        .push(format!("{}={}", str_of(&name), str_of(&value)));
                }

                conn.http_success("text/plain", None).unwrap();
                conn.print("found").unwrap();
            },
        );

        let source = SliceSource::open("GET /search?x=1&y=a+b HTTP/1.0\r\n\r\n");
        let written = source.written_handle();
        server.process_connection(source);

        assert_eq!(*log.borrow(), ["x=1", "y=a b"]);
        let out = String::from_utf8(written.borrow().clone()).unwrap();
        assert!(out.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(out.ends_with("\r\n\r\nfound"));
    }

    #[test]
    fn robots_txt_is_built_in() {
        let server = server();
        let source = SliceSource::open("GET /robots.txt HTTP/1.0\r\n\r\n");
        let written = source.written_handle();
        server.process_connection(source);

        let out = String::from_utf8(written.borrow().clone()).unwrap();
        assert!(out.contains("Content-Type: text/plain\r\n"));
        assert!(out.ends_with("User-agent: *\r\nDisallow: /\r\n"));
    }

    #[test]
    fn post_body_params_reach_the_command() {
        let mut server = server();
        let log = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&log);
        server.add_command(
            "submit",
            move |conn: &mut TestConn, method: Method, _: &[u8], _: bool| {
                assert_eq!(method, Method::Post);

                let (mut name, mut value) = ([0u8; 16], [0u8; 16]);
                loop {
                    let more = conn.read_post_param(&mut name, &mut value);
                    seen.borrow_mut()
                        .push(format!("{}={}", str_of(&name), str_of(&value)));
                    if !more {
                        break;
                    }
                }
                conn.http_see_other("/done").unwrap();
            },
        );

        let source = SliceSource::open(
            "POST /submit HTTP/1.0\r\nContent-Length: 11\r\n\r\nname=%41%42garbage",
        );
        let written = source.written_handle();
        server.process_connection(source);

        // The content-length budget hides the trailing garbage.
        assert_eq!(*log.borrow(), ["name=AB"]);
        assert!(String::from_utf8(written.borrow().clone())
            .unwrap()
            .starts_with("HTTP/1.0 303 See Other\r\n"));
    }

    #[test]
    fn dead_connection_routes_nothing() {
        let mut server = Server::new(
            "",
            ServerLimits {
                read_timeout: std::time::Duration::from_millis(50),
                ..ServerLimits::default()
            },
            TickClock::new(10),
        );
        server.set_failure_command(|_: &mut TestConn, _: Method, _: &[u8], _: bool| {
            panic!("failure command must not run without a request");
        });

        // Peer connects, sends nothing, and the read times out: no
        // request line was ever formed.
        let source = SliceSource::stalled();
        let written = source.written_handle();
        server.process_connection(source);

        assert!(written.borrow().is_empty());
    }

    #[test]
    fn malformed_request_line_still_runs_failure_command() {
        let mut server = server();
        let log = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&log);
        server.set_failure_command(
            move |conn: &mut TestConn, method: Method, path: &[u8], _: bool| {
                seen.borrow_mut()
                    .push((method, String::from_utf8_lossy(path).into_owned()));
                conn.http_fail().unwrap();
            },
        );

        // The line collapses to an empty path, but bytes did arrive:
        // unlike a silent peer, this is a request to fail on.
        let source = SliceSource::open(" HTTP/1.0\r\n\r\n");
        let written = source.written_handle();
        server.process_connection(source);

        assert_eq!(*log.borrow(), [(Method::Invalid, String::new())]);
        assert!(String::from_utf8(written.borrow().clone())
            .unwrap()
            .starts_with("HTTP/1.0 400 Bad Request\r\n"));
    }

    #[test]
    fn unmatched_verb_runs_failure_command() {
        let mut server = server();
        let log = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&log);
        server.set_failure_command(move |conn: &mut TestConn, _: Method, path: &[u8], _: bool| {
            // The failure command sees the full stored path.
            seen.borrow_mut().push(String::from_utf8_lossy(path).into_owned());
            conn.http_fail().unwrap();
        });

        let source = SliceSource::open("GET /missing?q=1 HTTP/1.0\r\n\r\n");
        let written = source.written_handle();
        server.process_connection(source);

        assert_eq!(*log.borrow(), ["/missing?q=1"]);
        assert!(String::from_utf8(written.borrow().clone())
            .unwrap()
            .starts_with("HTTP/1.0 400 Bad Request\r\n"));
    }

    #[test]
    fn invalid_method_runs_failure_command() {
        let server = server();
        let source = SliceSource::open("PUT /x HTTP/1.0\r\n\r\n");
        let written = source.written_handle();
        server.process_connection(source);

        // Built-in failure command answers 400.
        assert!(String::from_utf8(written.borrow().clone())
            .unwrap()
            .starts_with("HTTP/1.0 400 Bad Request\r\n"));
    }

    #[test]
    fn prefix_gates_routing() {
        let mut server: TestServer =
            Server::new("/api", ServerLimits::default(), TickClock::new(1));
        let hits = Rc::new(RefCell::new(0u32));
        let count = Rc::clone(&hits);
        server.add_command("ping", move |conn: &mut TestConn, _: Method, _: &[u8], _: bool| {
            *count.borrow_mut() += 1;
            conn.http_success("text/plain", None).unwrap();
        });

        let source = SliceSource::open("GET /api/ping HTTP/1.0\r\n\r\n");
        server.process_connection(source);
        assert_eq!(*hits.borrow(), 1);

        // Same verb outside the prefix falls through to failure.
        let source = SliceSource::open("GET /ping HTTP/1.0\r\n\r\n");
        let written = source.written_handle();
        server.process_connection(source);
        assert_eq!(*hits.borrow(), 1);
        assert!(String::from_utf8(written.borrow().clone())
            .unwrap()
            .starts_with("HTTP/1.0 400 Bad Request\r\n"));
    }

    #[test]
    fn truncated_path_reaches_failure_with_flag() {
        let mut server: TestServer = Server::new(
            "",
            ServerLimits {
                request_buffer: 8,
                ..ServerLimits::default()
            },
            TickClock::new(1),
        );
        let log = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&log);
        server.set_failure_command(move |_: &mut TestConn, _: Method, path: &[u8], complete: bool| {
            seen.borrow_mut()
                .push((String::from_utf8_lossy(path).into_owned(), complete));
        });

        let source = SliceSource::open("GET /averylongpath HTTP/1.0\r\n\r\n");
        server.process_connection(source);

        assert_eq!(*log.borrow(), [("/averyl".to_string(), false)]);
    }

    #[test]
    fn head_request_skips_robots_body() {
        let server = server();
        let source = SliceSource::open("HEAD /robots.txt HTTP/1.0\r\n\r\n");
        let written = source.written_handle();
        server.process_connection(source);

        let out = String::from_utf8(written.borrow().clone()).unwrap();
        assert!(out.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(out.ends_with("\r\n\r\n"));
    }
}
