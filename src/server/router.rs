//! Command registration and dispatch.

use crate::{
    http::request::Method,
    io::source::{ByteSource, Clock},
    server::connection::Connection,
};
use memchr::memchr;

/// A registered request handler.
///
/// Implemented automatically for closures and functions of the matching
/// shape, so commands are usually written inline:
///
/// ```no_run
/// # use solo_web::{Connection, Method, Server, SystemClock, TcpByteSource};
/// # use solo_web::limits::ServerLimits;
/// # let mut server: Server<TcpByteSource, SystemClock> =
/// #     Server::new("", ServerLimits::default(), SystemClock::default());
/// server.add_command("status", |conn: &mut Connection<_, _>, _: Method, _: &[u8], _: bool| {
///     let _ = conn.http_success("text/plain", None);
///     let _ = conn.print("ok");
/// });
/// ```
///
/// The `tail` argument holds everything after the matched verb's `?`,
/// URL-encoded; decode it with [`UrlParams`](crate::UrlParams).
/// `tail_complete` is false when the request line overflowed the path
/// buffer, meaning the tail (and possibly the verb itself) was cut
/// short on storage.
pub trait Command<S: ByteSource, C: Clock> {
    fn run(&self, conn: &mut Connection<S, C>, method: Method, tail: &[u8], tail_complete: bool);
}

impl<S, C, F> Command<S, C> for F
where
    S: ByteSource,
    C: Clock,
    F: Fn(&mut Connection<S, C>, Method, &[u8], bool),
{
    #[inline]
    fn run(&self, conn: &mut Connection<S, C>, method: Method, tail: &[u8], tail_complete: bool) {
        self(conn, method, tail, tail_complete)
    }
}

/// First-match-wins table of verb-to-command bindings, plus the default
/// and failure commands.
pub(crate) struct Router<S: ByteSource, C: Clock> {
    commands: Vec<(&'static str, Box<dyn Command<S, C>>)>,
    capacity: usize,
    default_cmd: Box<dyn Command<S, C>>,
    failure_cmd: Box<dyn Command<S, C>>,
}

fn bad_request<S: ByteSource, C: Clock>(
    conn: &mut Connection<S, C>,
    _method: Method,
    _tail: &[u8],
    _tail_complete: bool,
) {
    if let Err(e) = conn.http_fail() {
        tracing::debug!(error = %e, "failed writing error response");
    }
}

impl<S: ByteSource + 'static, C: Clock + 'static> Router<S, C> {
    /// Until the application installs its own, both the default and the
    /// failure command answer `400 Bad Request`.
    pub(crate) fn new(capacity: usize) -> Self {
        Router {
            commands: Vec::with_capacity(capacity),
            capacity,
            default_cmd: Box::new(bad_request),
            failure_cmd: Box::new(bad_request),
        }
    }

    /// Binds `verb` to `command`. Registration past the configured
    /// capacity is dropped so the table never reallocates.
    pub(crate) fn add(&mut self, verb: &'static str, command: Box<dyn Command<S, C>>) {
        if self.commands.len() >= self.capacity {
            tracing::warn!(verb, "command table full, registration ignored");
            return;
        }
        self.commands.push((verb, command));
    }

    pub(crate) fn set_default(&mut self, command: Box<dyn Command<S, C>>) {
        self.default_cmd = command;
    }

    pub(crate) fn set_failure(&mut self, command: Box<dyn Command<S, C>>) {
        self.failure_cmd = command;
    }

    /// Routes a prefix-stripped path to its command.
    ///
    /// An empty path or bare `/` runs the default command. Otherwise
    /// the leading slash is dropped, the path splits at the first `?`
    /// into verb and tail, and the first registered binding whose verb
    /// equals the whole verb token wins. Returns false when nothing
    /// matched (including a path without a leading slash).
    pub(crate) fn dispatch(
        &self,
        conn: &mut Connection<S, C>,
        method: Method,
        path: &[u8],
        tail_complete: bool,
    ) -> bool {
        if path.is_empty() || path == b"/" {
            self.default_cmd.run(conn, method, b"", tail_complete);
            return true;
        }

        let Some(rest) = path.strip_prefix(b"/") else {
            return false;
        };

        let (word, tail) = match memchr(b'?', rest) {
            Some(at) => (&rest[..at], &rest[at + 1..]),
            None => (rest, &rest[rest.len()..]),
        };

        for (verb, command) in &self.commands {
            if verb.as_bytes() == word {
                command.run(conn, method, tail, tail_complete);
                return true;
            }
        }

        false
    }

    /// Runs the failure command with the raw, un-split path.
    pub(crate) fn fail(
        &self,
        conn: &mut Connection<S, C>,
        method: Method,
        path: &[u8],
        tail_complete: bool,
    ) {
        self.failure_cmd.run(conn, method, path, tail_complete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{limits::ServerLimits, testing::SliceSource, SystemClock};
    use std::{cell::RefCell, rc::Rc};

    type TestConn = Connection<SliceSource, SystemClock>;

    fn conn() -> TestConn {
        Connection::new(
            SliceSource::open(""),
            SystemClock::default(),
            &ServerLimits::default(),
        )
    }

    fn recording(
        log: &Rc<RefCell<Vec<String>>>,
        label: &'static str,
    ) -> Box<dyn Command<SliceSource, SystemClock>> {
        let log = Rc::clone(log);
        Box::new(
            move |_: &mut TestConn, _method: Method, tail: &[u8], _complete: bool| {
                log.borrow_mut()
                    .push(format!("{label}:{}", String::from_utf8_lossy(tail)));
            },
        )
    }

    #[test]
    fn first_registration_wins() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = Router::new(8);
        router.add("dup", recording(&log, "first"));
        router.add("dup", recording(&log, "second"));

        assert!(router.dispatch(&mut conn(), Method::Get, b"/dup", true));
        assert_eq!(*log.borrow(), ["first:"]);
    }

    #[test]
    fn empty_and_root_run_default() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = Router::new(8);
        router.set_default(recording(&log, "default"));

        assert!(router.dispatch(&mut conn(), Method::Get, b"", true));
        assert!(router.dispatch(&mut conn(), Method::Get, b"/", true));
        assert_eq!(*log.borrow(), ["default:", "default:"]);
    }

    #[test]
    fn verb_match_is_exact() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = Router::new(8);
        router.add("foo", recording(&log, "foo"));

        assert!(!router.dispatch(&mut conn(), Method::Get, b"/foobar", true));
        assert!(!router.dispatch(&mut conn(), Method::Get, b"/fo", true));
        assert!(router.dispatch(&mut conn(), Method::Get, b"/foo", true));
        assert_eq!(*log.borrow(), ["foo:"]);
    }

    #[test]
    fn question_mark_splits_verb_and_tail() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = Router::new(8);
        router.add("search", recording(&log, "search"));

        assert!(router.dispatch(&mut conn(), Method::Get, b"/search?x=1&y=a+b", true));
        assert_eq!(*log.borrow(), ["search:x=1&y=a+b"]);
    }

    #[test]
    fn registration_past_capacity_is_ignored() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut router = Router::new(1);
        router.add("a", recording(&log, "a"));
        router.add("b", recording(&log, "b"));

        assert!(router.dispatch(&mut conn(), Method::Get, b"/a", true));
        assert!(!router.dispatch(&mut conn(), Method::Get, b"/b", true));
    }

    #[test]
    fn unmatched_path_reports_false() {
        let router: Router<SliceSource, SystemClock> = Router::new(8);

        assert!(!router.dispatch(&mut conn(), Method::Get, b"/missing", true));
        // No leading slash: never routed.
        assert!(!router.dispatch(&mut conn(), Method::Get, b"bare", true));
    }
}
