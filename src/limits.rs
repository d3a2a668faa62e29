//! Server configuration limits and timeouts.
//!
//! # Security-First Defaults
//!
//! Default limits are intentionally conservative to prevent:
//! - Resource exhaustion from oversized request lines
//! - Slowloris-style connections held open without data
//! - Unbounded handler registration
//!
//! # Memory Consumption
//!
//! The server processes exactly one connection at a time, so total
//! transient memory is one request-path buffer ([`request_buffer`]
//! bytes) plus the fixed 32-byte pushback stack. Nothing is allocated
//! per byte or per header.
//!
//! [`request_buffer`]: ServerLimits::request_buffer
//!
//! # Examples
//!
//! ```
//! use solo_web::limits::ServerLimits;
//! use std::time::Duration;
//!
//! let limits = ServerLimits {
//!     request_buffer: 128,                      // Longer paths
//!     read_timeout: Duration::from_secs(10),    // Drop idle peers faster
//!     ..ServerLimits::default()
//! };
//! # let _ = limits;
//! ```

use std::time::Duration;

/// Controls per-connection buffer sizes, timeouts, and registration capacity.
///
/// One instance is given to [`Server::new`](crate::Server::new) and applies
/// to every connection the server processes.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Size in bytes of the request-path buffer, including the byte
    /// reserved for the terminator (default: `32`).
    ///
    /// A path longer than `request_buffer - 1` bytes is silently
    /// truncated; the handler sees the truncation through its
    /// `tail_complete` argument.
    pub request_buffer: usize,

    /// How long a blocking read waits for the peer before the
    /// connection is considered dead and torn down (default: `300s`).
    ///
    /// The timeout restarts on every read call, so it bounds the gap
    /// between bytes, not the total request duration.
    pub read_timeout: Duration,

    /// Maximum number of command verbs that can be registered
    /// (default: `8`).
    ///
    /// Registration past this capacity is ignored (and logged); the
    /// table is never reallocated.
    pub command_capacity: usize,

    /// Whether generated responses carry a `Server:` header
    /// (default: `true`).
    pub server_header: bool,

    /// Body sent by the built-in failure command with its
    /// `400 Bad Request` response (default: `"<h1>400 Bad Request</h1>"`).
    pub fail_body: &'static str,
}

impl Default for ServerLimits {
    #[inline]
    fn default() -> Self {
        ServerLimits {
            request_buffer: 32,
            read_timeout: Duration::from_secs(300),
            command_capacity: 8,
            server_header: true,
            fail_body: "<h1>400 Bad Request</h1>",
        }
    }
}
