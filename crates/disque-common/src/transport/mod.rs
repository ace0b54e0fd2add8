//! Disque Transport Layer
//!
//! This module owns the byte-level side of talking to a Disque node.
//!
//! # Architecture
//!
//! - **[`Connection`]**: the capability the connection manager needs from a
//!   transport (connect, send, close, liveness). Anything implementing it can
//!   be injected, which is how tests script broker replies.
//! - **[`RespCodec`]**: RESP request encoding and reply frame decoding.
//! - **[`TcpConnection`]**: blocking TCP implementation built on the codec.
//!
//! # Wire Format
//!
//! Requests are RESP arrays of bulk strings; replies are status, error,
//! integer, bulk or (nested) array frames. See [`RespFrame`].
//!
//! # Example
//!
//! ```no_run
//! use disque_common::transport::{Connection, ConnectionOptions, TcpConnection};
//!
//! let mut conn = TcpConnection::new("127.0.0.1", 7711, ConnectionOptions::default());
//! conn.connect().unwrap();
//! let reply = conn.send("QLEN", &["jobs".to_string()]).unwrap();
//! ```

use std::time::Duration;

use crate::protocol::error::Result;

pub mod codec;
pub mod tcp;

pub use codec::{RespCodec, RespFrame};
pub use tcp::TcpConnection;


/// Default timeout for establishing a TCP connection (5 seconds)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport capability required by the connection manager.
///
/// One value represents the link to a single node. `send` blocks until the
/// node replies or the transport fails; failures must be reported with a
/// transport-class error (see [`DisqueError::is_transport`]) so the manager
/// knows to fail over.
///
/// [`DisqueError::is_transport`]: crate::DisqueError::is_transport
pub trait Connection {
    /// Opens the link. Calling it on an open link is a no-op.
    fn connect(&mut self) -> Result<()>;

    /// Sends one command and returns the raw reply frame.
    fn send(&mut self, command: &str, args: &[String]) -> Result<RespFrame>;

    /// Closes the link. Safe to call on a closed link.
    fn close(&mut self);

    /// Whether the link is currently open.
    fn is_connected(&self) -> bool;
}

/// Per-server transport options.
///
/// `read_timeout` defaults to `None` because GETJOB legitimately blocks on
/// the node for as long as the caller asked it to wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Timeout for establishing the TCP connection
    pub connect_timeout: Duration,
    /// Timeout for reading a reply (`None` blocks indefinitely)
    pub read_timeout: Option<Duration>,
    /// Timeout for writing a request (`None` blocks indefinitely)
    pub write_timeout: Option<Duration>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: None,
            write_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }
}

impl ConnectionOptions {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }
}
