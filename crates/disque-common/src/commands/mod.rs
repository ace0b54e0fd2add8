//! Disque Command Handlers
//!
//! One handler per broker operation. A handler validates and encodes the
//! caller's arguments, and parses the decoded [`Reply`] into a typed
//! [`Response`].
//!
//! # Handler Lifecycle
//!
//! 1. [`Command::set_arguments`] validates the loosely typed arguments
//! 2. [`Command::arguments`] exposes them encoded for the transport
//! 3. The connection manager sends `name() + arguments()` to a node
//! 4. [`Command::parse`] turns the decoded reply into a [`Response`]
//!
//! Any reply that does not have the expected shape fails with
//! `DisqueError::InvalidResponse`, carrying the command name and the
//! canonical rendering of what was received.
//!
//! # Example
//!
//! ```
//! use disque_common::commands::{Command, QLen, Response};
//! use disque_common::Reply;
//! use serde_json::json;
//!
//! let mut qlen = QLen::new();
//! qlen.set_arguments(vec![json!("jobs")]).unwrap();
//! assert_eq!(qlen.arguments(), ["jobs"]);
//! assert_eq!(qlen.parse(Reply::Integer(4)).unwrap(), Response::Integer(4));
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::protocol::error::{DisqueError, Result};
use crate::protocol::reply::{render, Reply};

pub mod add_job;
pub mod args;
pub mod ids;
pub mod jobs;
pub mod queues;
pub mod server;


pub use add_job::AddJob;
pub use ids::{JobIdCommand, Show, Working};
pub use jobs::{node_prefix, GetJob, JobData, QPeek};
pub use queues::{parse_cursor, CursorResult, QLen, QScan};
pub use server::{Auth, ClusterNode, Hello, Info, NodeInfo};

/// Loosely typed command arguments, as accepted by the generic invocation
/// entry point.
pub type CommandArgs = Vec<Value>;

/// A broker operation.
pub trait Command {
    /// Canonical uppercase command name.
    fn name(&self) -> &str;

    /// Validates and stores the arguments for the next execution.
    fn set_arguments(&mut self, args: CommandArgs) -> Result<()>;

    /// Encoded arguments, in wire order.
    fn arguments(&self) -> &[String];

    /// Parses a decoded reply into this command's result.
    fn parse(&self, reply: Reply) -> Result<Response>;

    /// Whether successful replies carry jobs produced by some node. The
    /// connection manager counts those jobs to decide where to connect.
    fn produces_jobs(&self) -> bool {
        false
    }

    /// IDs of the jobs carried by a reply. Only meaningful when
    /// [`produces_jobs`](Self::produces_jobs) is true.
    fn job_ids(&self, _reply: &Reply) -> Vec<String> {
        Vec::new()
    }
}

/// Typed result of a command.
///
/// Serializes untagged, so the CLI prints the inner value directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Integer(i64),
    Text(String),
    Jobs(Vec<JobData>),
    Hello(NodeInfo),
    Cursor(CursorResult),
    Details(Option<BTreeMap<String, Value>>),
}

impl Response {
    pub fn into_integer(self, command: &str) -> Result<i64> {
        match self {
            Response::Integer(n) => Ok(n),
            other => Err(other.mismatch(command)),
        }
    }

    pub fn into_text(self, command: &str) -> Result<String> {
        match self {
            Response::Text(text) => Ok(text),
            other => Err(other.mismatch(command)),
        }
    }

    pub fn into_jobs(self, command: &str) -> Result<Vec<JobData>> {
        match self {
            Response::Jobs(jobs) => Ok(jobs),
            other => Err(other.mismatch(command)),
        }
    }

    pub fn into_hello(self, command: &str) -> Result<NodeInfo> {
        match self {
            Response::Hello(info) => Ok(info),
            other => Err(other.mismatch(command)),
        }
    }

    pub fn into_cursor(self, command: &str) -> Result<CursorResult> {
        match self {
            Response::Cursor(cursor) => Ok(cursor),
            other => Err(other.mismatch(command)),
        }
    }

    pub fn into_details(self, command: &str) -> Result<Option<BTreeMap<String, Value>>> {
        match self {
            Response::Details(details) => Ok(details),
            other => Err(other.mismatch(command)),
        }
    }

    /// A handler registered under `command` produced a different result
    /// type than its typed wrapper expects.
    fn mismatch(&self, command: &str) -> DisqueError {
        DisqueError::InvalidResponse {
            command: command.to_string(),
            body: serde_json::to_value(self)
                .map(|v| render(&v))
                .unwrap_or_else(|_| format!("{:?}", self)),
        }
    }
}

/// Response-shape error for `command` carrying the canonical dump of `reply`.
pub fn invalid_response(command: &str, reply: &Reply) -> DisqueError {
    DisqueError::InvalidResponse {
        command: command.to_string(),
        body: reply.render(),
    }
}

/// Fresh instances of every built-in handler a client registers by default.
///
/// AUTH is deliberately absent: it is issued by the connection manager
/// during the handshake, not by callers.
pub fn builtin() -> Vec<Box<dyn Command>> {
    vec![
        Box::new(JobIdCommand::ack_job()),
        Box::new(AddJob::new()),
        Box::new(JobIdCommand::del_job()),
        Box::new(JobIdCommand::dequeue()),
        Box::new(JobIdCommand::enqueue()),
        Box::new(JobIdCommand::fast_ack()),
        Box::new(GetJob::new()),
        Box::new(Hello::new()),
        Box::new(Info::new()),
        Box::new(JobIdCommand::nack()),
        Box::new(QLen::new()),
        Box::new(QPeek::new()),
        Box::new(QScan::new()),
        Box::new(Show::new()),
        Box::new(Working::new()),
    ]
}
