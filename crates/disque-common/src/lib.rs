//! Disque Common Types, Commands and Transport
//!
//! This crate provides the protocol layer shared by the Disque client and
//! command-line tool: the error taxonomy, the decoded reply type, one handler
//! per broker command, and a blocking RESP transport.
//!
//! # Overview
//!
//! Disque is a distributed, replicated job queue. Nodes speak RESP, the
//! Redis serialization protocol, on port 7711 by default:
//!
//! - **Transport Layer**: a [`transport::Connection`] sends one command and
//!   returns one raw [`transport::RespFrame`]
//! - **Protocol Layer**: frames are decoded once into a [`Reply`], and errors
//!   are classified into [`DisqueError`]
//! - **Commands**: each [`commands::Command`] validates its arguments and
//!   parses the decoded reply into a typed [`commands::Response`]
//!
//! # Example
//!
//! ```no_run
//! use disque_common::commands::{Command, GetJob};
//! use disque_common::transport::{Connection, ConnectionOptions, TcpConnection};
//! use disque_common::Reply;
//! use serde_json::json;
//!
//! let mut conn = TcpConnection::new("127.0.0.1", 7711, ConnectionOptions::default());
//! conn.connect()?;
//!
//! let mut get = GetJob::new();
//! get.set_arguments(vec![json!("emails"), json!({"nohang": true})])?;
//! let frame = conn.send(get.name(), get.arguments())?;
//! let jobs = get.parse(Reply::decode(frame)?)?.into_jobs("GETJOB")?;
//! # Ok::<(), disque_common::DisqueError>(())
//! ```

pub mod commands;
pub mod protocol;
pub mod transport;

pub use protocol::*;
