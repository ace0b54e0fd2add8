//! Disque client: connection management, command invocation and queues.
//!
//! - [`Manager`] keeps the registered servers and the active connection,
//!   failing over when a node goes away and moving to the node that produces
//!   most of the jobs being consumed.
//! - [`Client`] resolves commands by name and runs them through the manager.
//! - [`Queue`] wraps push / pull / acknowledge for one queue.

pub mod client;
pub mod manager;
pub mod queue;
pub mod server;

pub use client::Client;
pub use manager::{ConnectionFactory, Manager, ManagerConfig};
pub use queue::{BasicJob, Job, JobFactory, Queue};
pub use server::{parse_server_address, parse_servers, Server, DEFAULT_PORT};
