// Copyright 2025 Disque Client Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Disque CLI
//!
//! Command-line client for Disque clusters.
//!
//! The `disque` binary parses its arguments with `argh`, builds a
//! [`disque_client::Client`] from the resolved settings and prints every
//! result as JSON on stdout. Logs go to stderr, filtered by `RUST_LOG`.
//!
//! ## Settings
//!
//! - Servers come from repeated `--server` flags, then `DISQUE_SERVERS`
//!   (comma separated), then `127.0.0.1:7711`.
//! - The password comes from `--password`, then `DISQUE_PASSWORD`.
//!
//! ## Key Commands
//!
//! - `disque push` / `disque pull` / `disque ack`: produce and consume jobs
//! - `disque qlen` / `disque qscan` / `disque show`: inspect queues and jobs
//! - `disque hello` / `disque info`: inspect the connected node
//! - `disque call`: run any registered command with JSON arguments

pub mod args;
pub mod settings;

pub use args::{call_arguments, job_options, JobOptions};
pub use settings::{resolve_password, resolve_servers, Settings, DEFAULT_SERVER, PASSWORD_ENV, SERVERS_ENV};
