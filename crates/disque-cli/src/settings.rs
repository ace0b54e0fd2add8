//! Connection settings resolved from flags and the environment.

use std::time::Duration;

use anyhow::{bail, Result};
use disque_client::{parse_servers, Client, Manager, ManagerConfig};
use disque_common::transport::ConnectionOptions;

/// Comma separated `host:port` list used when no `--server` is given
pub const SERVERS_ENV: &str = "DISQUE_SERVERS";

/// Password used when `--password` is not given
pub const PASSWORD_ENV: &str = "DISQUE_PASSWORD";

pub const DEFAULT_SERVER: &str = "127.0.0.1:7711";

/// Flags win over the environment; the environment wins over the default.
/// Blank entries in the environment list are ignored.
pub fn resolve_servers(flags: Vec<String>, env: Option<String>) -> Vec<String> {
    if !flags.is_empty() {
        return flags;
    }

    let from_env: Vec<String> = env
        .iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(String::from)
        .collect();

    if from_env.is_empty() {
        vec![DEFAULT_SERVER.to_string()]
    } else {
        from_env
    }
}

pub fn resolve_password(flag: Option<String>, env: Option<String>) -> Option<String> {
    flag.or(env).filter(|password| !password.is_empty())
}

/// Everything needed to build a [`Client`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub servers: Vec<String>,
    pub password: Option<String>,
    pub connect_timeout: Duration,
    pub minimum_jobs_to_change_node: u64,
}

impl Settings {
    /// Resolves servers and password against `DISQUE_SERVERS` and
    /// `DISQUE_PASSWORD`.
    pub fn from_env(servers: Vec<String>, password: Option<String>) -> Self {
        Self {
            servers: resolve_servers(servers, std::env::var(SERVERS_ENV).ok()),
            password: resolve_password(password, std::env::var(PASSWORD_ENV).ok()),
            connect_timeout: ConnectionOptions::default().connect_timeout,
            minimum_jobs_to_change_node: 0,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_minimum_jobs_to_change_node(mut self, jobs: u64) -> Self {
        self.minimum_jobs_to_change_node = jobs;
        self
    }

    /// Builds a client without connecting.
    ///
    /// # Errors
    ///
    /// Fails when none of the configured addresses parses.
    pub fn build(&self) -> Result<Client> {
        let servers = parse_servers(&self.servers);
        if servers.is_empty() {
            bail!("No valid server address in {:?}", self.servers);
        }

        let config = ManagerConfig::default().with_minimum_jobs_to_change_node(self.minimum_jobs_to_change_node);
        let options = ConnectionOptions::default().with_connect_timeout(self.connect_timeout);
        let mut manager = Manager::new(config);

        for server in servers {
            let server = match &self.password {
                Some(password) => server.with_password(password.clone()),
                None => server,
            };
            manager.add_server(server.with_options(options.clone()))?;
        }

        tracing::debug!(servers = ?self.servers, "Client configured");
        Ok(Client::with_manager(manager))
    }
}
