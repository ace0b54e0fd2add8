//! Connection manager: server registry, failover and node rebalancing.
//!
//! The manager holds at most one live [`Connection`]. Commands run on it
//! until the link fails, at which point the remaining registered servers are
//! tried in order. Independently, jobs returned by job-producing commands are
//! counted per originating node; once one node has produced enough of them,
//! the manager moves its connection there, since Disque serves a queue best
//! from the node that holds its jobs.

use disque_common::commands::{node_prefix, Auth, ClusterNode, Command, Hello, NodeInfo};
use disque_common::transport::{Connection, TcpConnection};
use disque_common::{DisqueError, Reply, Result};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::server::Server;

/// Builds the transport used to reach a server.
pub type ConnectionFactory = Box<dyn Fn(&Server) -> Box<dyn Connection>>;

/// Manager configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Jobs a single node must produce before the manager switches to it.
    /// `0` disables switching.
    pub minimum_jobs_to_change_node: u64,
}

impl ManagerConfig {
    pub fn with_minimum_jobs_to_change_node(mut self, jobs: u64) -> Self {
        self.minimum_jobs_to_change_node = jobs;
        self
    }
}

/// Jobs counted for one cluster member since the last reset.
#[derive(Debug, Clone)]
struct NodeSlot {
    node: ClusterNode,
    jobs: u64,
}

struct ActiveNode {
    server: Server,
    connection: Box<dyn Connection>,
    info: NodeInfo,
}

pub struct Manager {
    config: ManagerConfig,
    servers: Vec<Server>,
    factory: ConnectionFactory,
    active: Option<ActiveNode>,
    slots: Vec<NodeSlot>,
}

impl Manager {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            servers: Vec::new(),
            factory: Box::new(|server: &Server| -> Box<dyn Connection> {
                Box::new(TcpConnection::new(
                    server.host.clone(),
                    server.port,
                    server.options.clone(),
                ))
            }),
            active: None,
            slots: Vec::new(),
        }
    }

    /// Registers a server. Re-adding a known host/port is a no-op.
    pub fn add_server(&mut self, server: Server) -> Result<()> {
        server.validate()?;
        if self.servers.iter().any(|known| known.same_identity(&server)) {
            debug!(addr = %server.addr(), "Server already registered");
            return Ok(());
        }
        self.servers.push(server);
        Ok(())
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Replaces the transport used for new connections.
    pub fn set_connection_factory<F>(&mut self, factory: F)
    where
        F: Fn(&Server) -> Box<dyn Connection> + 'static,
    {
        self.factory = Box::new(factory);
    }

    pub fn set_minimum_jobs_to_change_node(&mut self, jobs: u64) {
        self.config.minimum_jobs_to_change_node = jobs;
    }

    pub fn minimum_jobs_to_change_node(&self) -> u64 {
        self.config.minimum_jobs_to_change_node
    }

    pub fn is_connected(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.connection.is_connected())
    }

    /// Handshake of the node currently connected to.
    pub fn current_node(&self) -> Option<&NodeInfo> {
        self.active.as_ref().map(|active| &active.info)
    }

    /// Server descriptor of the node currently connected to.
    pub fn current_server(&self) -> Option<&Server> {
        self.active.as_ref().map(|active| &active.server)
    }

    /// Jobs counted per cluster member (by node ID) since the last reset.
    pub fn job_counts(&self) -> Vec<(String, u64)> {
        self.slots
            .iter()
            .map(|slot| (slot.node.id.clone(), slot.jobs))
            .collect()
    }

    /// Connects to the first registered server that accepts us.
    ///
    /// Returns the cached handshake when already connected. An
    /// authentication failure stops the search immediately.
    pub fn connect(&mut self) -> Result<NodeInfo> {
        if let Some(active) = self.active.as_ref().filter(|a| a.connection.is_connected()) {
            return Ok(active.info.clone());
        }
        self.disconnect();

        if self.servers.is_empty() {
            return Err(DisqueError::Connection("No servers registered".to_string()));
        }

        let mut last_error = None;
        for server in self.servers.clone() {
            match self.open(&server) {
                Ok(active) => return Ok(self.activate(active)),
                Err(err @ DisqueError::Authentication(_)) => return Err(err),
                Err(err) => {
                    warn!(addr = %server.addr(), error = %err, "Failed to connect to server");
                    last_error = Some(err);
                }
            }
        }

        Err(exhausted(self.servers.len(), last_error))
    }

    /// Closes the active connection, if any.
    pub fn disconnect(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.connection.close();
            debug!(addr = %active.server.addr(), "Disconnected");
        }
        self.slots.clear();
    }

    /// Runs a command on the active node, connecting first if needed.
    ///
    /// A transport failure moves on to the other registered servers, retrying
    /// the command once on each. Broker error replies are returned as they
    /// are, without failover.
    pub fn execute(&mut self, command: &dyn Command) -> Result<Reply> {
        if !self.is_connected() {
            self.connect()?;
        }

        let result = match self.active.as_mut() {
            Some(active) => run(active.connection.as_mut(), command),
            None => Err(DisqueError::Connection("not connected".to_string())),
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(err) if err.is_transport() => self.fail_over(command, err)?,
            Err(err) => return Err(err),
        };

        if command.produces_jobs() {
            let ids = command.job_ids(&reply);
            self.count_jobs(&ids);
        }
        Ok(reply)
    }

    fn fail_over(&mut self, command: &dyn Command, cause: DisqueError) -> Result<Reply> {
        let failed = self.active.take().map(|mut active| {
            active.connection.close();
            active.server
        });
        self.slots.clear();

        let failed_addr = failed.as_ref().map(Server::addr).unwrap_or_default();
        warn!(addr = %failed_addr, error = %cause, command = command.name(), "Node failed, trying other servers");

        // Servers after the failed one first, then the ones before it
        let start = failed
            .as_ref()
            .and_then(|f| self.servers.iter().position(|s| s.same_identity(f)))
            .map(|i| i + 1)
            .unwrap_or(0);
        let mut candidates = self.servers[start..].to_vec();
        candidates.extend_from_slice(&self.servers[..start]);
        candidates.retain(|s| failed.as_ref().map_or(true, |f| !s.same_identity(f)));

        let mut last_error = cause;
        for server in candidates {
            let mut active = match self.open(&server) {
                Ok(active) => active,
                Err(err @ DisqueError::Authentication(_)) => return Err(err),
                Err(err) => {
                    warn!(addr = %server.addr(), error = %err, "Failover candidate unreachable");
                    last_error = err;
                    continue;
                }
            };

            match run(active.connection.as_mut(), command) {
                Ok(reply) => {
                    info!(addr = %server.addr(), command = command.name(), "Failed over");
                    self.activate(active);
                    return Ok(reply);
                }
                Err(err) if err.is_transport() => {
                    active.connection.close();
                    warn!(addr = %server.addr(), error = %err, "Retry failed");
                    last_error = err;
                }
                Err(err) => {
                    self.activate(active);
                    return Err(err);
                }
            }
        }

        Err(exhausted(self.servers.len(), Some(last_error)))
    }

    /// Opens a connection, authenticates and runs the handshake.
    fn open(&self, server: &Server) -> Result<ActiveNode> {
        let mut connection = (self.factory)(server);
        match handshake(connection.as_mut(), server) {
            Ok(info) => {
                debug!(addr = %server.addr(), node = %info.id, "Handshake complete");
                Ok(ActiveNode { server: server.clone(), connection, info })
            }
            Err(err) => {
                connection.close();
                Err(err)
            }
        }
    }

    fn activate(&mut self, active: ActiveNode) -> NodeInfo {
        info!(addr = %active.server.addr(), node = %active.info.id, "Connected to node");
        let info = active.info.clone();
        self.slots = info
            .nodes
            .iter()
            .map(|node| NodeSlot { node: node.clone(), jobs: 0 })
            .collect();
        self.active = Some(active);
        info
    }

    /// Counts jobs by producing node and switches nodes once one of them
    /// reaches the threshold.
    fn count_jobs(&mut self, job_ids: &[String]) {
        let threshold = self.config.minimum_jobs_to_change_node;
        if threshold == 0 || job_ids.is_empty() {
            return;
        }

        for id in job_ids {
            let Some(prefix) = node_prefix(id) else {
                continue;
            };
            if let Some(slot) = self.slots.iter_mut().find(|s| s.node.prefix() == prefix) {
                slot.jobs += 1;
            }
        }

        let Some(best) = self
            .slots
            .iter()
            .filter(|slot| slot.jobs >= threshold)
            .max_by_key(|slot| slot.jobs)
            .map(|slot| slot.node.clone())
        else {
            return;
        };

        let current_id = self.current_node().map(|info| info.id.clone());
        if current_id.as_deref() != Some(best.id.as_str()) {
            self.switch_to(&best);
        }
        for slot in &mut self.slots {
            slot.jobs = 0;
        }
    }

    fn switch_to(&mut self, node: &ClusterNode) {
        let Some(current) = self.current_server().cloned() else {
            return;
        };

        // Prefer the registered descriptor so its password and options apply
        let target = self
            .servers
            .iter()
            .find(|s| s.host == node.host && s.port == node.port)
            .cloned()
            .unwrap_or_else(|| Server {
                host: node.host.clone(),
                port: node.port,
                password: current.password.clone(),
                options: current.options.clone(),
            });

        match self.open(&target) {
            Ok(next) => {
                info!(from = %current.addr(), to = %target.addr(), "Switching to node producing most jobs");
                if let Some(mut previous) = self.active.take() {
                    previous.connection.close();
                }
                self.activate(next);
            }
            Err(err) => {
                warn!(to = %target.addr(), error = %err, "Failed to switch node, keeping current connection");
            }
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

/// Sends a command and decodes its reply.
fn run(connection: &mut dyn Connection, command: &dyn Command) -> Result<Reply> {
    let frame = connection.send(command.name(), command.arguments())?;
    Reply::decode(frame)
}

fn handshake(connection: &mut dyn Connection, server: &Server) -> Result<NodeInfo> {
    connection.connect()?;

    if let Some(password) = &server.password {
        let mut auth = Auth::new();
        auth.set_arguments(vec![json!(password)])?;
        match run(connection, &auth) {
            Ok(_) => {}
            Err(DisqueError::Server(message)) => return Err(DisqueError::Authentication(message)),
            Err(err) => return Err(err),
        }
    }

    let hello = Hello::new();
    let reply = run(connection, &hello)?;
    hello.parse(reply)?.into_hello("HELLO")
}

fn exhausted(count: usize, last_error: Option<DisqueError>) -> DisqueError {
    match last_error {
        Some(err) => DisqueError::Connection(format!(
            "No server available after trying {} server(s), last error: {}",
            count, err
        )),
        None => DisqueError::Connection("No server available".to_string()),
    }
}
