use std::collections::{BTreeMap, HashMap};

use disque_common::commands::{self, Command, CommandArgs, CursorResult, JobData, NodeInfo, Response};
use disque_common::{DisqueError, Result};
use serde_json::{json, Value};
use tracing::debug;

use crate::manager::{Manager, ManagerConfig};
use crate::queue::{Queue, QueueState};
use crate::server::{parse_servers, Server};

/// Disque client.
///
/// Commands are looked up by name in a registry pre-populated with every
/// built-in handler, then run through the connection [`Manager`]. The typed
/// methods (`add_job`, `get_job`, ...) are thin wrappers over
/// [`invoke`](Self::invoke).
///
/// A client owns a single connection and is driven through `&mut self`;
/// concurrent workers each create their own.
pub struct Client {
    manager: Manager,
    commands: HashMap<String, Box<dyn Command>>,
    queues: HashMap<String, QueueState>,
}

impl Client {
    /// Creates a client for the given `host` / `host:port` addresses.
    /// Malformed entries are skipped.
    pub fn new<S: AsRef<str>>(servers: &[S]) -> Self {
        let mut client = Self::with_manager(Manager::new(ManagerConfig::default()));
        for server in parse_servers(servers) {
            let addr = server.addr();
            if let Err(err) = client.manager.add_server(server) {
                debug!(addr = %addr, error = %err, "Skipped server");
            }
        }
        client
    }

    pub fn with_manager(manager: Manager) -> Self {
        let commands = commands::builtin()
            .into_iter()
            .map(|command| (command.name().to_string(), command))
            .collect();
        Self {
            manager,
            commands,
            queues: HashMap::new(),
        }
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut Manager {
        &mut self.manager
    }

    pub fn add_server(&mut self, server: Server) -> Result<()> {
        self.manager.add_server(server)
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn connect(&mut self) -> Result<NodeInfo> {
        self.manager.connect()
    }

    /// Adds a handler, replacing any handler with the same name.
    pub fn register_command(&mut self, command: Box<dyn Command>) {
        let name = command.name().to_uppercase();
        debug!(command = %name, "Registered command");
        self.commands.insert(name, command);
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_uppercase())
    }

    /// Runs a command by name.
    ///
    /// # Errors
    ///
    /// - `UnknownCommand` when no handler is registered under `name`
    /// - `InvalidArgument` when the handler rejects `args`
    /// - whatever executing and parsing the reply fails with
    pub fn invoke(&mut self, name: &str, args: CommandArgs) -> Result<Response> {
        let name = name.to_uppercase();
        let command = self
            .commands
            .get_mut(&name)
            .ok_or_else(|| DisqueError::UnknownCommand(name.clone()))?;

        command.set_arguments(args)?;
        let reply = self.manager.execute(&**command)?;
        command.parse(reply)
    }

    /// Handle on a queue. Settings made through it (job factory, time zone)
    /// are kept for later handles on the same name.
    pub fn queue(&mut self, name: &str) -> Queue<'_> {
        self.queue_state(name);
        Queue::new(self, name)
    }

    pub(crate) fn queue_state(&mut self, name: &str) -> &mut QueueState {
        self.queues.entry(name.to_string()).or_default()
    }

    pub fn ack_job(&mut self, ids: &[&str]) -> Result<i64> {
        self.invoke("ACKJOB", id_args(ids))?.into_integer("ACKJOB")
    }

    /// Returns the ID assigned to the new job.
    pub fn add_job(&mut self, queue: &str, payload: &str, options: Option<Value>) -> Result<String> {
        let mut args = vec![json!(queue), json!(payload)];
        args.extend(options);
        self.invoke("ADDJOB", args)?.into_text("ADDJOB")
    }

    pub fn del_job(&mut self, ids: &[&str]) -> Result<i64> {
        self.invoke("DELJOB", id_args(ids))?.into_integer("DELJOB")
    }

    pub fn dequeue(&mut self, ids: &[&str]) -> Result<i64> {
        self.invoke("DEQUEUE", id_args(ids))?.into_integer("DEQUEUE")
    }

    pub fn enqueue(&mut self, ids: &[&str]) -> Result<i64> {
        self.invoke("ENQUEUE", id_args(ids))?.into_integer("ENQUEUE")
    }

    pub fn fast_ack(&mut self, ids: &[&str]) -> Result<i64> {
        self.invoke("FASTACK", id_args(ids))?.into_integer("FASTACK")
    }

    pub fn get_job(&mut self, queues: &[&str], options: Option<Value>) -> Result<Vec<JobData>> {
        let mut args: CommandArgs = queues.iter().map(|queue| json!(queue)).collect();
        args.extend(options);
        self.invoke("GETJOB", args)?.into_jobs("GETJOB")
    }

    pub fn hello(&mut self) -> Result<NodeInfo> {
        self.invoke("HELLO", Vec::new())?.into_hello("HELLO")
    }

    pub fn info(&mut self) -> Result<String> {
        self.invoke("INFO", Vec::new())?.into_text("INFO")
    }

    pub fn nack(&mut self, ids: &[&str]) -> Result<i64> {
        self.invoke("NACK", id_args(ids))?.into_integer("NACK")
    }

    pub fn qlen(&mut self, queue: &str) -> Result<i64> {
        self.invoke("QLEN", vec![json!(queue)])?.into_integer("QLEN")
    }

    pub fn qpeek(&mut self, queue: &str, count: i64) -> Result<Vec<JobData>> {
        self.invoke("QPEEK", vec![json!(queue), json!(count)])?.into_jobs("QPEEK")
    }

    pub fn qscan(&mut self, cursor: u64, options: Option<Value>) -> Result<CursorResult> {
        let mut args = vec![json!(cursor)];
        args.extend(options);
        self.invoke("QSCAN", args)?.into_cursor("QSCAN")
    }

    /// Job details, or `None` when the node does not know the job.
    pub fn show(&mut self, id: &str) -> Result<Option<BTreeMap<String, Value>>> {
        self.invoke("SHOW", vec![json!(id)])?.into_details("SHOW")
    }

    pub fn working(&mut self, id: &str) -> Result<i64> {
        self.invoke("WORKING", vec![json!(id)])?.into_integer("WORKING")
    }
}

fn id_args(ids: &[&str]) -> CommandArgs {
    ids.iter().map(|id| json!(id)).collect()
}
