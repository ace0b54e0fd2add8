//! Scripted in-memory Disque cluster for client tests.
//!
//! Every node answers AUTH and HELLO on its own; any other command gets the
//! next reply queued for that node. All requests are logged per address so
//! tests can assert which node saw what.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use disque_client::{Client, Manager, ManagerConfig, Server};
use disque_common::transport::{Connection, RespFrame};
use disque_common::{DisqueError, Result};

pub const HOST: &str = "127.0.0.1";

// ============================================================================
// Cluster State
// ============================================================================

pub struct MockNode {
    pub id: String,
    pub port: u16,
    /// Connecting fails when false
    pub reachable: bool,
    /// Commands other than AUTH / HELLO fail at the transport level when true
    pub broken: bool,
    pub password: Option<String>,
    pub replies: VecDeque<RespFrame>,
}

#[derive(Default)]
pub struct Cluster {
    pub nodes: Vec<MockNode>,
    /// (port, command, arguments) for every request received
    pub log: Vec<(u16, String, Vec<String>)>,
}

pub type SharedCluster = Rc<RefCell<Cluster>>;

impl Cluster {
    /// Nodes `aaaaaaaa...`, `bbbbbbbb...`, ... listening on 7001, 7002, ...
    pub fn with_nodes(count: usize) -> SharedCluster {
        let nodes = (0..count)
            .map(|i| {
                let letter = (b'a' + i as u8) as char;
                MockNode {
                    id: format!("{}{}", letter.to_string().repeat(8), "0123456789abcdef"),
                    port: 7001 + i as u16,
                    reachable: true,
                    broken: false,
                    password: None,
                    replies: VecDeque::new(),
                }
            })
            .collect();
        Rc::new(RefCell::new(Cluster { nodes, log: Vec::new() }))
    }

    pub fn node_mut(&mut self, port: u16) -> &mut MockNode {
        self.nodes.iter_mut().find(|n| n.port == port).expect("unknown mock node")
    }

    pub fn node_id(&self, port: u16) -> String {
        self.nodes.iter().find(|n| n.port == port).expect("unknown mock node").id.clone()
    }

    pub fn queue_reply(&mut self, port: u16, reply: RespFrame) {
        self.node_mut(port).replies.push_back(reply);
    }

    /// Commands received by one node, in order.
    pub fn commands_on(&self, port: u16) -> Vec<String> {
        self.log
            .iter()
            .filter(|(p, _, _)| *p == port)
            .map(|(_, command, _)| command.clone())
            .collect()
    }

    /// Arguments of the last request for `command`, on any node.
    pub fn last_args(&self, command: &str) -> Option<Vec<String>> {
        self.log
            .iter()
            .rev()
            .find(|(_, c, _)| c == command)
            .map(|(_, _, args)| args.clone())
    }

    fn hello(&self, port: u16) -> RespFrame {
        let mut items = vec![RespFrame::Integer(1), RespFrame::bulk(self.node_id(port))];
        for node in &self.nodes {
            items.push(RespFrame::array(vec![
                RespFrame::bulk(node.id.clone()),
                RespFrame::bulk(HOST),
                RespFrame::bulk(node.port.to_string()),
                RespFrame::bulk("1"),
            ]));
        }
        RespFrame::array(items)
    }
}

// ============================================================================
// Mock Connection
// ============================================================================

pub struct MockConnection {
    port: u16,
    cluster: SharedCluster,
    connected: bool,
    authenticated: bool,
}

impl Connection for MockConnection {
    fn connect(&mut self) -> Result<()> {
        let cluster = self.cluster.borrow();
        let node = cluster.nodes.iter().find(|n| n.port == self.port);
        match node {
            Some(node) if node.reachable => {
                self.connected = true;
                Ok(())
            }
            _ => Err(DisqueError::Connection(format!("connection refused on {}", self.port))),
        }
    }

    fn send(&mut self, command: &str, args: &[String]) -> Result<RespFrame> {
        if !self.connected {
            return Err(DisqueError::Connection("not connected".to_string()));
        }
        let mut cluster = self.cluster.borrow_mut();
        cluster.log.push((self.port, command.to_string(), args.to_vec()));

        let password = cluster.node_mut(self.port).password.clone();
        match command {
            "AUTH" => {
                if password.as_deref() == args.first().map(String::as_str) {
                    self.authenticated = true;
                    Ok(RespFrame::Status("OK".to_string()))
                } else {
                    Ok(RespFrame::Error("ERR invalid password".to_string()))
                }
            }
            _ if password.is_some() && !self.authenticated => {
                Ok(RespFrame::Error("NOAUTH Authentication required.".to_string()))
            }
            "HELLO" => Ok(cluster.hello(self.port)),
            _ => {
                let node = cluster.node_mut(self.port);
                if node.broken {
                    self.connected = false;
                    return Err(DisqueError::Connection("connection reset by peer".to_string()));
                }
                Ok(node
                    .replies
                    .pop_front()
                    .unwrap_or_else(|| RespFrame::Error(format!("ERR no scripted reply for {}", command))))
            }
        }
    }

    fn close(&mut self) {
        self.connected = false;
        self.authenticated = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// A manager wired to the mock cluster, with one registered server per port.
pub fn manager(cluster: &SharedCluster, ports: &[u16], config: ManagerConfig) -> Manager {
    let mut manager = Manager::new(config);
    for port in ports {
        manager.add_server(Server::new(HOST, *port)).unwrap();
    }
    let cluster = cluster.clone();
    manager.set_connection_factory(move |server: &Server| -> Box<dyn Connection> {
        Box::new(MockConnection {
            port: server.port,
            cluster: cluster.clone(),
            connected: false,
            authenticated: false,
        })
    });
    manager
}

pub fn client(cluster: &SharedCluster, ports: &[u16]) -> Client {
    Client::with_manager(manager(cluster, ports, ManagerConfig::default()))
}

/// A job entry as GETJOB returns it.
pub fn job_frame(queue: &str, id: &str, body: &str) -> RespFrame {
    RespFrame::array(vec![RespFrame::bulk(queue), RespFrame::bulk(id), RespFrame::bulk(body)])
}

/// Job ID that names the node with the given ID as its producer.
pub fn job_id_from(node_id: &str, n: u32) -> String {
    format!("D-{}-{:08}-05a1", &node_id[..8], n)
}
