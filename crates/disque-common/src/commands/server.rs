//! Node-level commands: HELLO, INFO and AUTH.

use serde::Serialize;

use super::args;
use super::{invalid_response, Command, CommandArgs, Response};
use crate::protocol::error::Result;
use crate::protocol::reply::Reply;

/// A cluster member as advertised in a HELLO reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterNode {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub priority: i64,
}

impl ClusterNode {
    /// First eight characters of the node ID, as embedded in job IDs.
    pub fn prefix(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Handshake metadata returned by HELLO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub version: i64,
    /// ID of the node that answered
    pub id: String,
    pub nodes: Vec<ClusterNode>,
}

fn number(reply: &Reply) -> Option<i64> {
    match reply {
        Reply::Integer(n) => Some(*n),
        Reply::Text(text) => text.parse().ok(),
        _ => None,
    }
}

fn parse_node(reply: &Reply) -> Option<ClusterNode> {
    match reply.as_sequence()? {
        [id, host, port, priority] => Some(ClusterNode {
            id: id.as_text()?.to_string(),
            host: host.as_text()?.to_string(),
            port: u16::try_from(number(port)?).ok()?,
            priority: number(priority)?,
        }),
        _ => None,
    }
}

fn parse_hello(reply: &Reply) -> Option<NodeInfo> {
    let [version, id, nodes @ ..] = reply.as_sequence()? else {
        return None;
    };
    Some(NodeInfo {
        version: version.as_integer()?,
        id: id.as_text()?.to_string(),
        nodes: nodes.iter().map(parse_node).collect::<Option<Vec<_>>>()?,
    })
}

/// HELLO: handshake. Answers with the protocol version, the ID of the node
/// and the cluster members it knows about.
#[derive(Debug, Clone, Default)]
pub struct Hello {
    arguments: Vec<String>,
}

impl Hello {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for Hello {
    fn name(&self) -> &str {
        "HELLO"
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        args::arity("HELLO", &args, 0, 0)
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        parse_hello(&reply)
            .map(Response::Hello)
            .ok_or_else(|| invalid_response("HELLO", &reply))
    }
}

/// INFO: free-form server information.
#[derive(Debug, Clone, Default)]
pub struct Info {
    arguments: Vec<String>,
}

impl Info {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for Info {
    fn name(&self) -> &str {
        "INFO"
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        args::arity("INFO", &args, 0, 0)
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        match reply {
            Reply::Text(text) => Ok(Response::Text(text)),
            other => Err(invalid_response("INFO", &other)),
        }
    }
}

/// AUTH: authenticate the connection. Issued by the connection manager
/// before the handshake when a server has a password.
#[derive(Debug, Clone, Default)]
pub struct Auth {
    arguments: Vec<String>,
}

impl Auth {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for Auth {
    fn name(&self) -> &str {
        "AUTH"
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        args::arity("AUTH", &args, 1, 1)?;
        self.arguments = vec![args::text("AUTH", &args[0], "password")?];
        Ok(())
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        match reply {
            Reply::Text(text) => Ok(Response::Text(text)),
            other => Err(invalid_response("AUTH", &other)),
        }
    }
}
