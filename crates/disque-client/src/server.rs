use std::net::Ipv6Addr;

use disque_common::transport::ConnectionOptions;
use disque_common::{DisqueError, Result};

/// Port Disque listens on when an address does not name one.
pub const DEFAULT_PORT: u16 = 7711;

/// A node the client may connect to.
///
/// Two descriptors are the same server when host and port match; password
/// and options do not take part in identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub options: ConnectionOptions,
}

impl Server {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password: None,
            options: ConnectionOptions::default(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// `host:port`, bracketing IPv6 hosts.
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn same_identity(&self, other: &Server) -> bool {
        self.host == other.host && self.port == other.port
    }

    /// Rejects descriptors that can never be connected to.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(DisqueError::InvalidArgument("server host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(DisqueError::InvalidArgument(format!(
                "server port must be positive, got 0 for {}",
                self.host
            )));
        }
        Ok(())
    }
}

/// Parses `host`, `host:port` or `[v6]:port`.
///
/// Returns `None` for empty hosts, unparsable or zero ports.
///
/// ```
/// use disque_client::server::parse_server_address;
///
/// assert_eq!(parse_server_address("10.0.0.1"), Some(("10.0.0.1".to_string(), 7711)));
/// assert_eq!(parse_server_address("node:7712"), Some(("node".to_string(), 7712)));
/// assert_eq!(parse_server_address("[::1]:7713"), Some(("::1".to_string(), 7713)));
/// assert_eq!(parse_server_address(":7711"), None);
/// ```
pub fn parse_server_address(addr: &str) -> Option<(String, u16)> {
    let addr = addr.trim();

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        host.parse::<Ipv6Addr>().ok()?;
        match tail {
            "" => (host, None),
            _ => (host, Some(tail.strip_prefix(':')?)),
        }
    } else {
        match addr.matches(':').count() {
            0 => (addr, None),
            1 => addr.split_once(':').map(|(h, p)| (h, Some(p)))?,
            // Bare IPv6 address without a port
            _ => {
                addr.parse::<Ipv6Addr>().ok()?;
                (addr, None)
            }
        }
    };

    if host.is_empty() {
        return None;
    }
    let port = match port {
        None => DEFAULT_PORT,
        Some(port) => port.parse::<u16>().ok().filter(|p| *p > 0)?,
    };
    Some((host.to_string(), port))
}

/// Parses a list of addresses, silently skipping malformed entries.
pub fn parse_servers<S: AsRef<str>>(addrs: &[S]) -> Vec<Server> {
    addrs
        .iter()
        .filter_map(|addr| parse_server_address(addr.as_ref()))
        .map(|(host, port)| Server::new(host, port))
        .collect()
}
