use std::io::{BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use tracing::debug;

use crate::protocol::error::{DisqueError, Result};
use crate::transport::codec::{RespCodec, RespFrame};
use crate::transport::{Connection, ConnectionOptions};

/// Blocking TCP link to a single Disque node.
///
/// # Wire Protocol
///
/// Each request is written as one RESP array and exactly one reply frame is
/// read back before `send` returns, so the link never has more than one
/// request in flight.
///
/// # Example
///
/// ```no_run
/// use disque_common::transport::{Connection, ConnectionOptions, TcpConnection};
///
/// let mut conn = TcpConnection::new("127.0.0.1", 7711, ConnectionOptions::default());
/// conn.connect().unwrap();
/// let hello = conn.send("HELLO", &[]).unwrap();
/// conn.close();
/// ```
pub struct TcpConnection {
    host: String,
    port: u16,
    options: ConnectionOptions,
    stream: Option<BufReader<TcpStream>>,
}

impl TcpConnection {
    /// Creates an unconnected link; nothing touches the network until
    /// [`Connection::connect`] is called.
    pub fn new(host: impl Into<String>, port: u16, options: ConnectionOptions) -> Self {
        Self {
            host: host.into(),
            port,
            options,
            stream: None,
        }
    }

    /// `host:port` of the remote node.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn open(&self) -> Result<TcpStream> {
        let addr = self.addr();
        let socket_addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| DisqueError::Connection(format!("Invalid address '{}': {}", addr, e)))?;

        // Try each resolved address until one succeeds
        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect_timeout(&socket_addr, self.options.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(self.options.read_timeout).map_err(|e| {
                        DisqueError::Connection(format!("Failed to set read timeout: {}", e))
                    })?;
                    stream.set_write_timeout(self.options.write_timeout).map_err(|e| {
                        DisqueError::Connection(format!("Failed to set write timeout: {}", e))
                    })?;
                    stream.set_nodelay(true).map_err(|e| {
                        DisqueError::Connection(format!("Failed to set TCP_NODELAY: {}", e))
                    })?;
                    return Ok(stream);
                }
                Err(e) => {
                    last_err = Some(e);
                }
            }
        }

        Err(DisqueError::Connection(format!(
            "Failed to connect to {}: {}",
            addr,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no address resolved".to_string())
        )))
    }

    fn round_trip(&mut self, command: &str, args: &[String]) -> Result<RespFrame> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| DisqueError::Connection("not connected".to_string()))?;

        let encoded = RespCodec::encode_command(command, args);
        stream
            .get_mut()
            .write_all(&encoded)
            .map_err(|e| map_io_error(e, "writing request", &self.options))?;
        stream
            .get_mut()
            .flush()
            .map_err(|e| map_io_error(e, "flushing stream", &self.options))?;

        RespCodec::decode_frame(stream).map_err(|e| match e {
            DisqueError::Io(io) => map_io_error(io, "reading reply", &self.options),
            other => other,
        })
    }
}

impl Connection for TcpConnection {
    fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = self.open()?;
        debug!(addr = %self.addr(), "Connected to Disque node");
        self.stream = Some(BufReader::new(stream));
        Ok(())
    }

    fn send(&mut self, command: &str, args: &[String]) -> Result<RespFrame> {
        let result = self.round_trip(command, args);
        if let Err(e) = &result {
            if e.is_transport() {
                // The stream may hold a half-read reply; it is unusable now.
                self.close();
            }
        }
        result
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.get_ref().shutdown(Shutdown::Both);
            debug!(addr = %self.addr(), "Closed connection to Disque node");
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map IO errors to appropriate DisqueError variants
///
/// - Timeouts/would block -> `Timeout`
/// - Connection errors -> `Connection`
/// - Other IO errors -> `Io`
fn map_io_error(err: std::io::Error, context: &str, options: &ConnectionOptions) -> DisqueError {
    match err.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => DisqueError::Timeout(
            options
                .read_timeout
                .or(options.write_timeout)
                .map(|t| t.as_millis() as u64)
                .unwrap_or(0),
        ),
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::NotConnected => {
            DisqueError::Connection(format!("{}: Connection lost", context))
        }
        _ => DisqueError::Io(err),
    }
}
