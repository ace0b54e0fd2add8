use std::io::BufRead;

use crate::protocol::error::{DisqueError, Result};

/// Largest bulk string or array the decoder accepts (512 MB).
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Deepest array nesting the decoder accepts.
pub const MAX_NESTING_DEPTH: usize = 64;

/// A raw reply frame as it arrives on the wire.
///
/// Disque speaks RESP: every reply is one of these five frame kinds, and
/// arrays nest arbitrarily. Null bulk strings and null arrays (`$-1`, `*-1`)
/// are represented with `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespFrame {
    /// `+OK`
    Status(String),
    /// `-ERR something`
    Error(String),
    /// `:42`
    Integer(i64),
    /// `$3\r\nfoo`
    Bulk(Option<Vec<u8>>),
    /// `*2\r\n...`
    Array(Option<Vec<RespFrame>>),
}

impl RespFrame {
    /// Convenience constructor for a non-null bulk string.
    pub fn bulk(value: impl Into<Vec<u8>>) -> Self {
        RespFrame::Bulk(Some(value.into()))
    }

    /// Convenience constructor for a non-null array.
    pub fn array(items: Vec<RespFrame>) -> Self {
        RespFrame::Array(Some(items))
    }
}

/// RESP codec for Disque requests and replies.
///
/// Requests always go out as an array of bulk strings, the command name
/// first:
///
/// ```text
/// *3\r\n$6\r\nACKJOB\r\n$2\r\nid\r\n...
/// ```
///
/// # Example
///
/// ```
/// use disque_common::transport::{RespCodec, RespFrame};
///
/// let encoded = RespCodec::encode_command("QLEN", &["jobs".to_string()]);
/// assert_eq!(encoded, b"*2\r\n$4\r\nQLEN\r\n$4\r\njobs\r\n".to_vec());
///
/// let mut reader = &b":3\r\n"[..];
/// assert_eq!(RespCodec::decode_frame(&mut reader).unwrap(), RespFrame::Integer(3));
/// ```
pub struct RespCodec;

impl RespCodec {
    /// Encodes a command and its arguments as a RESP array of bulk strings.
    pub fn encode_command(name: &str, args: &[String]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16 + name.len() + args.iter().map(|a| a.len() + 16).sum::<usize>());
        buf.extend_from_slice(format!("*{}\r\n", args.len() + 1).as_bytes());
        Self::write_bulk(&mut buf, name.as_bytes());
        for arg in args {
            Self::write_bulk(&mut buf, arg.as_bytes());
        }
        buf
    }

    /// Encodes a reply frame, the way a node writes it.
    pub fn encode_frame(frame: &RespFrame) -> Vec<u8> {
        let mut buf = Vec::new();
        Self::write_frame(&mut buf, frame);
        buf
    }

    fn write_frame(buf: &mut Vec<u8>, frame: &RespFrame) {
        match frame {
            RespFrame::Status(text) => buf.extend_from_slice(format!("+{}\r\n", text).as_bytes()),
            RespFrame::Error(text) => buf.extend_from_slice(format!("-{}\r\n", text).as_bytes()),
            RespFrame::Integer(n) => buf.extend_from_slice(format!(":{}\r\n", n).as_bytes()),
            RespFrame::Bulk(Some(data)) => Self::write_bulk(buf, data),
            RespFrame::Bulk(None) => buf.extend_from_slice(b"$-1\r\n"),
            RespFrame::Array(None) => buf.extend_from_slice(b"*-1\r\n"),
            RespFrame::Array(Some(items)) => {
                buf.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    Self::write_frame(buf, item);
                }
            }
        }
    }

    fn write_bulk(buf: &mut Vec<u8>, data: &[u8]) {
        buf.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
        buf.extend_from_slice(data);
        buf.extend_from_slice(b"\r\n");
    }

    /// Reads exactly one frame (including nested arrays) from the reader.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the reader fails or hits EOF, and `Connection` when
    /// the bytes are not valid RESP (the stream can no longer be trusted).
    pub fn decode_frame<R: BufRead>(reader: &mut R) -> Result<RespFrame> {
        Self::decode_nested(reader, 0)
    }

    fn decode_nested<R: BufRead>(reader: &mut R, depth: usize) -> Result<RespFrame> {
        let line = Self::read_line(reader)?;
        let (marker, rest) = match line.split_first() {
            Some((marker, rest)) => (*marker, rest),
            None => return Err(Self::protocol_error("empty line")),
        };

        match marker {
            b'+' => Ok(RespFrame::Status(String::from_utf8_lossy(rest).into_owned())),
            b'-' => Ok(RespFrame::Error(String::from_utf8_lossy(rest).into_owned())),
            b':' => Ok(RespFrame::Integer(Self::parse_int(rest)?)),
            b'$' => {
                let len = Self::parse_int(rest)?;
                if len < 0 {
                    return Ok(RespFrame::Bulk(None));
                }
                let len = Self::checked_len(len)?;
                let mut data = vec![0u8; len + 2];
                reader.read_exact(&mut data)?;
                if &data[len..] != b"\r\n" {
                    return Err(Self::protocol_error("bulk string not terminated by CRLF"));
                }
                data.truncate(len);
                Ok(RespFrame::Bulk(Some(data)))
            }
            b'*' => {
                let len = Self::parse_int(rest)?;
                if len < 0 {
                    return Ok(RespFrame::Array(None));
                }
                if depth >= MAX_NESTING_DEPTH {
                    return Err(Self::protocol_error(format!(
                        "arrays nested deeper than {}",
                        MAX_NESTING_DEPTH
                    )));
                }
                let len = Self::checked_len(len)?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(Self::decode_nested(reader, depth + 1)?);
                }
                Ok(RespFrame::Array(Some(items)))
            }
            other => Err(Self::protocol_error(format!(
                "unexpected frame marker {:?}",
                other as char
            ))),
        }
    }

    fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            return Err(DisqueError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            )));
        }
        if !line.ends_with(b"\r\n") {
            return Err(Self::protocol_error("line not terminated by CRLF"));
        }
        line.truncate(line.len() - 2);
        Ok(line)
    }

    fn parse_int(raw: &[u8]) -> Result<i64> {
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| {
                Self::protocol_error(format!("invalid integer {:?}", String::from_utf8_lossy(raw)))
            })
    }

    fn checked_len(len: i64) -> Result<usize> {
        let len = len as usize;
        if len > MAX_BULK_LEN {
            return Err(Self::protocol_error(format!(
                "frame too large: {} (max {})",
                len, MAX_BULK_LEN
            )));
        }
        Ok(len)
    }

    fn protocol_error(reason: impl std::fmt::Display) -> DisqueError {
        DisqueError::Connection(format!("Protocol error: {}", reason))
    }
}
