//! Decoded Reply Types
//!
//! Every raw frame coming off a transport is decoded exactly once into a
//! [`Reply`], and command handlers only ever pattern-match on that type.

use serde_json::Value;

use super::error::{DisqueError, Result};
use crate::transport::RespFrame;

/// A decoded broker reply.
///
/// Status and bulk strings both become [`Reply::Text`]; null bulk strings and
/// null arrays become [`Reply::Nil`]. Error frames never become a `Reply`:
/// they are turned into errors by [`Reply::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Integer(i64),
    Text(String),
    Sequence(Vec<Reply>),
    Nil,
}

impl Reply {
    /// Decodes a raw transport frame.
    ///
    /// # Errors
    ///
    /// - `Authentication` for `NOAUTH` / `WRONGPASS` error replies
    /// - `Server` for any other error reply
    pub fn decode(frame: RespFrame) -> Result<Reply> {
        match frame {
            RespFrame::Status(text) => Ok(Reply::Text(text)),
            RespFrame::Integer(n) => Ok(Reply::Integer(n)),
            RespFrame::Bulk(Some(bytes)) => Ok(Reply::Text(String::from_utf8_lossy(&bytes).into_owned())),
            RespFrame::Bulk(None) | RespFrame::Array(None) => Ok(Reply::Nil),
            RespFrame::Array(Some(items)) => items
                .into_iter()
                .map(Reply::decode)
                .collect::<Result<Vec<_>>>()
                .map(Reply::Sequence),
            RespFrame::Error(message) => {
                if message.starts_with("NOAUTH") || message.starts_with("WRONGPASS") {
                    Err(DisqueError::Authentication(message))
                } else {
                    Err(DisqueError::Server(message))
                }
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Reply]> {
        match self {
            Reply::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// JSON view of the reply, used for rendering and for the CLI.
    pub fn to_json(&self) -> Value {
        match self {
            Reply::Integer(n) => Value::from(*n),
            Reply::Text(text) => Value::String(text.clone()),
            Reply::Sequence(items) => Value::Array(items.iter().map(Reply::to_json).collect()),
            Reply::Nil => Value::Null,
        }
    }

    /// Canonical single-line rendering used in error messages.
    ///
    /// ```
    /// use disque_common::Reply;
    ///
    /// let reply = Reply::Sequence(vec![Reply::from("10"), Reply::Integer(3)]);
    /// assert_eq!(reply.render(), r#"["10",3]"#);
    /// ```
    pub fn render(&self) -> String {
        render(&self.to_json())
    }
}

/// Renders a value canonically: numbers bare, strings quoted, sequences as
/// `[a,b]`, maps as `{"k":v}` ordered by key.
///
/// `serde_json` is built without `preserve_order`, so object keys always come
/// out sorted and the output is stable across runs.
pub fn render(value: &Value) -> String {
    value.to_string()
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<i64> for Reply {
    fn from(n: i64) -> Self {
        Reply::Integer(n)
    }
}

impl From<Vec<Reply>> for Reply {
    fn from(items: Vec<Reply>) -> Self {
        Reply::Sequence(items)
    }
}
