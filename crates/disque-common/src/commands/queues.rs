//! Queue-level commands (QLEN, QSCAN) and the cursor reply parser.

use serde::Serialize;
use serde_json::Value;

use super::args::{self, OptionDef};
use super::{invalid_response, Command, CommandArgs, Response};
use crate::protocol::error::{DisqueError, Result};
use crate::protocol::reply::Reply;

const QSCAN_OPTIONS: &[OptionDef] = &[
    OptionDef::integer("count", "COUNT"),
    OptionDef::flag("busyloop", "BUSYLOOP"),
    OptionDef::integer("minlen", "MINLEN"),
    OptionDef::integer("maxlen", "MAXLEN"),
    OptionDef::integer("importrate", "IMPORTRATE"),
];

/// One page of a cursor-based scan.
///
/// `finished` is true exactly when `next_cursor` is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CursorResult {
    pub finished: bool,
    pub next_cursor: u64,
    pub queues: Vec<String>,
}

/// Parses a `[cursor, [item, ...]]` reply.
///
/// Checks run in a fixed order and the first violation wins:
///
/// 1. the reply is a sequence
/// 2. it has exactly two entries
/// 3. neither entry is nil
/// 4. the first entry is numeric text
/// 5. the second entry is a sequence of text
///
/// Every failure is an `InvalidResponse` naming `command` and carrying the
/// rendering of the whole reply.
///
/// ```
/// use disque_common::commands::parse_cursor;
/// use disque_common::Reply;
///
/// let reply = Reply::Sequence(vec![Reply::from("1"), Reply::Sequence(vec![Reply::from("q")])]);
/// let page = parse_cursor("QSCAN", reply).unwrap();
/// assert!(!page.finished);
/// assert_eq!(page.next_cursor, 1);
/// assert_eq!(page.queues, vec!["q"]);
/// ```
pub fn parse_cursor(command: &str, reply: Reply) -> Result<CursorResult> {
    let fail = |reply: &Reply| invalid_response(command, reply);

    let Some(entries) = reply.as_sequence() else {
        return Err(fail(&reply));
    };
    if entries.len() != 2 {
        return Err(fail(&reply));
    }
    if entries[0].is_nil() || entries[1].is_nil() {
        return Err(fail(&reply));
    }
    let next_cursor = entries[0]
        .as_text()
        .and_then(|cursor| cursor.parse::<u64>().ok())
        .ok_or_else(|| fail(&reply))?;
    let queues = entries[1]
        .as_sequence()
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_text().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| fail(&reply))?;

    Ok(CursorResult {
        finished: next_cursor == 0,
        next_cursor,
        queues,
    })
}

/// QLEN: number of jobs queued in a queue.
#[derive(Debug, Clone, Default)]
pub struct QLen {
    arguments: Vec<String>,
}

impl QLen {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for QLen {
    fn name(&self) -> &str {
        "QLEN"
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        args::arity("QLEN", &args, 1, 1)?;
        self.arguments = vec![args::text("QLEN", &args[0], "queue name")?];
        Ok(())
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        match reply {
            Reply::Integer(n) => Ok(Response::Integer(n)),
            other => Err(invalid_response("QLEN", &other)),
        }
    }
}

/// QSCAN: iterate over the queues known to a node.
///
/// Accepts no arguments, a cursor, an options map, or a cursor followed by an
/// options map (`count`, `busyloop`, `minlen`, `maxlen`, `importrate`). The
/// cursor defaults to 0, which starts a new iteration.
#[derive(Debug, Clone, Default)]
pub struct QScan {
    arguments: Vec<String>,
}

impl QScan {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for QScan {
    fn name(&self) -> &str {
        "QSCAN"
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        args::arity("QSCAN", &args, 0, 2)?;

        let (cursor, options) = match args.as_slice() {
            [] => (0, None),
            [options @ Value::Object(_)] => (0, Some(options)),
            [cursor] => (args::integer("QSCAN", cursor, "cursor")?, None),
            [cursor, options] => (args::integer("QSCAN", cursor, "cursor")?, Some(options)),
            _ => {
                return Err(DisqueError::invalid_arguments("QSCAN", "too many arguments"));
            }
        };

        let mut arguments = vec![cursor.to_string()];
        if let Some(options) = options {
            arguments.extend(args::options("QSCAN", options, QSCAN_OPTIONS)?);
        }
        self.arguments = arguments;
        Ok(())
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        parse_cursor("QSCAN", reply).map(Response::Cursor)
    }
}
