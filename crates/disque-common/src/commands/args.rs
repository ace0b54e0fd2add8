//! Argument validation shared by the command handlers.
//!
//! Handlers receive loosely typed `serde_json::Value` arguments and turn them
//! into the ordered string arguments that go on the wire. Every failure is an
//! `InvalidArgument` error naming the command.

use serde_json::{Map, Value};

use crate::protocol::error::{DisqueError, Result};
use crate::protocol::reply::render;

/// Shape of a recognized option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Non-negative integer, sent as `KEYWORD value`
    Integer,
    /// Boolean, sent as a bare `KEYWORD` when true
    Flag,
    /// Non-negative integer the handler places itself; validated only
    Positional,
}

/// A recognized option key and the wire keyword it maps to.
#[derive(Debug, Clone, Copy)]
pub struct OptionDef {
    pub key: &'static str,
    pub keyword: &'static str,
    pub kind: OptionKind,
}

impl OptionDef {
    pub const fn integer(key: &'static str, keyword: &'static str) -> Self {
        Self { key, keyword, kind: OptionKind::Integer }
    }

    pub const fn flag(key: &'static str, keyword: &'static str) -> Self {
        Self { key, keyword, kind: OptionKind::Flag }
    }

    pub const fn positional(key: &'static str) -> Self {
        Self { key, keyword: "", kind: OptionKind::Positional }
    }
}

/// Validates a non-empty text argument.
pub fn text(command: &str, value: &Value, what: &str) -> Result<String> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        other => Err(DisqueError::invalid_arguments(
            command,
            format!("{} must be a non-empty string, got {}", what, render(other)),
        )),
    }
}

/// Validates a non-negative integer argument.
pub fn integer(command: &str, value: &Value, what: &str) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        DisqueError::invalid_arguments(
            command,
            format!("{} must be a non-negative integer, got {}", what, render(value)),
        )
    })
}

/// Validates a list of one or more job IDs.
pub fn job_ids(command: &str, args: &[Value]) -> Result<Vec<String>> {
    if args.is_empty() {
        return Err(DisqueError::invalid_arguments(command, "at least one job ID is required"));
    }
    args.iter().map(|arg| text(command, arg, "job ID")).collect()
}

/// Checks the argument count is within `min..=max`.
pub fn arity(command: &str, args: &[Value], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(DisqueError::invalid_arguments(
            command,
            format!("expected {} arguments, got {}", expected, args.len()),
        ));
    }
    Ok(())
}

/// Validates an options map against the recognized keys and encodes it.
///
/// Options are emitted in the order of `defs`, not in map order, so the
/// encoded command is deterministic.
pub fn options(command: &str, value: &Value, defs: &[OptionDef]) -> Result<Vec<String>> {
    let map = as_options_map(command, value)?;

    if let Some(unknown) = map.keys().find(|k| !defs.iter().any(|s| s.key == k.as_str())) {
        return Err(DisqueError::invalid_arguments(
            command,
            format!("unrecognized option '{}' in {}", unknown, render(value)),
        ));
    }

    let mut encoded = Vec::new();
    for def in defs {
        let Some(option) = map.get(def.key) else {
            continue;
        };
        match def.kind {
            OptionKind::Integer | OptionKind::Positional => {
                let n = option.as_u64().ok_or_else(|| {
                    DisqueError::invalid_arguments(
                        command,
                        format!("option '{}' must be a non-negative integer in {}", def.key, render(value)),
                    )
                })?;
                if def.kind == OptionKind::Integer {
                    encoded.push(def.keyword.to_string());
                    encoded.push(n.to_string());
                }
            }
            OptionKind::Flag => {
                let on = option.as_bool().ok_or_else(|| {
                    DisqueError::invalid_arguments(
                        command,
                        format!("option '{}' must be a boolean in {}", def.key, render(value)),
                    )
                })?;
                if on {
                    encoded.push(def.keyword.to_string());
                }
            }
        }
    }
    Ok(encoded)
}

/// Reads one integer option without encoding it, for options that are
/// positional on the wire.
pub fn integer_option(command: &str, value: &Value, key: &str) -> Result<Option<u64>> {
    let map = as_options_map(command, value)?;
    match map.get(key) {
        None => Ok(None),
        Some(option) => option.as_u64().map(Some).ok_or_else(|| {
            DisqueError::invalid_arguments(
                command,
                format!("option '{}' must be a non-negative integer in {}", key, render(value)),
            )
        }),
    }
}

fn as_options_map<'a>(command: &str, value: &'a Value) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        DisqueError::invalid_arguments(
            command,
            format!("options must be a map, got {}", render(value)),
        )
    })
}
