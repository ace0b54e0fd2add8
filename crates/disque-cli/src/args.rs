//! Conversions from command-line strings to command arguments.

use serde_json::{json, Map, Value};

/// Reads each raw argument as JSON, falling back to a plain string when it
/// does not parse. `0` becomes a number and `{"count":10}` an object, while
/// `jobs` stays the string `"jobs"`. Quote a value (`'"10"'`) to force a
/// string.
pub fn call_arguments(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|arg| serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.clone())))
        .collect()
}

/// ADDJOB options as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOptions {
    pub timeout: Option<u64>,
    pub replicate: Option<u64>,
    pub delay: Option<u64>,
    pub retry: Option<u64>,
    pub ttl: Option<u64>,
    pub maxlen: Option<u64>,
    pub asynchronous: bool,
}

/// The options object ADDJOB expects, or `None` when nothing was set.
pub fn job_options(options: &JobOptions) -> Option<Value> {
    let mut object = Map::new();
    let numbers = [
        ("timeout", options.timeout),
        ("replicate", options.replicate),
        ("delay", options.delay),
        ("retry", options.retry),
        ("ttl", options.ttl),
        ("maxlen", options.maxlen),
    ];
    for (key, value) in numbers {
        if let Some(value) = value {
            object.insert(key.to_string(), json!(value));
        }
    }
    if options.asynchronous {
        object.insert("async".to_string(), json!(true));
    }

    if object.is_empty() {
        None
    } else {
        Some(Value::Object(object))
    }
}
