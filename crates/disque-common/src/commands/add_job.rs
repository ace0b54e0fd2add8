use serde_json::Value;

use super::args::{self, OptionDef};
use super::{invalid_response, Command, CommandArgs, Response};
use crate::protocol::error::{DisqueError, Result};
use crate::protocol::reply::{render, Reply};

const OPTIONS: &[OptionDef] = &[
    OptionDef::positional("timeout"),
    OptionDef::integer("replicate", "REPLICATE"),
    OptionDef::integer("delay", "DELAY"),
    OptionDef::integer("retry", "RETRY"),
    OptionDef::integer("ttl", "TTL"),
    OptionDef::integer("maxlen", "MAXLEN"),
    OptionDef::flag("async", "ASYNC"),
];

/// ADDJOB: push a job into a queue.
///
/// Arguments: `queue`, `payload`, and an optional options map with keys
/// `timeout` (milliseconds to wait for replication, default 0), `replicate`,
/// `delay`, `retry`, `ttl`, `maxlen` and `async`. Answers with the ID the
/// broker assigned.
///
/// Wire form: `ADDJOB queue payload timeout [REPLICATE n] [DELAY s]
/// [RETRY s] [TTL s] [MAXLEN n] [ASYNC]`
#[derive(Debug, Clone, Default)]
pub struct AddJob {
    arguments: Vec<String>,
}

impl AddJob {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for AddJob {
    fn name(&self) -> &str {
        "ADDJOB"
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        args::arity("ADDJOB", &args, 2, 3)?;
        let queue = args::text("ADDJOB", &args[0], "queue name")?;
        let payload = match &args[1] {
            Value::String(payload) => payload.clone(),
            other => {
                return Err(DisqueError::invalid_arguments(
                    "ADDJOB",
                    format!("job payload must be a string, got {}", render(other)),
                ))
            }
        };

        let no_options = Value::Object(Default::default());
        let options = args.get(2).unwrap_or(&no_options);
        let keywords = args::options("ADDJOB", options, OPTIONS)?;
        let timeout = args::integer_option("ADDJOB", options, "timeout")?.unwrap_or(0);

        let mut arguments = vec![queue, payload, timeout.to_string()];
        arguments.extend(keywords);
        self.arguments = arguments;
        Ok(())
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        match reply {
            Reply::Text(id) if !id.is_empty() => Ok(Response::Text(id)),
            other => Err(invalid_response("ADDJOB", &other)),
        }
    }
}
