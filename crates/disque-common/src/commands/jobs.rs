//! Commands that hand jobs back to the caller (GETJOB, QPEEK).

use serde::Serialize;
use serde_json::Value;

use super::args::{self, OptionDef};
use super::{invalid_response, Command, CommandArgs, Response};
use crate::protocol::error::{DisqueError, Result};
use crate::protocol::reply::Reply;

const GET_JOB_OPTIONS: &[OptionDef] = &[
    OptionDef::flag("nohang", "NOHANG"),
    OptionDef::integer("timeout", "TIMEOUT"),
    OptionDef::integer("count", "COUNT"),
    OptionDef::flag("withcounters", "WITHCOUNTERS"),
];

/// One job as delivered by GETJOB or QPEEK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobData {
    pub queue: String,
    pub id: String,
    pub body: String,
    /// Times the job was negatively acknowledged (WITHCOUNTERS only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nacks: Option<i64>,
    /// Deliveries beyond the first not caused by a NACK (WITHCOUNTERS only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_deliveries: Option<i64>,
}

/// Prefix of the node that created a job, as embedded in its ID.
///
/// Disque job IDs look like `D-dcb833cf-8YL1NT17e9+wsA/09NqxscQI-05a1`: the
/// eight characters after `D-` are the first eight characters of the
/// producing node's ID.
///
/// ```
/// use disque_common::commands::node_prefix;
///
/// assert_eq!(node_prefix("D-dcb833cf-8YL1NT17e9+wsA/09NqxscQI-05a1"), Some("dcb833cf"));
/// assert_eq!(node_prefix("not-a-job"), None);
/// ```
pub fn node_prefix(job_id: &str) -> Option<&str> {
    let rest = job_id.strip_prefix("D-")?;
    let prefix = rest.get(..8)?;
    match rest.as_bytes().get(8) {
        Some(b'-') => Some(prefix),
        _ => None,
    }
}

/// Parses the list-of-jobs reply shared by GETJOB and QPEEK.
fn parse_jobs(command: &str, reply: &Reply) -> Result<Vec<JobData>> {
    let entries = match reply {
        Reply::Nil => return Ok(Vec::new()),
        Reply::Sequence(entries) => entries,
        other => return Err(invalid_response(command, other)),
    };

    entries
        .iter()
        .map(|entry| parse_job(entry).ok_or_else(|| invalid_response(command, reply)))
        .collect()
}

fn parse_job(entry: &Reply) -> Option<JobData> {
    let fields = entry.as_sequence()?;
    if fields.len() != 3 && fields.len() != 7 {
        return None;
    }

    let mut job = JobData {
        queue: fields[0].as_text()?.to_string(),
        id: fields[1].as_text()?.to_string(),
        body: fields[2].as_text()?.to_string(),
        nacks: None,
        additional_deliveries: None,
    };

    for pair in fields[3..].chunks(2) {
        let count = pair[1].as_integer()?;
        match pair[0].as_text()? {
            "nacks" => job.nacks = Some(count),
            "additional-deliveries" => job.additional_deliveries = Some(count),
            _ => return None,
        }
    }
    Some(job)
}

/// GETJOB: fetch jobs from one or more queues.
///
/// Arguments: one or more queue names, optionally followed by an options
/// map with keys `timeout` (milliseconds to block), `count`, `nohang` and
/// `withcounters`. A nil reply (timeout elapsed) parses as an empty list.
#[derive(Debug, Clone, Default)]
pub struct GetJob {
    arguments: Vec<String>,
}

impl GetJob {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for GetJob {
    fn name(&self) -> &str {
        "GETJOB"
    }

    fn set_arguments(&mut self, mut args: CommandArgs) -> Result<()> {
        let options = match args.last() {
            Some(Value::Object(_)) => args.pop(),
            _ => None,
        };
        if args.is_empty() {
            return Err(DisqueError::invalid_arguments("GETJOB", "at least one queue is required"));
        }
        let queues = args
            .iter()
            .map(|q| args::text("GETJOB", q, "queue name"))
            .collect::<Result<Vec<_>>>()?;

        let mut arguments = match &options {
            Some(options) => args::options("GETJOB", options, GET_JOB_OPTIONS)?,
            None => Vec::new(),
        };
        arguments.push("FROM".to_string());
        arguments.extend(queues);
        self.arguments = arguments;
        Ok(())
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        parse_jobs("GETJOB", &reply).map(Response::Jobs)
    }

    fn produces_jobs(&self) -> bool {
        true
    }

    fn job_ids(&self, reply: &Reply) -> Vec<String> {
        parse_jobs("GETJOB", reply)
            .map(|jobs| jobs.into_iter().map(|job| job.id).collect())
            .unwrap_or_default()
    }
}

/// QPEEK: look at up to `count` jobs of a queue without taking them.
#[derive(Debug, Clone, Default)]
pub struct QPeek {
    arguments: Vec<String>,
}

impl QPeek {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for QPeek {
    fn name(&self) -> &str {
        "QPEEK"
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        args::arity("QPEEK", &args, 2, 2)?;
        let queue = args::text("QPEEK", &args[0], "queue name")?;
        // Negative counts peek from the tail of the queue
        let count = args[1].as_i64().ok_or_else(|| {
            DisqueError::invalid_arguments("QPEEK", format!("count must be an integer, got {}", args[1]))
        })?;
        self.arguments = vec![queue, count.to_string()];
        Ok(())
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        parse_jobs("QPEEK", &reply).map(Response::Jobs)
    }
}
