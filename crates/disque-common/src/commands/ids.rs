//! Commands addressed at job IDs.

use std::collections::BTreeMap;

use super::args;
use super::{invalid_response, Command, CommandArgs, Response};
use crate::protocol::error::Result;
use crate::protocol::reply::Reply;

/// A command taking one or more job IDs and answering with an integer.
///
/// ACKJOB, DELJOB, DEQUEUE, ENQUEUE, FASTACK and NACK only differ by name,
/// so one handler type serves all of them.
#[derive(Debug, Clone)]
pub struct JobIdCommand {
    name: &'static str,
    arguments: Vec<String>,
}

impl JobIdCommand {
    fn named(name: &'static str) -> Self {
        Self { name, arguments: Vec::new() }
    }

    /// ACKJOB: acknowledge jobs as processed (cluster-wide).
    pub fn ack_job() -> Self {
        Self::named("ACKJOB")
    }

    /// DELJOB: delete jobs from the node's memory.
    pub fn del_job() -> Self {
        Self::named("DELJOB")
    }

    /// DEQUEUE: remove jobs from their queue without deleting them.
    pub fn dequeue() -> Self {
        Self::named("DEQUEUE")
    }

    /// ENQUEUE: put jobs back in their queue.
    pub fn enqueue() -> Self {
        Self::named("ENQUEUE")
    }

    /// FASTACK: best-effort acknowledge.
    pub fn fast_ack() -> Self {
        Self::named("FASTACK")
    }

    /// NACK: put jobs back in the queue as soon as possible, counting a failure.
    pub fn nack() -> Self {
        Self::named("NACK")
    }
}

impl Command for JobIdCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        self.arguments = args::job_ids(self.name, &args)?;
        Ok(())
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        match reply {
            Reply::Integer(n) => Ok(Response::Integer(n)),
            other => Err(invalid_response(self.name, &other)),
        }
    }
}

/// WORKING: tell the cluster a job is still being processed. Answers with
/// the number of seconds the next delivery was postponed.
#[derive(Debug, Clone, Default)]
pub struct Working {
    arguments: Vec<String>,
}

impl Working {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for Working {
    fn name(&self) -> &str {
        "WORKING"
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        args::arity("WORKING", &args, 1, 1)?;
        self.arguments = vec![args::text("WORKING", &args[0], "job ID")?];
        Ok(())
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        match reply {
            Reply::Integer(n) => Ok(Response::Integer(n)),
            other => Err(invalid_response("WORKING", &other)),
        }
    }
}

/// SHOW: describe a job. The node answers with a flat list of field/value
/// pairs, or nil when it does not know the job.
#[derive(Debug, Clone, Default)]
pub struct Show {
    arguments: Vec<String>,
}

impl Show {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for Show {
    fn name(&self) -> &str {
        "SHOW"
    }

    fn set_arguments(&mut self, args: CommandArgs) -> Result<()> {
        args::arity("SHOW", &args, 1, 1)?;
        self.arguments = vec![args::text("SHOW", &args[0], "job ID")?];
        Ok(())
    }

    fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn parse(&self, reply: Reply) -> Result<Response> {
        let items = match &reply {
            Reply::Nil => return Ok(Response::Details(None)),
            Reply::Sequence(items) if items.len() % 2 == 0 => items,
            other => return Err(invalid_response("SHOW", other)),
        };

        let mut details = BTreeMap::new();
        for pair in items.chunks(2) {
            let key = pair[0].as_text().ok_or_else(|| invalid_response("SHOW", &reply))?;
            details.insert(key.to_string(), pair[1].to_json());
        }
        Ok(Response::Details(Some(details)))
    }
}
