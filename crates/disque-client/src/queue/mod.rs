//! Job-oriented view of a single queue.
//!
//! A [`Queue`] composes client commands into the job lifecycle: a job is
//! pushed (and gets an ID), pulled by a consumer, then acknowledged.
//!
//! ```no_run
//! use disque_client::{BasicJob, Client, Job};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let mut client = Client::new(&["127.0.0.1:7711"]);
//!
//! let job = client.queue("emails").push(BasicJob::new(json!({"to": "a@b.c"})), None)?;
//! println!("pushed {:?}", job.id());
//!
//! if let Some(job) = client.queue("emails").pull(Duration::from_secs(1))? {
//!     client.queue("emails").processed(&*job)?;
//! }
//! # Ok::<(), disque_common::DisqueError>(())
//! ```

use std::time::Duration;

use chrono::{FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use disque_common::{DisqueError, Result};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::Client;

pub mod job;

pub use job::{BasicJob, Job};

/// Builds empty jobs that pulled payloads are loaded into.
pub type JobFactory = Box<dyn Fn() -> Box<dyn Job>>;

/// Per-queue settings the client keeps between [`Client::queue`] calls.
pub(crate) struct QueueState {
    pub(crate) factory: JobFactory,
    pub(crate) time_zone: FixedOffset,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            factory: Box::new(|| -> Box<dyn Job> { Box::new(BasicJob::default()) }),
            time_zone: utc(),
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Handle on a named queue, borrowed from a [`Client`].
pub struct Queue<'a> {
    client: &'a mut Client,
    name: String,
}

impl<'a> Queue<'a> {
    pub(crate) fn new(client: &'a mut Client, name: &str) -> Self {
        Self { client, name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the factory used to build pulled jobs.
    pub fn set_job_factory<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn Job> + 'static,
    {
        self.client.queue_state(&self.name).factory = Box::new(factory);
    }

    /// Time zone naive instants passed to [`schedule`](Self::schedule) are
    /// read in. Defaults to UTC.
    pub fn set_time_zone(&mut self, time_zone: FixedOffset) {
        self.client.queue_state(&self.name).time_zone = time_zone;
    }

    pub fn time_zone(&mut self) -> FixedOffset {
        self.client.queue_state(&self.name).time_zone
    }

    /// Pushes a job and stores the ID the broker assigned on it.
    ///
    /// `options` takes the ADDJOB option keys (`delay`, `retry`, `ttl`, ...).
    pub fn push<J: Job>(&mut self, mut job: J, options: Option<Value>) -> Result<J> {
        let payload = job.dump()?;
        let id = self.client.add_job(&self.name, &payload, options)?;
        debug!(queue = %self.name, id = %id, "Pushed job");
        job.set_id(id);
        Ok(job)
    }

    /// Pushes a job that becomes available at `when`, read in the queue's
    /// time zone. Instants in the past are rejected before anything is sent.
    pub fn schedule<J: Job>(&mut self, job: J, when: NaiveDateTime) -> Result<J> {
        let time_zone = self.time_zone();
        let when = time_zone.from_local_datetime(&when).single().ok_or_else(|| {
            DisqueError::InvalidArgument(format!("ambiguous schedule time {}", when))
        })?;
        let now = Utc::now().with_timezone(&time_zone);

        let delay = when.signed_duration_since(now);
        if delay < chrono::Duration::zero() {
            return Err(DisqueError::InvalidArgument(format!(
                "cannot schedule job in the past: {} is before {}",
                when.to_rfc3339(),
                now.to_rfc3339()
            )));
        }

        let mut options = Map::new();
        options.insert("delay".to_string(), json!(delay.num_seconds()));
        self.push(job, Some(Value::Object(options)))
    }

    /// Pulls one job, waiting up to `timeout` for one to arrive. A zero
    /// timeout returns immediately.
    ///
    /// `Ok(None)` means no job became available in time.
    pub fn pull(&mut self, timeout: Duration) -> Result<Option<Box<dyn Job>>> {
        let options = if timeout.is_zero() {
            json!({"nohang": true, "count": 1})
        } else {
            let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1);
            json!({"timeout": ms, "count": 1})
        };

        let jobs = self.client.get_job(&[self.name.as_str()], Some(options))?;
        let Some(data) = jobs.into_iter().next() else {
            debug!(queue = %self.name, "No job available");
            return Ok(None);
        };

        let mut job = (self.client.queue_state(&self.name).factory)();
        job.set_id(data.id);
        job.load(&data.body)?;
        Ok(Some(job))
    }

    /// Acknowledges a job as done.
    pub fn processed(&mut self, job: &dyn Job) -> Result<()> {
        let id = require_id("processed", job)?;
        self.client.ack_job(&[id])?;
        Ok(())
    }

    /// Puts a job back in the queue, counting a failed attempt.
    pub fn failed(&mut self, job: &dyn Job) -> Result<()> {
        let id = require_id("failed", job)?;
        self.client.nack(&[id])?;
        Ok(())
    }

    /// Tells the cluster the job is still being worked on. Returns the
    /// number of seconds the next delivery was postponed by.
    pub fn processing(&mut self, job: &dyn Job) -> Result<i64> {
        let id = require_id("processing", job)?;
        self.client.working(id)
    }
}

fn require_id<'j>(operation: &str, job: &'j dyn Job) -> Result<&'j str> {
    job.id().ok_or_else(|| {
        DisqueError::InvalidArgument(format!("{}: job has no ID, push it first", operation))
    })
}
