use disque_common::Result;
use serde_json::Value;

/// A unit of work carried through a queue.
///
/// Implementations decide how their payload is (de)serialized; the broker
/// only ever sees the string produced by [`dump`](Job::dump).
pub trait Job {
    /// Broker-assigned ID; `None` until the job has been pushed.
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    /// Serializes the payload for ADDJOB.
    fn dump(&self) -> Result<String>;

    /// Restores the payload from a body returned by GETJOB.
    fn load(&mut self, payload: &str) -> Result<()>;
}

impl<J: Job + ?Sized> Job for Box<J> {
    fn id(&self) -> Option<&str> {
        (**self).id()
    }

    fn set_id(&mut self, id: String) {
        (**self).set_id(id)
    }

    fn dump(&self) -> Result<String> {
        (**self).dump()
    }

    fn load(&mut self, payload: &str) -> Result<()> {
        (**self).load(payload)
    }
}

/// Default job: a JSON document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicJob {
    id: Option<String>,
    body: Value,
}

impl BasicJob {
    pub fn new(body: Value) -> Self {
        Self { id: None, body }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }
}

impl Job for BasicJob {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn dump(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.body)?)
    }

    fn load(&mut self, payload: &str) -> Result<()> {
        self.body = serde_json::from_str(payload)?;
        Ok(())
    }
}
