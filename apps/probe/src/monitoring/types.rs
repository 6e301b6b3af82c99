use crate::domain::{Event, EventKind};

/// What a single query produced
///
/// A reply starts out as a [`EventKind::SendRequest`] and is upgraded by the
/// builder methods once the outcome is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Epoch seconds at which the query was issued
    pub time: i64,

    /// Fully qualified name that was queried
    pub target: String,

    pub kind: EventKind,

    /// Milliseconds spent waiting for the outcome
    pub duration: f64,
}

impl Reply {
    pub fn new(target: String) -> Self {
        Self { time: chrono::Utc::now().timestamp(), target, kind: EventKind::SendRequest, duration: 0.0 }
    }

    /// An answer packet arrived
    pub fn received(mut self, duration: f64) -> Self {
        self.kind = EventKind::RecvReply;
        self.duration = duration;
        self
    }

    /// No answer within the resolver's timeout and retries
    pub fn timed_out(mut self, duration: f64) -> Self {
        self.kind = EventKind::Timeout;
        self.duration = duration;
        self
    }

    /// The query could not be completed for another reason
    pub fn failed(mut self, duration: f64) -> Self {
        self.kind = EventKind::Error;
        self.duration = duration;
        self
    }
}

impl From<Reply> for Event {
    fn from(reply: Reply) -> Self {
        Event::new(reply.time, reply.target, reply.kind, reply.duration)
    }
}
