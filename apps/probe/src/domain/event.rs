use std::fmt;

/// Outcome recorded for one step of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SendRequest,
    RecvReply,
    Timeout,
    Error,
}

impl EventKind {
    /// Integer code stored in the `measurement.type` column
    pub fn code(self) -> i64 {
        match self {
            EventKind::SendRequest => 0,
            EventKind::RecvReply => 1,
            EventKind::Timeout => 2,
            EventKind::Error => 3,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::SendRequest => write!(f, "send_request"),
            EventKind::RecvReply => write!(f, "recv_reply"),
            EventKind::Timeout => write!(f, "timeout"),
            EventKind::Error => write!(f, "error"),
        }
    }
}

/// A single measurement event awaiting persistence
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Epoch seconds
    pub time: i64,

    /// Fully qualified name that was queried
    pub target: String,

    pub kind: EventKind,

    /// Milliseconds
    pub duration: f64,
}

impl Event {
    pub fn new(time: i64, target: impl Into<String>, kind: EventKind, duration: f64) -> Self {
        Self { time, target: target.into(), kind, duration }
    }
}
