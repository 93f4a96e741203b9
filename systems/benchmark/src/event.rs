use linksim::Message;

/// Payload carried by every traffic event.
pub const TRAFFIC_PAYLOAD: u8 = b'a';

/// What a worker tells its neighbours after the timed run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Report {
    /// Wall-clock seconds of the timed run as seen by the sender.
    pub elapsed: f64,
    pub count: u64,
    /// Set only on the marker the ring root sends around. A worker that
    /// generated nothing still reports `count == 0` without it.
    pub sentinel: bool,
}

impl Report {
    pub fn new(elapsed: f64, count: u64) -> Self {
        Self {
            elapsed,
            count,
            sentinel: false,
        }
    }

    /// Ends a ring aggregation. Carries no events.
    pub fn sentinel(elapsed: f64) -> Self {
        Self {
            elapsed,
            count: 0,
            sentinel: true,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }
}

/// Everything workers send each other.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerEvent {
    /// Timed links only.
    Traffic { payload: u8 },
    /// Untimed aggregation exchange only.
    Report(Report),
}

impl WorkerEvent {
    pub fn traffic() -> Self {
        WorkerEvent::Traffic {
            payload: TRAFFIC_PAYLOAD,
        }
    }
}

impl Message for WorkerEvent {
    fn type_name(&self) -> &'static str {
        match self {
            WorkerEvent::Traffic { .. } => "WorkerEvent::Traffic",
            WorkerEvent::Report(_) => "WorkerEvent::Report",
        }
    }
}
