//! Self-clocked end of traffic generation.

use linksim::{ComponentContext, Jiffies, TimerId, ok_to_end, schedule_timer_after};

use crate::error::WorkerError;

/// Port the completion signal would use if it were a link. It must stay
/// unconnected.
pub const COMPLETION_PORT: &str = "completion_port";

pub struct CompletionSync {
    after: Jiffies,
    armed: Option<TimerId>,
    fired: bool,
}

impl CompletionSync {
    /// `after` is measured from setup, see [`WorkerConfig::completion_after`](crate::WorkerConfig::completion_after).
    pub fn new(ctx: &ComponentContext<'_>, after: Jiffies) -> Result<Self, WorkerError> {
        if ctx.is_port_connected(COMPLETION_PORT) {
            return Err(WorkerError::CompletionPortConnected(ctx.name().to_string()));
        }
        Ok(Self {
            after,
            armed: None,
            fired: false,
        })
    }

    /// Schedules the completion timer relative to now.
    pub fn arm(&mut self) {
        self.armed = Some(schedule_timer_after(self.after));
    }

    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Handles a timer. Only the armed timer, once, is accepted; it tells the
    /// runtime this worker is ok to end.
    pub fn on_timer(&mut self, id: TimerId) -> Result<(), WorkerError> {
        self.accept(id)?;
        ok_to_end();
        Ok(())
    }

    fn accept(&mut self, id: TimerId) -> Result<(), WorkerError> {
        match self.armed {
            Some(armed) if armed == id && !self.fired => {
                self.fired = true;
                Ok(())
            }
            Some(armed) if armed == id => Err(WorkerError::ProtocolViolation(
                "completion fired twice".to_string(),
            )),
            _ => Err(WorkerError::ProtocolViolation(format!(
                "unexpected timer {id}"
            ))),
        }
    }
}
