//! Self-targeted timers.
//!
//! A component schedules a timer with [`schedule_timer_after`] and gets the
//! returned [`TimerId`] back in [`Component::on_timer`] once simulated time
//! reaches the deadline. Timers carry no payload and cannot be cancelled; a
//! component that no longer cares about a timer simply ignores its id.
//!
//! [`schedule_timer_after`]: crate::schedule_timer_after
//! [`Component::on_timer`]: crate::Component::on_timer

use std::{cell::RefCell, cmp::Reverse, collections::BinaryHeap, rc::Rc};

use log::debug;

use crate::{
    ComponentId,
    actor::{EventSubmitter, SimulationActor},
    communication::Delivery,
    error::SimulationError,
    global, now,
    nursery::Nursery,
    time::Jiffies,
};

/// Identifier of a scheduled timer, unique within one simulation run.
pub type TimerId = usize;

pub(crate) fn next_timer_id() -> TimerId {
    global::tso::global_unique_id()
}

pub(crate) type TimerManagerActor = Rc<RefCell<TimerManager>>;

pub(crate) struct TimerManager {
    working_timers: BinaryHeap<Reverse<(Jiffies, (ComponentId, TimerId))>>,
    nursery: Rc<Nursery>,
}

impl TimerManager {
    pub(crate) fn new(nursery: Rc<Nursery>) -> Self {
        Self {
            working_timers: BinaryHeap::new(),
            nursery,
        }
    }
}

impl SimulationActor for TimerManager {
    fn start(&mut self) -> Result<(), SimulationError> {
        Ok(())
    }

    fn peek_closest(&self) -> Option<Jiffies> {
        self.working_timers.peek().map(|entry| entry.0.0)
    }

    fn step(&mut self) -> Result<(), SimulationError> {
        let Some(Reverse((_, (component, timer_id)))) = self.working_timers.pop() else {
            return Ok(());
        };
        debug!("Firing timer {timer_id} for C{component}");
        self.nursery.deliver(component, Delivery::Timer(timer_id))
    }
}

impl EventSubmitter for TimerManager {
    type Event = (ComponentId, TimerId, Jiffies);

    fn submit(&mut self, events: &mut Vec<Self::Event>) {
        events.drain(..).for_each(|(source, timer_id, after)| {
            self.working_timers
                .push(Reverse((now().saturating_add(after), (source, timer_id))));
        });
    }
}
