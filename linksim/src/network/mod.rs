mod latency;

use std::cell::RefCell;
use std::rc::Rc;

pub(crate) use latency::LatencyQueue;
use log::debug;

use crate::Message;
use crate::MessagePtr;
use crate::actor::EventSubmitter;
use crate::actor::SimulationActor;
use crate::communication::Delivery;
use crate::error::SimulationError;
use crate::now;
use crate::nursery::Nursery;
use crate::random::Randomizer;
use crate::random::Seed;
use crate::time::Jiffies;
use crate::wiring::EndpointId;
use crate::wiring::Wiring;

pub(crate) type NetworkActor = Rc<RefCell<Network>>;

/// Carries timed events over links.
pub(crate) struct Network {
    latency_queue: LatencyQueue,
    wiring: Rc<Wiring>,
    nursery: Rc<Nursery>,
}

impl Network {
    pub(crate) fn new(seed: Seed, wiring: Rc<Wiring>, nursery: Rc<Nursery>) -> Self {
        Self {
            latency_queue: LatencyQueue::new(Randomizer::new(seed), wiring.clone()),
            wiring,
            nursery,
        }
    }
}

impl SimulationActor for Network {
    fn start(&mut self) -> Result<(), SimulationError> {
        debug!("Setting up {} components", self.nursery.size());
        self.nursery.setup_all()
    }

    fn step(&mut self) -> Result<(), SimulationError> {
        let Some(message) = self.latency_queue.pop() else {
            return Ok(());
        };
        let dest = self.wiring.endpoint(message.dest);
        let Some(port) = dest.handler else {
            return Ok(());
        };
        self.nursery.deliver(
            dest.owner,
            Delivery::Event(port, MessagePtr(message.message)),
        )
    }

    fn peek_closest(&self) -> Option<Jiffies> {
        self.latency_queue.peek().map(|m| m.arrival_time)
    }
}

impl EventSubmitter for Network {
    type Event = (EndpointId, Jiffies, Rc<dyn Message>);

    fn submit(&mut self, events: &mut Vec<Self::Event>) {
        events.drain(..).for_each(|(source, delay, message)| {
            self.latency_queue
                .push(source, now().saturating_add(delay), message);
        });
    }
}
