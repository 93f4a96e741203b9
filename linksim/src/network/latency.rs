use std::collections::BinaryHeap;
use std::rc::Rc;

use log::trace;

use crate::communication::{RoutedMessage, TimePriorityMessageQueue};
use crate::random::Randomizer;
use crate::time::Jiffies;
use crate::wiring::{EndpointId, Wiring};

/// Orders messages by arrival time after adding the latency of the link
/// they travel on. Arrivals on one link never overtake each other, even when
/// the latency is random.
pub(crate) struct LatencyQueue {
    wiring: Rc<Wiring>,
    randomizer: Randomizer,
    queue: TimePriorityMessageQueue,
    last_arrival: Vec<Jiffies>,
    seq: u64,
}

impl LatencyQueue {
    pub(crate) fn new(randomizer: Randomizer, wiring: Rc<Wiring>) -> Self {
        Self {
            last_arrival: vec![Jiffies::ZERO; wiring.size()],
            randomizer,
            wiring,
            queue: BinaryHeap::new(),
            seq: 0,
        }
    }

    pub(crate) fn push(&mut self, source: EndpointId, base_time: Jiffies, message: Rc<dyn crate::Message>) {
        let endpoint = self.wiring.endpoint(source);
        let latency = self.randomizer.random_jiffies(endpoint.latency);
        let arrival_time = base_time
            .saturating_add(latency)
            .max(self.last_arrival[source]);
        self.last_arrival[source] = arrival_time;
        trace!("Message on endpoint {source}: base {base_time}, arrival {arrival_time}");

        self.queue.push(std::cmp::Reverse(RoutedMessage {
            arrival_time,
            seq: self.seq,
            dest: endpoint.peer,
            message,
        }));
        self.seq += 1;
    }

    pub(crate) fn pop(&mut self) -> Option<RoutedMessage> {
        Some(self.queue.pop()?.0)
    }

    pub(crate) fn peek(&self) -> Option<&RoutedMessage> {
        Some(&self.queue.peek()?.0)
    }
}
