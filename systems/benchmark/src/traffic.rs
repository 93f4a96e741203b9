use linksim::{Jiffies, Statistic};

use crate::{error::WorkerError, event::WorkerEvent, links::LinkSet, random::RandomStream};

/// Extra delay of a local send on top of the self loop latency.
pub const LOCAL_DELAY: Jiffies = Jiffies(1);

/// Where one event goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// The `k`-th transmit-eligible peer.
    Remote(usize),
    Local,
}

/// One routing decision, with the draw that led to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Emission {
    pub draw: f64,
    pub route: Route,
}

pub struct TrafficGenerator {
    random: RandomStream,
    remote_probability: f64,
    tx_peers: u64,
    event_count: Statistic,
}

impl TrafficGenerator {
    pub fn new(
        random: RandomStream,
        remote_probability: f64,
        tx_peers: u32,
        event_count: Statistic,
    ) -> Self {
        Self {
            random,
            remote_probability,
            tx_peers: tx_peers as u64,
            event_count,
        }
    }

    /// Draws the destination of the next event.
    pub fn route(&mut self) -> Emission {
        let draw = self.random.next_uniform();
        let p = self.remote_probability;
        let route = if p > 0.0 && draw <= p && self.tx_peers > 0 {
            Route::Remote((self.random.next_uniform_int() % self.tx_peers) as usize)
        } else {
            Route::Local
        };
        Emission { draw, route }
    }

    /// Routes and sends one traffic event, then counts it. A remote route to
    /// a peer `links` does not have is an error and sends nothing.
    pub fn emit_next(&mut self, links: &LinkSet) -> Result<Emission, WorkerError> {
        let emission = self.route();
        match emission.route {
            Route::Remote(k) => {
                let link = links.tx_peer(k).ok_or_else(|| {
                    WorkerError::ProtocolViolation(format!(
                        "routed to tx peer {k} of {}",
                        self.tx_peers
                    ))
                })?;
                link.send(WorkerEvent::traffic());
            }
            Route::Local => links
                .self_loop()
                .send_after(LOCAL_DELAY, WorkerEvent::traffic()),
        }
        self.event_count.add_data(1);
        Ok(emission)
    }

    pub fn event_count(&self) -> u64 {
        self.event_count.count()
    }
}
