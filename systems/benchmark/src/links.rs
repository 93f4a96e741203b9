//! The links a worker owns: one per peer port and one self loop.

use linksim::{ComponentContext, Jiffies, Link, LinkError, PortNum};
use thiserror::Error;

use crate::{
    aggregation::UntimedIo,
    completion::COMPLETION_PORT,
    config::{PeerLayout, WorkerConfig},
    error::WorkerError,
    event::{Report, WorkerEvent},
};

/// Latency of the self loop. Local sends add one more jiffy of delay.
pub const SELF_LOOP_LATENCY: Jiffies = Jiffies(1);

#[derive(Debug, Error)]
pub enum LinkSetError {
    #[error("{port} must be connected on {component}")]
    MissingPort { component: String, port: String },

    #[error("{port} should NOT be connected on {component}")]
    UnexpectedPort { component: String, port: String },

    #[error("worker id {id} is outside a layout of {num_workers} workers")]
    IdOutOfLayout { id: usize, num_workers: u32 },

    #[error("{component} owns {actual} links, expected {expected}")]
    LinkCount {
        component: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Link(#[from] LinkError),
}

pub fn port_name(index: usize) -> String {
    format!("port_{index}")
}

pub struct LinkSet {
    // Ordinal order: peers[0] is the first peer port
    peers: Vec<Link>,
    self_loop: Link,
    tx_peers: usize,
}

impl LinkSet {
    /// Configures every peer port and the self loop of the worker under
    /// construction.
    pub fn configure(
        ctx: &mut ComponentContext<'_>,
        config: &WorkerConfig,
    ) -> Result<Self, LinkSetError> {
        let (peer_indices, self_index) = match config.layout {
            PeerLayout::Peers { num_peers, .. } => {
                let num_peers = num_peers as usize;
                ((0..num_peers).collect::<Vec<_>>(), num_peers)
            }
            PeerLayout::Workers { num_workers } => {
                let id = ctx.id();
                if id >= num_workers as usize {
                    return Err(LinkSetError::IdOutOfLayout { id, num_workers });
                }
                let peers = (0..num_workers as usize).filter(|&j| j != id).collect();
                (peers, id)
            }
        };

        for port in ctx.connected_ports() {
            let expected = port == COMPLETION_PORT
                || peer_indices.iter().any(|&index| port_name(index) == port);
            if !expected {
                return Err(LinkSetError::UnexpectedPort {
                    component: ctx.name().to_string(),
                    port,
                });
            }
        }

        let mut peers = Vec::with_capacity(peer_indices.len());
        for index in peer_indices {
            let port = port_name(index);
            if !ctx.is_port_connected(&port) {
                return Err(LinkSetError::MissingPort {
                    component: ctx.name().to_string(),
                    port,
                });
            }
            peers.push(ctx.configure_link(&port, index)?);
        }

        let self_loop =
            ctx.configure_self_link(&port_name(self_index), SELF_LOOP_LATENCY, self_index)?;

        let links = Self {
            peers,
            self_loop,
            tx_peers: config.tx_peers() as usize,
        };
        if links.len() != config.expected_links() {
            return Err(LinkSetError::LinkCount {
                component: ctx.name().to_string(),
                expected: config.expected_links(),
                actual: links.len(),
            });
        }
        Ok(links)
    }

    /// Number of links, self loop included.
    pub fn len(&self) -> usize {
        self.peers.len() + 1
    }

    /// The `k`-th peer that receives traffic.
    pub fn tx_peer(&self, k: usize) -> Option<Link> {
        self.peers.get(..self.tx_peers)?.get(k).copied()
    }

    pub fn self_loop(&self) -> Link {
        self.self_loop
    }

    pub fn is_self_loop(&self, port: PortNum) -> bool {
        self.self_loop.port() == port
    }

    fn peer(&self, ordinal: usize) -> Result<Link, WorkerError> {
        self.peers.get(ordinal).copied().ok_or_else(|| {
            WorkerError::ProtocolViolation(format!("no peer with ordinal {ordinal}"))
        })
    }
}

impl UntimedIo for LinkSet {
    fn send_report(&mut self, ordinal: usize, report: Report) -> Result<(), WorkerError> {
        self.peer(ordinal)?
            .send_untimed(WorkerEvent::Report(report));
        Ok(())
    }

    fn recv_report(&mut self, ordinal: usize) -> Result<Option<Report>, WorkerError> {
        let Some(message) = self.peer(ordinal)?.recv_untimed() else {
            return Ok(None);
        };
        match message.try_as::<WorkerEvent>().as_deref() {
            Some(WorkerEvent::Report(report)) => Ok(Some(*report)),
            _ => Err(WorkerError::ProtocolViolation(format!(
                "{} received on untimed peer {ordinal}",
                message.type_name()
            ))),
        }
    }
}
