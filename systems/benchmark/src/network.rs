//! Wiring a whole benchmark network of workers.

use std::{fmt, str::FromStr};

use linksim::{BuildError, Distributions, Jiffies, Seed, Simulation, SimulationBuilder};
use log::LevelFilter;
use thiserror::Error;

use crate::{
    config::{CompletionMode, ConfigError, WorkerConfig},
    links::port_name,
    worker::Worker,
};

pub const DEFAULT_SEED: Seed = 12345678;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    AllToAll,
    Ring,
}

#[derive(Debug, Error)]
#[error("unknown topology {0:?}, expected all-to-all or ring")]
pub struct TopologyParseError(String);

impl FromStr for Topology {
    type Err = TopologyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-to-all" => Ok(Topology::AllToAll),
            "ring" => Ok(Topology::Ring),
            other => Err(TopologyParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::AllToAll => write!(f, "all-to-all"),
            Topology::Ring => write!(f, "ring"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PortLayout {
    /// Every worker numbers its peer ports from 0.
    #[default]
    PeerPorts,
    /// Worker `a` reaches worker `b` on `port_b`. All-to-all only.
    WorkerPorts,
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("a network needs at least one worker")]
    NoWorkers,

    #[error("ring requires >= 2 workers, got {0}")]
    RingTooSmall(u32),

    #[error("worker-indexed ports are only supported for all-to-all")]
    WorkerPortsNeedAllToAll,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// `(worker, port index)` on each side of one link.
pub type PortPair = ((usize, usize), (usize, usize));

pub fn worker_name(id: usize) -> String {
    format!("Worker_{id}")
}

/// Builds a simulation of `num_workers` workers wired as `topology`.
///
/// ```no_run
/// use benchmark::network::{BenchmarkNetwork, Topology};
///
/// let mut sim = BenchmarkNetwork::new(8, Topology::Ring)
///     .initial_events(4)
///     .num_cycles(1_000)
///     .build()
///     .unwrap();
/// sim.run().unwrap();
/// ```
pub struct BenchmarkNetwork {
    num_workers: u32,
    topology: Topology,
    port_layout: PortLayout,
    initial_events: u32,
    remote_probability: f64,
    num_cycles: u64,
    look_ahead: u64,
    completion: CompletionMode,
    verbosity: u32,
    seed: Seed,
    log_level: LevelFilter,
}

impl BenchmarkNetwork {
    pub fn new(num_workers: u32, topology: Topology) -> Self {
        let defaults = WorkerConfig::peers(0, 0);
        Self {
            num_workers,
            topology,
            port_layout: PortLayout::default(),
            initial_events: defaults.initial_events,
            remote_probability: defaults.remote_probability,
            num_cycles: defaults.num_cycles,
            look_ahead: defaults.look_ahead,
            completion: defaults.completion,
            verbosity: defaults.verbosity,
            seed: DEFAULT_SEED,
            log_level: LevelFilter::Warn,
        }
    }

    pub fn port_layout(mut self, port_layout: PortLayout) -> Self {
        self.port_layout = port_layout;
        self
    }

    pub fn initial_events(mut self, initial_events: u32) -> Self {
        self.initial_events = initial_events;
        self
    }

    pub fn remote_probability(mut self, remote_probability: f64) -> Self {
        self.remote_probability = remote_probability;
        self
    }

    pub fn num_cycles(mut self, num_cycles: u64) -> Self {
        self.num_cycles = num_cycles;
        self
    }

    pub fn look_ahead(mut self, look_ahead: u64) -> Self {
        self.look_ahead = look_ahead;
        self
    }

    pub fn completion(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }

    pub fn verbosity(mut self, verbosity: u32) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    pub fn log_level(mut self, log_level: LevelFilter) -> Self {
        self.log_level = log_level;
        self
    }

    /// The configuration every worker of this network gets.
    pub fn worker_config(&self) -> Result<WorkerConfig, NetworkError> {
        let n = self.num_workers;
        if n == 0 {
            return Err(NetworkError::NoWorkers);
        }
        let config = match (self.topology, self.port_layout) {
            (Topology::AllToAll, PortLayout::PeerPorts) => WorkerConfig::peers(n - 1, n - 1),
            (Topology::AllToAll, PortLayout::WorkerPorts) => WorkerConfig::workers(n),
            (Topology::Ring, PortLayout::PeerPorts) if n < 2 => {
                return Err(NetworkError::RingTooSmall(n));
            }
            (Topology::Ring, PortLayout::PeerPorts) => WorkerConfig::peers(2, 1),
            (Topology::Ring, PortLayout::WorkerPorts) => {
                return Err(NetworkError::WorkerPortsNeedAllToAll);
            }
        }
        .initial_events(self.initial_events)
        .remote_probability(self.remote_probability)
        .num_cycles(self.num_cycles)
        .look_ahead(self.look_ahead)
        .completion(self.completion)
        .verbosity(self.verbosity);
        config.validate()?;
        Ok(config)
    }

    /// Every link of the network as two `(worker, port index)` ends.
    pub fn port_pairs(&self) -> Vec<PortPair> {
        let n = self.num_workers as usize;
        match (self.topology, self.port_layout) {
            (Topology::AllToAll, PortLayout::PeerPorts) => {
                let mut ports = vec![0; n];
                let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
                for a in 0..n {
                    for b in a + 1..n {
                        pairs.push(((a, ports[a]), (b, ports[b])));
                        ports[a] += 1;
                        ports[b] += 1;
                    }
                }
                pairs
            }
            (Topology::AllToAll, PortLayout::WorkerPorts) => (0..n)
                .flat_map(|a| (a + 1..n).map(move |b| ((a, b), (b, a))))
                .collect(),
            (Topology::Ring, _) => (0..n).map(|a| ((a, 0), ((a + 1) % n, 1))).collect(),
        }
    }

    pub fn build(self) -> Result<Simulation, NetworkError> {
        let config = self.worker_config()?;
        let latency = Distributions::Fixed(Jiffies(config.look_ahead));
        let time_budget = config
            .time_budget()
            .ok_or(ConfigError::HorizonTooLarge {
                num_cycles: config.num_cycles,
                look_ahead: config.look_ahead,
            })?;

        let mut builder = SimulationBuilder::default()
            .seed(self.seed)
            .time_budget(time_budget)
            .default_log_level(self.log_level);

        for id in 0..self.num_workers as usize {
            let config = config.clone();
            builder = builder.add_component(&worker_name(id), move |ctx| Worker::new(ctx, config));
        }
        for ((a, port_a), (b, port_b)) in self.port_pairs() {
            builder = builder.connect(
                (&worker_name(a), &port_name(port_a)),
                (&worker_name(b), &port_name(port_b)),
                latency,
            );
        }

        Ok(builder.build()?)
    }
}
