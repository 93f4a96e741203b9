//! Worker parameters and their validation.

use linksim::Jiffies;
use thiserror::Error;

/// How a worker's peer ports are numbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerLayout {
    /// Peers on `port_0..port_{num_peers}`, self loop on `port_{num_peers}`.
    /// The first `tx_peers` peers receive traffic.
    Peers { num_peers: u32, tx_peers: u32 },
    /// One port per worker, `port_<other id>`, self loop on the worker's own
    /// port. Every other worker receives traffic.
    Workers { num_workers: u32 },
}

/// How a worker tells the runtime it is done generating traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompletionMode {
    /// A timer fires one jiffy after the horizon.
    #[default]
    Timer,
    /// The first traffic event seen at or after the horizon.
    SelfTerminating,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("tx_peers ({tx_peers}) must be <= num_peers ({num_peers})")]
    TxPeersExceedPeers { num_peers: u32, tx_peers: u32 },

    #[error("num_workers must be > 0")]
    NoWorkers,

    #[error("remote_probability must be in [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),

    #[error("remote_probability must be 0 without tx peers, got {0}")]
    ProbabilityWithoutPeers(f64),

    #[error("num_cycles must be >= 1")]
    NoCycles,

    #[error("look_ahead must be > 0")]
    NoLookAhead,

    #[error("num_cycles ({num_cycles}) must be >= look_ahead ({look_ahead})")]
    HorizonBelowLookAhead { num_cycles: u64, look_ahead: u64 },

    #[error("num_cycles ({num_cycles}) + look_ahead ({look_ahead}) leaves no room for the run")]
    HorizonTooLarge { num_cycles: u64, look_ahead: u64 },
}

/// Jiffies past the last possible delivery the run is given to wind down.
const RUN_SLACK: u64 = 3;

/// Parameters of one worker. Validated once, immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerConfig {
    pub layout: PeerLayout,
    pub initial_events: u32,
    pub remote_probability: f64,
    /// Horizon: no traffic is generated at or after this time.
    pub num_cycles: u64,
    /// Latency of every peer link.
    pub look_ahead: u64,
    pub completion: CompletionMode,
    pub verbosity: u32,
}

impl WorkerConfig {
    fn with_layout(layout: PeerLayout) -> Self {
        Self {
            layout,
            initial_events: 1,
            remote_probability: 0.5,
            num_cycles: 10_000,
            look_ahead: 1,
            completion: CompletionMode::default(),
            verbosity: 0,
        }
    }

    pub fn peers(num_peers: u32, tx_peers: u32) -> Self {
        Self::with_layout(PeerLayout::Peers {
            num_peers,
            tx_peers,
        })
    }

    pub fn workers(num_workers: u32) -> Self {
        Self::with_layout(PeerLayout::Workers { num_workers })
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

    pub fn num_peers(&self) -> u32 {
        match self.layout {
            PeerLayout::Peers { num_peers, .. } => num_peers,
            PeerLayout::Workers { num_workers } => num_workers.saturating_sub(1),
        }
    }

    pub fn tx_peers(&self) -> u32 {
        match self.layout {
            PeerLayout::Peers { tx_peers, .. } => tx_peers,
            PeerLayout::Workers { num_workers } => num_workers.saturating_sub(1),
        }
    }

    /// Number of links a worker owns, self loop included.
    pub fn expected_links(&self) -> usize {
        match self.layout {
            PeerLayout::Peers { num_peers, .. } => num_peers as usize + 1,
            PeerLayout::Workers { num_workers } => num_workers as usize,
        }
    }

    /// When the completion timer fires, relative to setup.
    pub fn completion_after(&self) -> Jiffies {
        Jiffies(self.num_cycles.saturating_add(1))
    }

    /// Simulated time a whole network of these workers needs. `None` if it
    /// does not fit in a [`Jiffies`].
    pub fn time_budget(&self) -> Option<Jiffies> {
        self.num_cycles
            .checked_add(self.look_ahead)?
            .checked_add(RUN_SLACK)
            .map(Jiffies)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.layout {
            PeerLayout::Peers {
                num_peers,
                tx_peers,
            } if tx_peers > num_peers => {
                return Err(ConfigError::TxPeersExceedPeers {
                    num_peers,
                    tx_peers,
                });
            }
            PeerLayout::Workers { num_workers: 0 } => return Err(ConfigError::NoWorkers),
            _ => {}
        }

        let p = self.remote_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::ProbabilityOutOfRange(p));
        }
        if self.tx_peers() == 0 && p != 0.0 {
            return Err(ConfigError::ProbabilityWithoutPeers(p));
        }

        if self.num_cycles == 0 {
            return Err(ConfigError::NoCycles);
        }
        if self.look_ahead == 0 {
            return Err(ConfigError::NoLookAhead);
        }
        if self.num_cycles < self.look_ahead {
            return Err(ConfigError::HorizonBelowLookAhead {
                num_cycles: self.num_cycles,
                look_ahead: self.look_ahead,
            });
        }
        if self.time_budget().is_none() {
            return Err(ConfigError::HorizonTooLarge {
                num_cycles: self.num_cycles,
                look_ahead: self.look_ahead,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WorkerConfig::peers(3, 3);
        assert_eq!(config.initial_events, 1);
        assert_eq!(config.remote_probability, 0.5);
        assert_eq!(config.num_cycles, 10_000);
        assert_eq!(config.look_ahead, 1);
        assert_eq!(config.completion, CompletionMode::Timer);
        assert_eq!(config.verbosity, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn worker_layout_derives_peer_counts() {
        let config = WorkerConfig::workers(5);
        assert_eq!(config.num_peers(), 4);
        assert_eq!(config.tx_peers(), 4);
        assert_eq!(config.expected_links(), 5);
        assert_eq!(WorkerConfig::peers(2, 1).expected_links(), 3);
    }

    #[test]
    fn rejects_more_tx_peers_than_peers() {
        assert_eq!(
            WorkerConfig::peers(2, 3).validate(),
            Err(ConfigError::TxPeersExceedPeers {
                num_peers: 2,
                tx_peers: 3
            })
        );
    }

    #[test]
    fn rejects_bad_probabilities() {
        for p in [-0.1, 1.5, f64::NAN] {
            assert!(matches!(
                WorkerConfig::peers(2, 2).remote_probability(p).validate(),
                Err(ConfigError::ProbabilityOutOfRange(_))
            ));
        }
        assert_eq!(
            WorkerConfig::peers(2, 0).validate(),
            Err(ConfigError::ProbabilityWithoutPeers(0.5))
        );
        assert!(
            WorkerConfig::peers(2, 0)
                .remote_probability(0.0)
                .validate()
                .is_ok()
        );
        assert!(
            WorkerConfig::workers(1)
                .remote_probability(0.0)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn rejects_bad_horizons() {
        assert_eq!(
            WorkerConfig::peers(1, 1).num_cycles(0).validate(),
            Err(ConfigError::NoCycles)
        );
        assert_eq!(
            WorkerConfig::peers(1, 1).look_ahead(0).validate(),
            Err(ConfigError::NoLookAhead)
        );
        assert_eq!(
            WorkerConfig::peers(1, 1)
                .num_cycles(5)
                .look_ahead(10)
                .validate(),
            Err(ConfigError::HorizonBelowLookAhead {
                num_cycles: 5,
                look_ahead: 10
            })
        );
        assert_eq!(
            WorkerConfig::workers(0).validate(),
            Err(ConfigError::NoWorkers)
        );
    }

    #[test]
    fn rejects_horizons_that_overflow_the_budget() {
        let config = WorkerConfig::peers(1, 1).num_cycles(u64::MAX);
        assert_eq!(config.time_budget(), None);
        assert_eq!(
            config.validate(),
            Err(ConfigError::HorizonTooLarge {
                num_cycles: u64::MAX,
                look_ahead: 1
            })
        );

        let edge = WorkerConfig::peers(1, 1).num_cycles(u64::MAX - 4);
        assert_eq!(edge.time_budget(), Some(Jiffies(u64::MAX)));
        assert!(edge.validate().is_ok());
        assert_eq!(edge.completion_after(), Jiffies(u64::MAX - 3));
    }

    #[test]
    fn budget_covers_completion_and_last_delivery() {
        let config = WorkerConfig::peers(1, 1).num_cycles(100).look_ahead(4);
        assert_eq!(config.completion_after(), Jiffies(101));
        assert_eq!(config.time_budget(), Some(Jiffies(107)));
    }
}
