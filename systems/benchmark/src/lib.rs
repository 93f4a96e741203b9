//! Synthetic traffic benchmark.
//!
//! Every [`Worker`](worker::Worker) floods its peers and itself with one-byte
//! events until a horizon, then the workers aggregate their event counts
//! into a network-wide events-per-second figure in the untimed phases that
//! follow the timed run.

pub mod aggregation;
pub mod completion;
pub mod config;
pub mod error;
pub mod event;
pub mod links;
pub mod network;
pub mod random;
pub mod stats;
pub mod traffic;
pub mod worker;

pub use aggregation::{AggregateOutcome, AggregateReport, AggregationFailure};
pub use config::{CompletionMode, PeerLayout, WorkerConfig};
pub use error::WorkerError;
pub use network::{BenchmarkNetwork, PortLayout, Topology};
pub use worker::{AGGREGATE_KEY, EVENT_COUNT, Worker};
