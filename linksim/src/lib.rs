//! Deterministic discrete-event simulation of components wired by links.
//!
//! Components are created by factories registered on a [`SimulationBuilder`].
//! During construction they configure the links the builder wired to their
//! named ports, register statistics and join the primary-component end-of-run
//! barrier. The timed run then delivers events over links in simulated time
//! order, after which the untimed `complete` phases run until a phase sends
//! nothing, and finally every component gets a `finish` call.

mod actor;
mod alloc;
mod communication;
mod component;
mod error;
pub mod global;
mod helpers;
mod link;
mod network;
mod nursery;
mod progress;
mod random;
mod simulation;
mod simulation_builder;
pub mod time;
mod untimed;
mod wiring;

pub use communication::{Message, MessagePtr};

pub use component::{Component, ComponentContext, ComponentId, HandlerResult};

pub use error::{BuildError, ComponentError, LinkError, SimulationError};

pub use link::{Link, PortNum};

pub use simulation::{EndReason, RunSummary, Simulation};
pub use simulation_builder::SimulationBuilder;

pub use global::anykv;
pub use global::elapsed_run_time;
pub use global::now;
pub use global::ok_to_end;
pub use global::rank;
pub use global::schedule_timer_after;
pub use global::statistics;
pub use global::statistics::Statistic;

pub use random::{Distributions, Seed};

pub use time::Jiffies;
pub use time::TimerId;
