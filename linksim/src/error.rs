use thiserror::Error;

use crate::time::Jiffies;

/// Error type components return from construction and handlers.
pub type ComponentError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Misuse of a port while a component configures its links.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("port {port} on {component} is not connected")]
    NotConnected { component: String, port: String },

    #[error("port {port} on {component} is connected and cannot become a self link")]
    AlreadyConnected { component: String, port: String },

    #[error("port {port} on {component} is already configured")]
    AlreadyConfigured { component: String, port: String },
}

/// Failure to assemble a simulation. Nothing has run when this is returned.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("component name {0} is used twice")]
    DuplicateComponent(String),

    #[error("link refers to unknown component {0}")]
    UnknownComponent(String),

    #[error("latency of port {port} on {component} is invalid: {reason}")]
    InvalidLatency {
        component: String,
        port: String,
        reason: String,
    },

    #[error("port {port} on {component} is connected twice")]
    PortConnectedTwice { component: String, port: String },

    #[error("failed to construct {component}: {source}")]
    Construction {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("port {port} on {component} is connected but never configured")]
    UnconfiguredPort { component: String, port: String },
}

/// Fatal error raised while the simulation runs.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("{component} failed at {time}: {source}")]
    Component {
        component: String,
        time: Jiffies,
        #[source]
        source: ComponentError,
    },

    #[error("simulation has already been run")]
    AlreadyRun,
}
