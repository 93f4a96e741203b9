use thiserror::Error;

use crate::{config::ConfigError, links::LinkSetError};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Links(#[from] LinkSetError),

    #[error("completion_port is already connected on {0}")]
    CompletionPortConnected(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}
