use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{hook} is an abstract operation and has no implementation for this algorithm")]
    AbstractContract { hook: &'static str },

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] anyhow::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Worker pool has been shut down")]
    PoolShutDown,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Serde error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EvoError>;
