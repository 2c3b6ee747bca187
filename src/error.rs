use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    #[error("Job {identity:?} has a non-positive total runtime")]
    InvalidRuntime { identity: String },

    #[error("Job identity must not be empty")]
    EmptyIdentity,

    #[error("Quantum must be positive")]
    InvalidQuantum,

    #[error("Failed to spawn job {identity:?}: {reason}")]
    SpawnFailed { identity: String, reason: String },

    #[error("Job {identity:?} panicked before completing")]
    TaskPanicked { identity: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SchedError>;
