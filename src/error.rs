use thiserror::Error;

use crate::notarize::JobStatus;

#[derive(Error, Debug)]
pub enum NotarizeError {
    #[error("No request with \"graphql\" found")]
    NoEligibleRequest,

    #[error("Failed to prepare notarization: {0}")]
    ConfigRead(String),

    #[error("Failed to notarize request: {0}")]
    Submission(String),

    #[error("A notarization is already being processed")]
    AlreadyProcessing,

    #[error("Job already in flight: {0}")]
    DuplicateJob(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Illegal status transition for job {id}: {from} -> {to}")]
    IllegalTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job book at capacity")]
    QueueFull,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NotarizeError>;
