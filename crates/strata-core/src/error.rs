use crate::types::StreamName;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("stream '{0}' not found")]
    StreamNotFound(StreamName),

    #[error("stream '{0}' already exists")]
    StreamExistsAlready(StreamName),

    #[error("projection '{0}' not found")]
    ProjectionNotFound(String),

    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid regex pattern given: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("{0}")]
    RuntimeMisuse(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl StrataError {
    /// True when the referenced stream or projection simply does not exist.
    ///
    /// Projection ticks treat these as "no events", everything else aborts.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StrataError::StreamNotFound(_) | StrataError::ProjectionNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StrataError>;
