//! Resequencer Error Types

use crate::core::error_handling::ContextualError;
use crate::exchange::ProcessError;
use crate::resequencer::ResequencerState;

#[derive(Debug, thiserror::Error)]
pub enum ResequencerError {
    #[error("Duplicate sequence key {key} is already buffered")]
    DuplicateKey { key: String },

    #[error("Sequence key {key} rejected: not after last delivered key {last_delivered}")]
    Rejected { key: String, last_delivered: String },

    #[error("Element carries no valid sequence key")]
    InvalidSequence,

    #[error("Resequencer is not running (state: {state})")]
    NotRunning { state: ResequencerState },

    #[error("Resequencer engine is closed")]
    Closed,

    #[error("Delivery of sequence key {key} failed: {source}")]
    Delivery {
        key: String,
        #[source]
        source: ProcessError,
    },

    #[error("Failed to start delivery thread: {source}")]
    Spawn {
        #[from]
        source: std::io::Error,
    },

    #[error("Synchronisation failure: {message}")]
    Synchronisation { message: String },
}

impl ContextualError for ResequencerError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Result type for resequencer operations
pub type ResequencerResult<T> = Result<T, ResequencerError>;
