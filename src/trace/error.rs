//! Trace Error Types

use crate::core::error_handling::ContextualError;

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("Trace queue size must be greater than 0")]
    InvalidQueueSize,

    #[error("Synchronisation failure: {message}")]
    Synchronisation { message: String },
}

impl ContextualError for TraceError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, TraceError::InvalidQueueSize)
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            TraceError::InvalidQueueSize => Some("Trace queue size must be greater than 0"),
            TraceError::Synchronisation { .. } => None,
        }
    }
}

/// Result type for trace operations
pub type TraceResult<T> = Result<T, TraceError>;
