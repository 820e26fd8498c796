//! SEDA Error Types

use crate::core::error_handling::ContextualError;
use crate::exchange::ProcessError;
use crate::seda::PoolState;

#[derive(Debug, thiserror::Error)]
pub enum SedaError {
    #[error("Queue is full (capacity: {capacity})")]
    QueueSaturated { capacity: usize },

    #[error("Consumer pool is not running (state: {state})")]
    NotRunning { state: PoolState },

    #[error("Endpoint '{endpoint}' no longer exists")]
    EndpointClosed { endpoint: String },

    #[error("Processing failed: {source}")]
    Processing {
        #[source]
        source: ProcessError,
    },

    #[error("Exchange lost on shutdown of '{endpoint}': could not requeue within {grace_ms}ms")]
    ShutdownRaceLoss { endpoint: String, grace_ms: u128 },

    #[error("Failed to start consumer thread: {source}")]
    Spawn {
        #[from]
        source: std::io::Error,
    },

    #[error("Synchronisation failure: {message}")]
    Synchronisation { message: String },
}

impl ContextualError for SedaError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Result type for SEDA operations
pub type SedaResult<T> = Result<T, SedaError>;
