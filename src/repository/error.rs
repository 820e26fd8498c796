//! Repository Error Types

use crate::core::error_handling::ContextualError;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Completion {completion_id} is already in flight")]
    CompletionInFlight { completion_id: u64 },

    #[error("Synchronisation failure: {message}")]
    Synchronisation { message: String },
}

impl ContextualError for RepositoryError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;
