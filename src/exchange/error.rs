//! Processing Error Types

use std::any::Any;

/// Failure raised by a downstream processor
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Processing failed: {message}")]
    Failed { message: String },

    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ProcessError {
    /// Plain failure with a message
    pub fn failed(message: impl Into<String>) -> Self {
        ProcessError::Failed {
            message: message.into(),
        }
    }

    /// Failure of a nested stage (for example a resequencer used as a processor)
    pub fn stage(
        stage: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ProcessError::Stage {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// Failure standing in for a processor that panicked
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            format!("processor panicked: {}", message)
        } else if let Some(message) = payload.downcast_ref::<String>() {
            format!("processor panicked: {}", message)
        } else {
            "processor panicked".to_string()
        };
        ProcessError::Failed { message }
    }
}

/// Result type for processor invocations
pub type ProcessResult<T> = Result<T, ProcessError>;
