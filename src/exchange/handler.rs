//! Exception handlers for failures caught on worker and delivery threads
//!
//! Failures of a single exchange never unwind a worker or the delivery
//! thread. They are handed to an [`ExceptionHandler`] instead; the default
//! handler logs them.

use std::error::Error;
use std::sync::Mutex;

/// Sink for failures that cannot be returned to a caller
pub trait ExceptionHandler: Send + Sync {
    /// `context` names where the failure was caught (stage and element)
    fn handle_exception(&self, context: &str, error: &(dyn Error + 'static));
}

/// Default handler: structured log line at error level, cause chain at debug
#[derive(Debug, Clone)]
pub struct LoggingExceptionHandler {
    component: String,
}

impl LoggingExceptionHandler {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

impl ExceptionHandler for LoggingExceptionHandler {
    fn handle_exception(&self, context: &str, error: &(dyn Error + 'static)) {
        log::error!("{}: {}: {}", self.component, context, error);

        let mut source = error.source();
        while let Some(cause) = source {
            log::debug!("{}: caused by: {}", self.component, cause);
            source = cause.source();
        }
    }
}

/// Handler that keeps every reported failure in memory
///
/// Useful for embedding applications that surface failures on their own
/// channel, and for asserting on failures in tests.
#[derive(Debug, Default)]
pub struct CollectingExceptionHandler {
    failures: Mutex<Vec<(String, String)>>,
}

impl CollectingExceptionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reported failures as `(context, message)` pairs in report order
    pub fn failures(&self) -> Vec<(String, String)> {
        match self.failures.lock() {
            Ok(failures) => failures.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self) -> usize {
        match self.failures.lock() {
            Ok(failures) => failures.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl ExceptionHandler for CollectingExceptionHandler {
    fn handle_exception(&self, context: &str, error: &(dyn Error + 'static)) {
        let entry = (context.to_string(), error.to_string());
        match self.failures.lock() {
            Ok(mut failures) => failures.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ProcessError;

    #[test]
    fn test_collecting_handler_records_context_and_message() {
        let handler = CollectingExceptionHandler::new();
        handler.handle_exception("seda[orders] exchange 4", &ProcessError::failed("boom"));

        assert_eq!(handler.count(), 1);
        assert_eq!(
            handler.failures(),
            vec![(
                "seda[orders] exchange 4".to_string(),
                "Processing failed: boom".to_string()
            )]
        );
    }

    #[test]
    fn test_logging_handler_walks_cause_chain() {
        let handler = LoggingExceptionHandler::new("resequencer");
        let nested = ProcessError::stage("audit", ProcessError::failed("disk full"));

        // Must not panic while walking sources
        handler.handle_exception("delivery of key 9", &nested);
        assert_eq!(handler.component(), "resequencer");
    }
}
