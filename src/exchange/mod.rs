//! Exchange, processor and exception handler boundary types
//!
//! Everything outside the staged-delivery core (connectors, transformations,
//! sinks) meets it through these types:
//!
//! - [`Exchange`] is the unit of work moved between stages by value
//! - [`Processor`] receives elements from a SEDA worker or a resequencer
//! - [`ExceptionHandler`] receives failures that cannot be returned to a caller

mod error;
mod handler;
mod message;
mod processor;

pub use error::{ProcessError, ProcessResult};
pub use handler::{CollectingExceptionHandler, ExceptionHandler, LoggingExceptionHandler};
pub use message::Exchange;
pub use processor::{processor_fn, FnProcessor, Processor};
