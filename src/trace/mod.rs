//! Route tracing
//!
//! A [`RouteTracer`] keeps the most recent trace events of each traced node
//! in a bounded ring ([`TraceBuffer`]), so tracing a long-running route never
//! grows without limit. Wrap any exchange processor in a
//! [`TracingProcessor`] to record what it received and how it finished.
//!
//! Tracing starts disabled; enabling it is a runtime switch and costs one
//! atomic load per exchange while off.

mod error;
mod event;
mod processor;
mod tracer;

pub use error::{TraceError, TraceResult};
pub use event::{TraceEvent, TraceKind};
pub use processor::TracingProcessor;
pub use tracer::{RouteTracer, TraceBuffer, DEFAULT_TRACE_QUEUE_SIZE};
