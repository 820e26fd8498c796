//! Processor wrapper that records trace events around a node

use crate::exchange::{Exchange, ProcessResult, Processor};
use crate::trace::event::TraceKind;
use crate::trace::tracer::RouteTracer;
use std::sync::Arc;

/// Records `received` before and `completed`/`failed` after the wrapped
/// processor runs
///
/// Trace failures are logged and never fail the exchange.
pub struct TracingProcessor {
    node: String,
    tracer: Arc<RouteTracer>,
    inner: Arc<dyn Processor<Exchange>>,
}

impl TracingProcessor {
    pub fn new(
        node: impl Into<String>,
        tracer: Arc<RouteTracer>,
        inner: Arc<dyn Processor<Exchange>>,
    ) -> Self {
        Self {
            node: node.into(),
            tracer,
            inner,
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    fn warn_on_trace_error<T>(&self, result: crate::trace::TraceResult<T>) {
        if let Err(e) = result {
            log::warn!("Tracing of node '{}' failed: {}", self.node, e);
        }
    }
}

impl Processor<Exchange> for TracingProcessor {
    fn process(&self, exchange: Exchange) -> ProcessResult<()> {
        if !self.tracer.is_enabled() {
            return self.inner.process(exchange);
        }

        self.warn_on_trace_error(self.tracer.record(&self.node, TraceKind::Received, &exchange));
        let exchange_id = exchange.id();
        let sequence = exchange
            .header(self.tracer.sequence_header())
            .map(str::to_string);

        let result = self.inner.process(exchange);
        let (kind, detail) = match &result {
            Ok(()) => (TraceKind::Completed, String::new()),
            Err(e) => (TraceKind::Failed, e.to_string()),
        };
        self.warn_on_trace_error(self.tracer.record_event(
            &self.node,
            kind,
            exchange_id,
            sequence,
            detail,
        ));
        result
    }
}
