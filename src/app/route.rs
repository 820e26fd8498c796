//! The demo route driven by the CLI
//!
//! ```text
//! producer --> [seda: <name>-input] --> N workers --> resequencer --> sink
//! ```
//!
//! Workers hand exchanges to the resequencer in whatever order they finish,
//! and the resequencer restores sequence order before the sink sees them.

use crate::app::cli::config::RouteSettings;
use crate::core::error_handling::ContextualError;
use crate::core::shutdown::ShutdownFlag;
use crate::exchange::{Exchange, LoggingExceptionHandler, ProcessResult, Processor};
use crate::resequencer::{HeaderSequenceComparator, ResequencerError, StreamResequencer};
use crate::seda::{PoolStats, SedaEndpoint, SedaError};
use crate::trace::{RouteTracer, TraceError, TraceEvent, TracingProcessor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DRAIN_CHECK_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Seda(#[from] SedaError),

    #[error(transparent)]
    Resequencer(#[from] ResequencerError),

    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl ContextualError for RouteError {
    fn is_user_actionable(&self) -> bool {
        match self {
            RouteError::Seda(e) => e.is_user_actionable(),
            RouteError::Resequencer(e) => e.is_user_actionable(),
            RouteError::Trace(e) => e.is_user_actionable(),
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            RouteError::Seda(e) => e.user_message(),
            RouteError::Resequencer(e) => e.user_message(),
            RouteError::Trace(e) => e.user_message(),
        }
    }
}

pub type RouteResult<T> = Result<T, RouteError>;

/// What happened during one run of the route
#[derive(Debug, Clone, Default)]
pub struct RouteSummary {
    pub produced: u64,
    /// Sequence numbers deliberately left out
    pub skipped: u64,
    /// Submits refused by a full SEDA queue
    pub rejected: u64,
    pub delivered: u64,
    pub pool: PoolStats,
    pub interrupted: bool,
    pub elapsed: Duration,
    pub trace: Vec<TraceEvent>,
}

struct CountingProcessor {
    inner: Arc<dyn Processor<Exchange>>,
    delivered: Arc<AtomicU64>,
}

impl Processor<Exchange> for CountingProcessor {
    fn process(&self, exchange: Exchange) -> ProcessResult<()> {
        self.inner.process(exchange)?;
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn is_skipped(seq: u64, drop_every: Option<u64>) -> bool {
    drop_every.is_some_and(|n| seq % n == 0)
}

/// Produce `settings.route.count` exchanges through the route into `sink`
///
/// Production stops early once `shutdown` is set; whatever was already
/// accepted is still drained through the resequencer according to its stop
/// policy.
pub fn run_route(
    settings: &RouteSettings,
    sink: Arc<dyn Processor<Exchange>>,
    shutdown: ShutdownFlag,
) -> RouteResult<RouteSummary> {
    let started = Instant::now();
    let name = settings.route.name.as_str();
    let header = settings.resequencer.sequence_header.clone();

    let tracer = Arc::new(
        RouteTracer::new(name, settings.route.trace_size)?.with_sequence_header(header.clone()),
    );
    tracer.set_enabled(settings.route.trace);

    let delivered = Arc::new(AtomicU64::new(0));
    let output: Arc<dyn Processor<Exchange>> = Arc::new(CountingProcessor {
        inner: Arc::new(TracingProcessor::new("sink", Arc::clone(&tracer), sink)),
        delivered: Arc::clone(&delivered),
    });

    // Sequence numbers start at 1, so the first exchange needs no timeout
    let mut resequencer_config = settings.resequencer.clone();
    resequencer_config.initial_sequence.get_or_insert(0);

    let resequencer = Arc::new(StreamResequencer::from_config(
        format!("{}-resequencer", name),
        output,
        HeaderSequenceComparator::new(header.clone()),
        &resequencer_config,
    ));
    resequencer.start()?;

    let endpoint = SedaEndpoint::new(format!("{}-input", name), settings.seda.clone());
    let resequencer_input: Arc<dyn Processor<Exchange>> = resequencer.clone();
    let pool = endpoint.create_consumer_pool(
        Arc::new(TracingProcessor::new(
            "resequencer",
            Arc::clone(&tracer),
            resequencer_input,
        )),
        Arc::new(LoggingExceptionHandler::new(endpoint.name())),
    );
    pool.start()?;

    let producer = endpoint.create_producer();
    let mut summary = RouteSummary::default();
    for seq in 1..=settings.route.count {
        if shutdown.is_set() {
            summary.interrupted = true;
            log::info!("Shutdown requested after {} exchanges", summary.produced);
            break;
        }
        if is_skipped(seq, settings.route.drop_every) {
            log::debug!("Skipping sequence number {}", seq);
            summary.skipped += 1;
            continue;
        }

        let exchange = Exchange::new(format!("message {}", seq)).with_header(&header, seq);
        match producer.submit(exchange) {
            Ok(()) => summary.produced += 1,
            Err(SedaError::QueueSaturated { capacity }) => {
                log::warn!("Queue full (capacity {}); exchange {} rejected", capacity, seq);
                summary.rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    while endpoint.size() > 0 && !shutdown.is_set() {
        std::thread::sleep(DRAIN_CHECK_INTERVAL);
    }

    pool.stop()?;
    let stranded = endpoint.size();
    if stranded > 0 {
        log::warn!("{} exchanges left in queue '{}' after stop", stranded, endpoint.name());
    }
    resequencer.stop()?;

    summary.pool = pool.stats();
    summary.delivered = delivered.load(Ordering::Relaxed);
    summary.elapsed = started.elapsed();
    if tracer.is_enabled() {
        summary.trace = tracer.dump_all()?;
    }

    log::info!(
        "Route '{}' finished: produced {}, delivered {}, skipped {}, rejected {} in {:?}",
        name,
        summary.produced,
        summary.delivered,
        summary.skipped,
        summary.rejected,
        summary.elapsed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_every() {
        assert!(!is_skipped(3, None));
        assert!(is_skipped(6, Some(3)));
        assert!(!is_skipped(7, Some(3)));
    }
}
