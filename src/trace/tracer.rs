//! Per-route trace retention
//!
//! Each traced node keeps its own [`TraceBuffer`], a fixed-size ring that
//! evicts its oldest event when full. All buffers of a route live behind one
//! mutex in the [`RouteTracer`]; nothing is shared between routes.

use crate::core::sync::handle_mutex_poison;
use crate::exchange::Exchange;
use crate::trace::error::{TraceError, TraceResult};
use crate::trace::event::{TraceEvent, TraceKind};
use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_TRACE_QUEUE_SIZE: usize = 10;

/// Bounded ring of trace events for one node
#[derive(Debug, Clone)]
pub struct TraceBuffer {
    events: VecDeque<TraceEvent>,
    capacity: usize,
    evicted: u64,
}

impl TraceBuffer {
    pub fn new(capacity: usize) -> TraceResult<Self> {
        if capacity == 0 {
            return Err(TraceError::InvalidQueueSize);
        }
        Ok(Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        })
    }

    /// Append `event`, dropping the oldest event if the ring is full
    pub fn push(&mut self, event: TraceEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
            self.evicted += 1;
        }
        self.events.push_back(event);
    }

    /// Take every retained event, oldest first
    pub fn drain(&mut self) -> Vec<TraceEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped to make room since the buffer was created
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

/// Trace recorder for one route
///
/// # Example
///
/// ```rust
/// use seqroute::exchange::Exchange;
/// use seqroute::trace::{RouteTracer, TraceKind};
///
/// let tracer = RouteTracer::new("orders", 2).unwrap();
/// tracer.set_enabled(true);
/// for seq in 1..=3 {
///     let exchange = Exchange::new("order").with_header("seqno", seq);
///     tracer.record("sink", TraceKind::Received, &exchange).unwrap();
/// }
///
/// // Only the newest two events are retained
/// let events = tracer.dump("sink").unwrap();
/// assert_eq!(events.len(), 2);
/// assert_eq!(events[0].sequence.as_deref(), Some("2"));
/// assert_eq!(tracer.trace_counter(), 3);
/// ```
#[derive(Debug)]
pub struct RouteTracer {
    route: String,
    queue_size: usize,
    sequence_header: String,
    enabled: AtomicBool,
    counter: AtomicU64,
    buffers: Mutex<BTreeMap<String, TraceBuffer>>,
}

impl RouteTracer {
    /// Create a disabled tracer retaining `queue_size` events per node
    pub fn new(route: impl Into<String>, queue_size: usize) -> TraceResult<Self> {
        if queue_size == 0 {
            return Err(TraceError::InvalidQueueSize);
        }
        Ok(Self {
            route: route.into(),
            queue_size,
            sequence_header: "seqno".to_string(),
            enabled: AtomicBool::new(false),
            counter: AtomicU64::new(0),
            buffers: Mutex::new(BTreeMap::new()),
        })
    }

    /// Header copied into each event's `sequence` field
    pub fn with_sequence_header(mut self, header: impl Into<String>) -> Self {
        self.sequence_header = header.into();
        self
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub fn sequence_header(&self) -> &str {
        &self.sequence_header
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Number of events recorded since creation or the last reset
    pub fn trace_counter(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    pub fn reset_trace_counter(&self) {
        self.counter.store(0, Ordering::Release);
    }

    fn lock_buffers(&self) -> TraceResult<MutexGuard<'_, BTreeMap<String, TraceBuffer>>> {
        handle_mutex_poison(self.buffers.lock(), |message| {
            TraceError::Synchronisation { message }
        })
    }

    /// Record an event for `exchange` at `node`
    ///
    /// Returns the event's uid, or `None` while tracing is disabled.
    pub fn record(
        &self,
        node: &str,
        kind: TraceKind,
        exchange: &Exchange,
    ) -> TraceResult<Option<u64>> {
        let detail = match kind {
            TraceKind::Received => exchange.body.clone(),
            TraceKind::Completed | TraceKind::Failed => String::new(),
        };
        self.record_event(
            node,
            kind,
            exchange.id(),
            exchange.header(&self.sequence_header).map(str::to_string),
            detail,
        )
    }

    /// Record an event from values captured before the exchange was handed on
    pub fn record_event(
        &self,
        node: &str,
        kind: TraceKind,
        exchange_id: u64,
        sequence: Option<String>,
        detail: String,
    ) -> TraceResult<Option<u64>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let mut buffers = self.lock_buffers()?;
        let uid = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        let event = TraceEvent {
            uid,
            timestamp: Utc::now(),
            route: self.route.clone(),
            node: node.to_string(),
            kind,
            exchange_id,
            sequence,
            detail,
        };

        match buffers.get_mut(node) {
            Some(buffer) => buffer.push(event),
            None => {
                let mut buffer = TraceBuffer::new(self.queue_size)?;
                buffer.push(event);
                buffers.insert(node.to_string(), buffer);
            }
        }
        Ok(Some(uid))
    }

    /// Take the retained events of one node, oldest first
    pub fn dump(&self, node: &str) -> TraceResult<Vec<TraceEvent>> {
        let mut buffers = self.lock_buffers()?;
        Ok(buffers
            .get_mut(node)
            .map(TraceBuffer::drain)
            .unwrap_or_default())
    }

    /// Take the retained events of every node, ordered by uid
    pub fn dump_all(&self) -> TraceResult<Vec<TraceEvent>> {
        let mut buffers = self.lock_buffers()?;
        let mut events: Vec<TraceEvent> = buffers
            .values_mut()
            .flat_map(TraceBuffer::drain)
            .collect();
        events.sort_by_key(|event| event.uid);
        Ok(events)
    }

    /// Names of nodes that have recorded at least one event
    pub fn nodes(&self) -> TraceResult<Vec<String>> {
        Ok(self.lock_buffers()?.keys().cloned().collect())
    }

    /// Total events evicted across all nodes
    pub fn evicted(&self) -> TraceResult<u64> {
        Ok(self.lock_buffers()?.values().map(TraceBuffer::evicted).sum())
    }

    /// Drop every retained event and forget all nodes
    pub fn clear(&self) -> TraceResult<()> {
        self.lock_buffers()?.clear();
        Ok(())
    }
}
