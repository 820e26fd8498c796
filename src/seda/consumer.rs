//! SEDA consumer worker pool
//!
//! Each worker loops over a timed poll of the shared queue and hands every
//! element to the downstream processor. Failures (including panics) are
//! isolated to the element that caused them and reported to the exception
//! handler, so one bad element never takes a worker down.
//!
//! Stopping is cooperative: workers finish the element they are processing,
//! and a worker that polled an element after the stop was requested puts it
//! back on the queue instead of processing or dropping it.

use crate::core::sync::{handle_mutex_poison, handle_rwlock_write};
use crate::exchange::{ExceptionHandler, ProcessError, Processor};
use crate::seda::error::{SedaError, SedaResult};
use crate::seda::queue::BoundedQueue;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use strum_macros::Display;

/// Pool lifecycle; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PoolState {
    Created,
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl PoolState {
    /// Workers may process elements in these states
    fn accepts_work(self) -> bool {
        matches!(self, PoolState::Starting | PoolState::Started)
    }
}

/// What an individual worker thread is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Polling,
    Processing,
    Draining,
    Stopped,
}

/// Counters across all workers of a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub processed: u64,
    pub failed: u64,
    pub requeued: u64,
    pub lost: u64,
}

#[derive(Debug, Default)]
struct PoolCounters {
    processed: AtomicU64,
    failed: AtomicU64,
    requeued: AtomicU64,
    lost: AtomicU64,
}

struct PoolShared {
    state: RwLock<PoolState>,
    workers: Mutex<Vec<WorkerState>>,
    counters: PoolCounters,
}

impl PoolShared {
    fn state(&self) -> PoolState {
        match self.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_worker(&self, index: usize, worker_state: WorkerState) {
        let mut workers = match self.workers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(slot) = workers.get_mut(index) {
            *slot = worker_state;
        }
    }
}

struct Worker<T> {
    index: usize,
    context: String,
    endpoint: String,
    queue: Arc<BoundedQueue<T>>,
    processor: Arc<dyn Processor<T>>,
    handler: Arc<dyn ExceptionHandler>,
    shared: Arc<PoolShared>,
    poll_timeout: Duration,
    shutdown_grace: Duration,
}

impl<T> Worker<T> {
    fn run(self) {
        log::debug!("{} started", self.context);
        loop {
            self.shared.set_worker(self.index, WorkerState::Polling);
            let polled = self
                .queue
                .poll_until(self.poll_timeout, || !self.shared.state().accepts_work());
            let accepting = self.shared.state().accepts_work();

            match polled {
                Some(element) if accepting => self.process(element),
                Some(element) => {
                    self.requeue(element);
                    break;
                }
                None if accepting => self.shared.set_worker(self.index, WorkerState::Idle),
                None => break,
            }
        }
        self.shared.set_worker(self.index, WorkerState::Stopped);
        log::debug!("{} stopped", self.context);
    }

    fn process(&self, element: T) {
        self.shared.set_worker(self.index, WorkerState::Processing);
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.processor.process(element)))
            .unwrap_or_else(|payload| Err(ProcessError::from_panic(payload.as_ref())));

        match result {
            Ok(()) => {
                self.shared.counters.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(source) => {
                self.shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.handler
                    .handle_exception(&self.context, &SedaError::Processing { source });
            }
        }
        self.shared.set_worker(self.index, WorkerState::Idle);
    }

    /// Put back an element polled after the stop was requested
    fn requeue(&self, element: T) {
        self.shared.set_worker(self.index, WorkerState::Draining);
        match self.queue.put_timeout(element, self.shutdown_grace) {
            Ok(()) => {
                self.shared.counters.requeued.fetch_add(1, Ordering::Relaxed);
                log::debug!("{} requeued an element polled during shutdown", self.context);
            }
            Err(_element) => {
                self.shared.counters.lost.fetch_add(1, Ordering::Relaxed);
                let error = SedaError::ShutdownRaceLoss {
                    endpoint: self.endpoint.clone(),
                    grace_ms: self.shutdown_grace.as_millis(),
                };
                self.handler.handle_exception(&self.context, &error);
            }
        }
    }
}

/// Pool of worker threads consuming one SEDA queue
pub struct SedaConsumerPool<T> {
    endpoint: String,
    queue: Arc<BoundedQueue<T>>,
    processor: Arc<dyn Processor<T>>,
    handler: Arc<dyn ExceptionHandler>,
    concurrent_consumers: usize,
    poll_timeout: Duration,
    shutdown_grace: Duration,
    shared: Arc<PoolShared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Send + 'static> SedaConsumerPool<T> {
    pub(crate) fn new(
        endpoint: String,
        queue: Arc<BoundedQueue<T>>,
        processor: Arc<dyn Processor<T>>,
        handler: Arc<dyn ExceptionHandler>,
    ) -> Self {
        Self {
            endpoint,
            queue,
            processor,
            handler,
            concurrent_consumers: 1,
            poll_timeout: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(5),
            shared: Arc::new(PoolShared {
                state: RwLock::new(PoolState::Created),
                workers: Mutex::new(Vec::new()),
                counters: PoolCounters::default(),
            }),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn with_concurrent_consumers(mut self, count: usize) -> Self {
        self.concurrent_consumers = count.max(1);
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn concurrent_consumers(&self) -> usize {
        self.concurrent_consumers
    }

    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        match self.shared.workers.lock() {
            Ok(workers) => workers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        PoolStats {
            processed: counters.processed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            requeued: counters.requeued.load(Ordering::Relaxed),
            lost: counters.lost.load(Ordering::Relaxed),
        }
    }

    fn sync_error(message: String) -> SedaError {
        SedaError::Synchronisation { message }
    }

    fn set_state(&self, state: PoolState) -> SedaResult<()> {
        *handle_rwlock_write(self.shared.state.write(), Self::sync_error)? = state;
        Ok(())
    }

    /// Spawn the worker threads
    pub fn start(&self) -> SedaResult<()> {
        {
            let mut state = handle_rwlock_write(self.shared.state.write(), Self::sync_error)?;
            if *state != PoolState::Created {
                return Err(SedaError::NotRunning { state: *state });
            }
            *state = PoolState::Starting;
        }

        *handle_mutex_poison(self.shared.workers.lock(), Self::sync_error)? =
            vec![WorkerState::Idle; self.concurrent_consumers];

        let mut handles = handle_mutex_poison(self.handles.lock(), Self::sync_error)?;
        for index in 0..self.concurrent_consumers {
            let name = format!("seda-{}-{}", self.endpoint, index + 1);
            let worker = Worker {
                index,
                context: name.clone(),
                endpoint: self.endpoint.clone(),
                queue: Arc::clone(&self.queue),
                processor: Arc::clone(&self.processor),
                handler: Arc::clone(&self.handler),
                shared: Arc::clone(&self.shared),
                poll_timeout: self.poll_timeout,
                shutdown_grace: self.shutdown_grace,
            };

            match thread::Builder::new().name(name).spawn(move || worker.run()) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    log::error!(
                        "Failed to spawn consumer {} for '{}': {}",
                        index + 1,
                        self.endpoint,
                        e
                    );
                    self.set_state(PoolState::Stopping)?;
                    self.queue.interrupt_pollers();
                    for handle in handles.drain(..) {
                        let _ = handle.join();
                    }
                    self.set_state(PoolState::Stopped)?;
                    return Err(SedaError::from(e));
                }
            }
        }
        drop(handles);

        self.set_state(PoolState::Started)?;
        log::info!(
            "SEDA endpoint '{}' started {} consumer(s)",
            self.endpoint,
            self.concurrent_consumers
        );
        Ok(())
    }

    /// Stop the pool and join every worker
    ///
    /// Elements already being processed complete first. Stopping a pool that
    /// never started moves it straight to `Stopped`; stopping twice is a no-op.
    pub fn stop(&self) -> SedaResult<()> {
        {
            let mut state = handle_rwlock_write(self.shared.state.write(), Self::sync_error)?;
            match *state {
                PoolState::Created => {
                    *state = PoolState::Stopped;
                    return Ok(());
                }
                PoolState::Stopping | PoolState::Stopped => return Ok(()),
                PoolState::Starting | PoolState::Started => *state = PoolState::Stopping,
            }
        }
        log::debug!("SEDA endpoint '{}' stopping", self.endpoint);
        self.queue.interrupt_pollers();

        let handles: Vec<_> =
            handle_mutex_poison(self.handles.lock(), Self::sync_error)?.drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                log::error!("A consumer thread of '{}' panicked", self.endpoint);
            }
        }

        self.set_state(PoolState::Stopped)?;
        let stats = self.stats();
        log::info!(
            "SEDA endpoint '{}' stopped: {} processed, {} failed, {} requeued, {} left in queue",
            self.endpoint,
            stats.processed,
            stats.failed,
            stats.requeued,
            self.queue.len()
        );
        Ok(())
    }
}

impl<T> Drop for SedaConsumerPool<T> {
    fn drop(&mut self) {
        let running = self.shared.state().accepts_work();
        if running {
            if let Ok(mut state) = self.shared.state.write() {
                *state = PoolState::Stopping;
            }
            self.queue.interrupt_pollers();
            if let Ok(mut handles) = self.handles.lock() {
                for handle in handles.drain(..) {
                    let _ = handle.join();
                }
            }
            if let Ok(mut state) = self.shared.state.write() {
                *state = PoolState::Stopped;
            }
        }
    }
}
