//! Producer-facing stream resequencer
//!
//! Wraps a [`ResequencerEngine`] with a capacity bound, a delivery thread and
//! a one-way lifecycle. Producers calling [`StreamResequencer::process`] wait
//! while the buffer is full instead of failing.

use crate::core::sync::{handle_mutex_poison, handle_rwlock_read, handle_rwlock_write};
use crate::exchange::{
    ExceptionHandler, LoggingExceptionHandler, ProcessError, ProcessResult, Processor,
};
use crate::resequencer::comparator::SequenceComparator;
use crate::resequencer::config::{ResequencerConfig, StopPolicy};
use crate::resequencer::engine::{ResequencerEngine, SequenceSender};
use crate::resequencer::error::{ResequencerError, ResequencerResult};
use crate::resequencer::scheduler::DeliveryScheduler;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use strum_macros::Display;

/// Lifecycle of a stream resequencer; transitions only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResequencerState {
    Created,
    Started,
    Stopping,
    Stopped,
}

pub struct StreamResequencer<E, C: SequenceComparator<E>> {
    name: String,
    engine: Arc<ResequencerEngine<E, C>>,
    scheduler: Mutex<Option<DeliveryScheduler>>,
    state: RwLock<ResequencerState>,
    handler: Arc<dyn ExceptionHandler>,
    capacity: usize,
    timeout: Duration,
    stop_policy: StopPolicy,
}

impl<E, C> StreamResequencer<E, C>
where
    E: Send + 'static,
    C: SequenceComparator<E> + 'static,
{
    /// Build a resequencer forwarding to `processor`
    pub fn new(
        name: impl Into<String>,
        processor: Arc<dyn Processor<E>>,
        comparator: C,
        config: &ResequencerConfig,
    ) -> Self {
        let sender: Arc<dyn SequenceSender<E>> = Arc::new(processor);
        let engine = ResequencerEngine::new(comparator, sender).configure(config);
        Self::with_engine(name, engine, config)
    }

    /// Wrap an already configured engine
    pub fn with_engine(
        name: impl Into<String>,
        engine: ResequencerEngine<E, C>,
        config: &ResequencerConfig,
    ) -> Self {
        let name = name.into();
        Self {
            handler: Arc::new(LoggingExceptionHandler::new(name.clone())),
            name,
            engine: Arc::new(engine),
            scheduler: Mutex::new(None),
            state: RwLock::new(ResequencerState::Created),
            capacity: config.capacity,
            timeout: config.timeout(),
            stop_policy: config.stop_policy,
        }
    }

    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stop_policy(&self) -> StopPolicy {
        self.stop_policy
    }

    pub fn engine(&self) -> &Arc<ResequencerEngine<E, C>> {
        &self.engine
    }

    pub fn size(&self) -> usize {
        self.engine.size()
    }

    pub fn last_delivered(&self) -> Option<C::Key> {
        self.engine.last_delivered()
    }

    pub fn state(&self) -> ResequencerState {
        match self.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn sync_error(message: String) -> ResequencerError {
        ResequencerError::Synchronisation { message }
    }

    /// Start the delivery thread
    pub fn start(&self) -> ResequencerResult<()> {
        let mut state = handle_rwlock_write(self.state.write(), Self::sync_error)?;
        if *state != ResequencerState::Created {
            return Err(ResequencerError::NotRunning { state: *state });
        }

        let scheduler = DeliveryScheduler::start(
            Arc::clone(&self.engine),
            Arc::clone(&self.handler),
            self.timeout,
            self.name.clone(),
        )?;
        *handle_mutex_poison(self.scheduler.lock(), Self::sync_error)? = Some(scheduler);
        *state = ResequencerState::Started;

        log::info!(
            "Resequencer '{}' started (capacity {}, timeout {:?})",
            self.name,
            self.capacity,
            self.timeout
        );
        Ok(())
    }

    /// Accept an element for reordering
    ///
    /// Blocks while `capacity` elements are buffered, rechecking every
    /// `timeout`. Capacity pressure is never returned as an error; stopping
    /// the resequencer releases blocked callers with `NotRunning`.
    ///
    /// Through an `Arc`, method syntax picks the [`Processor`] impl instead;
    /// call `StreamResequencer::process` to get the typed error.
    pub fn process(&self, element: E) -> ResequencerResult<()> {
        let state = self.state();
        if state != ResequencerState::Started {
            return Err(ResequencerError::NotRunning { state });
        }

        match self
            .engine
            .insert_within_capacity(element, self.capacity, self.timeout)
        {
            Ok(()) => {}
            Err(ResequencerError::Closed) => {
                return Err(ResequencerError::NotRunning {
                    state: self.state(),
                })
            }
            Err(e) => return Err(e),
        }

        let scheduler = handle_mutex_poison(self.scheduler.lock(), Self::sync_error)?;
        if let Some(scheduler) = scheduler.as_ref() {
            scheduler.request();
        }
        Ok(())
    }

    /// Stop accepting elements, join the delivery thread and settle the buffer
    ///
    /// Stopping an instance that never started moves it straight to
    /// `Stopped`. Stopping twice is a no-op.
    pub fn stop(&self) -> ResequencerResult<()> {
        {
            let mut state = handle_rwlock_write(self.state.write(), Self::sync_error)?;
            match *state {
                ResequencerState::Created => {
                    *state = ResequencerState::Stopped;
                    self.engine.close();
                    return Ok(());
                }
                ResequencerState::Stopping | ResequencerState::Stopped => return Ok(()),
                ResequencerState::Started => *state = ResequencerState::Stopping,
            }
        }

        log::debug!("Resequencer '{}' stopping", self.name);
        self.engine.close();

        let scheduler = handle_mutex_poison(self.scheduler.lock(), Self::sync_error)?.take();
        if let Some(mut scheduler) = scheduler {
            scheduler.stop();
        }

        self.settle_buffer();

        *handle_rwlock_write(self.state.write(), Self::sync_error)? = ResequencerState::Stopped;
        log::info!("Resequencer '{}' stopped", self.name);
        Ok(())
    }

    /// True once `start()` has succeeded and `stop()` has not been called
    pub fn is_running(&self) -> ResequencerResult<bool> {
        let state = handle_rwlock_read(self.state.read(), Self::sync_error)?;
        Ok(*state == ResequencerState::Started)
    }
}

impl<E, C> StreamResequencer<E, C>
where
    E: Send + 'static,
    C: SequenceComparator<E, Key = i64> + 'static,
{
    /// Build a resequencer for integer-keyed exchanges, seeding the cursor
    /// from `initial_sequence` when one is configured
    pub fn from_config(
        name: impl Into<String>,
        processor: Arc<dyn Processor<E>>,
        comparator: C,
        config: &ResequencerConfig,
    ) -> Self {
        let sender: Arc<dyn SequenceSender<E>> = Arc::new(processor);
        let mut engine = ResequencerEngine::new(comparator, sender).configure(config);
        if let Some(initial) = config.initial_sequence {
            engine = engine.with_last_delivered(initial);
        }
        Self::with_engine(name, engine, config)
    }
}

impl<E, C> Processor<E> for StreamResequencer<E, C>
where
    E: Send + 'static,
    C: SequenceComparator<E> + 'static,
{
    fn process(&self, element: E) -> ProcessResult<()> {
        StreamResequencer::process(self, element)
            .map_err(|e| ProcessError::stage(self.name.clone(), e))
    }
}

impl<E, C: SequenceComparator<E>> StreamResequencer<E, C> {
    /// Apply the stop policy to whatever is still buffered
    fn settle_buffer(&self) {
        match self.stop_policy {
            StopPolicy::Flush => {
                let outcome = self.engine.flush();
                for failure in &outcome.failures {
                    self.handler.handle_exception(&self.name, failure);
                }
                if outcome.delivered > 0 || !outcome.failures.is_empty() {
                    log::info!(
                        "Resequencer '{}' flushed {} buffered element(s) on stop ({} failed)",
                        self.name,
                        outcome.delivered,
                        outcome.failures.len()
                    );
                }
            }
            StopPolicy::Discard => {
                let dropped = self.engine.discard();
                if dropped > 0 {
                    log::warn!(
                        "Resequencer '{}' discarded {} buffered element(s) on stop",
                        self.name,
                        dropped
                    );
                }
            }
        }
    }
}

impl<E, C: SequenceComparator<E>> Drop for StreamResequencer<E, C> {
    fn drop(&mut self) {
        let started = matches!(
            self.state.read().map(|state| *state),
            Ok(ResequencerState::Started)
        );
        if started {
            log::debug!("Resequencer '{}' dropped while running", self.name);
            self.engine.close();
            if let Ok(mut scheduler) = self.scheduler.lock() {
                if let Some(mut scheduler) = scheduler.take() {
                    scheduler.stop();
                }
            }
            self.settle_buffer();
        }
    }
}
