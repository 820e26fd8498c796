//! Gap-detecting resequencer engine
//!
//! The engine owns the buffer and the last-delivered cursor. Delivery does not
//! wait for a fixed batch: the head of the buffer is released as soon as it is
//! the immediate successor of the last delivered key, or once it has waited
//! longer than the timeout behind a gap. That way the stream length never has
//! to be known in advance.
//!
//! All buffer mutation happens under one mutex. Calls to [`deliver`] are
//! additionally serialised by a second lock held across the downstream send,
//! so concurrent deliveries cannot reorder output while inserts keep flowing.
//!
//! [`deliver`]: ResequencerEngine::deliver

use crate::core::sync::{handle_condvar_wait, handle_mutex_poison};
use crate::core::time::{SystemTimeProvider, TimeProvider};
use crate::exchange::{ProcessError, ProcessResult, Processor};
use crate::resequencer::buffer::ResequencerBuffer;
use crate::resequencer::comparator::SequenceComparator;
use crate::resequencer::config::{DuplicatePolicy, ResequencerConfig};
use crate::resequencer::error::{ResequencerError, ResequencerResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Receives elements from the engine in sequence order
pub trait SequenceSender<E>: Send + Sync {
    fn send_element(&self, element: E) -> ProcessResult<()>;
}

impl<E, P> SequenceSender<E> for P
where
    P: Processor<E> + ?Sized,
{
    fn send_element(&self, element: E) -> ProcessResult<()> {
        self.process(element)
    }
}

/// What a single `deliver()` or `flush()` call did
#[derive(Debug, Default)]
pub struct DeliveryOutcome {
    /// Elements accepted by the sender
    pub delivered: usize,
    /// Elements released across a gap after the timeout
    pub gaps_skipped: usize,
    /// Elements at or below the cursor that were dropped
    pub stale_dropped: usize,
    /// Sender failures and panics; each failed element is lost
    pub failures: Vec<ResequencerError>,
}

impl DeliveryOutcome {
    pub fn is_idle(&self) -> bool {
        self.delivered == 0
            && self.gaps_skipped == 0
            && self.stale_dropped == 0
            && self.failures.is_empty()
    }
}

struct EngineState<K, E> {
    buffer: ResequencerBuffer<K, E>,
    last_delivered: Option<K>,
    closed: bool,
}

enum NextStep<K, E> {
    Send(K, E),
    Idle,
}

pub struct ResequencerEngine<E, C: SequenceComparator<E>> {
    comparator: C,
    sender: Arc<dyn SequenceSender<E>>,
    state: Mutex<EngineState<C::Key, E>>,
    space_available: Condvar,
    delivery_lock: Mutex<()>,
    clock: Arc<dyn TimeProvider>,
    timeout: Duration,
    duplicate_policy: DuplicatePolicy,
    reject_old: bool,
    ignore_invalid: bool,
}

impl<E, C: SequenceComparator<E>> ResequencerEngine<E, C> {
    pub fn new(comparator: C, sender: Arc<dyn SequenceSender<E>>) -> Self {
        let defaults = ResequencerConfig::default();
        Self {
            comparator,
            sender,
            state: Mutex::new(EngineState {
                buffer: ResequencerBuffer::new(),
                last_delivered: None,
                closed: false,
            }),
            space_available: Condvar::new(),
            delivery_lock: Mutex::new(()),
            clock: Arc::new(SystemTimeProvider),
            timeout: defaults.timeout(),
            duplicate_policy: defaults.duplicate_policy,
            reject_old: defaults.reject_old,
            ignore_invalid: defaults.ignore_invalid,
        }
    }

    /// Apply timeout and policies from a configuration section
    ///
    /// `initial_sequence` is key-type specific and applied by the caller via
    /// [`with_last_delivered`](Self::with_last_delivered).
    pub fn configure(mut self, config: &ResequencerConfig) -> Self {
        self.timeout = config.timeout();
        self.duplicate_policy = config.duplicate_policy;
        self.reject_old = config.reject_old;
        self.ignore_invalid = config.ignore_invalid;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_reject_old(mut self, reject_old: bool) -> Self {
        self.reject_old = reject_old;
        self
    }

    pub fn with_ignore_invalid(mut self, ignore_invalid: bool) -> Self {
        self.ignore_invalid = ignore_invalid;
        self
    }

    pub fn with_time_provider(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the cursor so the element right after `key` is delivered immediately
    pub fn with_last_delivered(self, key: C::Key) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.last_delivered = Some(key);
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Number of buffered elements
    pub fn size(&self) -> usize {
        match self.state.lock() {
            Ok(state) => state.buffer.len(),
            Err(poisoned) => poisoned.into_inner().buffer.len(),
        }
    }

    pub fn last_delivered(&self) -> Option<C::Key> {
        match self.state.lock() {
            Ok(state) => state.last_delivered.clone(),
            Err(poisoned) => poisoned.into_inner().last_delivered.clone(),
        }
    }

    /// Buffered keys in sequence order
    pub fn buffered_keys(&self) -> Vec<C::Key> {
        match self.state.lock() {
            Ok(state) => state.buffer.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().buffer.keys().cloned().collect(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.closed,
            Err(poisoned) => poisoned.into_inner().closed,
        }
    }

    fn lock_state(&self) -> ResequencerResult<MutexGuard<'_, EngineState<C::Key, E>>> {
        handle_mutex_poison(self.state.lock(), |message| {
            ResequencerError::Synchronisation { message }
        })
    }

    /// Insert an element without waiting for capacity
    pub fn insert(&self, element: E) -> ResequencerResult<()> {
        let Some(key) = self.checked_key(&element)? else {
            return Ok(());
        };
        let mut state = self.lock_state()?;
        self.insert_locked(&mut state, key, element)
    }

    /// Insert an element, waiting while `capacity` elements are buffered
    ///
    /// Each wait lasts at most `max_wait` before the size is rechecked. Space
    /// is signalled whenever delivery removes an element. Returns `Closed` if
    /// the engine is closed while waiting.
    pub fn insert_within_capacity(
        &self,
        element: E,
        capacity: usize,
        max_wait: Duration,
    ) -> ResequencerResult<()> {
        let Some(key) = self.checked_key(&element)? else {
            return Ok(());
        };
        let mut state = self.lock_state()?;
        loop {
            if state.closed {
                return Err(ResequencerError::Closed);
            }
            if state.buffer.len() < capacity {
                break;
            }
            log::trace!(
                "Resequencer at capacity ({}), waiting up to {:?} for delivery",
                capacity,
                max_wait
            );
            let (guard, _timed_out) = handle_condvar_wait(
                self.space_available.wait_timeout(state, max_wait),
                |message| ResequencerError::Synchronisation { message },
            )?;
            state = guard;
        }
        self.insert_locked(&mut state, key, element)
    }

    fn checked_key(&self, element: &E) -> ResequencerResult<Option<C::Key>> {
        match self.comparator.sequence_key(element) {
            Some(key) => Ok(Some(key)),
            None if self.ignore_invalid => {
                log::warn!("Ignoring element without a valid sequence key");
                Ok(None)
            }
            None => Err(ResequencerError::InvalidSequence),
        }
    }

    fn insert_locked(
        &self,
        state: &mut EngineState<C::Key, E>,
        key: C::Key,
        element: E,
    ) -> ResequencerResult<()> {
        if state.closed {
            return Err(ResequencerError::Closed);
        }
        if self.reject_old {
            if let Some(last) = &state.last_delivered {
                if key <= *last {
                    return Err(ResequencerError::Rejected {
                        key: format!("{:?}", key),
                        last_delivered: format!("{:?}", last),
                    });
                }
            }
        }

        let arrived = self.clock.now();
        let debug_key = format!("{:?}", key);
        if !state
            .buffer
            .insert(key, element, arrived, self.duplicate_policy)
        {
            return Err(ResequencerError::DuplicateKey { key: debug_key });
        }
        log::trace!(
            "Buffered sequence key {} ({} buffered)",
            debug_key,
            state.buffer.len()
        );
        Ok(())
    }

    /// Forward every element that is ready
    ///
    /// Contiguous runs after the cursor cascade out in one call; the head of
    /// the buffer is also released once it has waited `timeout` behind a gap.
    /// Calling this with nothing ready changes nothing.
    pub fn deliver(&self) -> DeliveryOutcome {
        self.deliver_pending(false)
    }

    /// Forward every buffered element in key order, ignoring gaps
    pub fn flush(&self) -> DeliveryOutcome {
        self.deliver_pending(true)
    }

    /// Drop every buffered element, returning how many were dropped
    pub fn discard(&self) -> usize {
        let dropped = match self.lock_state() {
            Ok(mut state) => state.buffer.drain().len(),
            Err(_) => 0,
        };
        self.space_available.notify_all();
        dropped
    }

    /// Refuse further inserts and wake producers waiting for capacity
    pub fn close(&self) {
        match self.state.lock() {
            Ok(mut state) => state.closed = true,
            Err(poisoned) => poisoned.into_inner().closed = true,
        }
        self.space_available.notify_all();
    }

    fn deliver_pending(&self, force: bool) -> DeliveryOutcome {
        let _serial = match self.delivery_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut outcome = DeliveryOutcome::default();

        loop {
            let step = match self.lock_state() {
                Ok(mut state) => self.next_step(&mut state, force, &mut outcome),
                Err(e) => {
                    outcome.failures.push(e);
                    break;
                }
            };

            match step {
                NextStep::Send(key, element) => {
                    self.space_available.notify_all();
                    let sent = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.sender.send_element(element)
                    }))
                    .unwrap_or_else(|payload| Err(ProcessError::from_panic(payload.as_ref())));
                    match sent {
                        Ok(()) => outcome.delivered += 1,
                        Err(source) => outcome.failures.push(ResequencerError::Delivery {
                            key: format!("{:?}", key),
                            source,
                        }),
                    }
                }
                NextStep::Idle => break,
            }
        }

        if outcome.stale_dropped > 0 {
            self.space_available.notify_all();
        }
        outcome
    }

    /// Pick the next element to send, advancing the cursor before it leaves
    fn next_step(
        &self,
        state: &mut EngineState<C::Key, E>,
        force: bool,
        outcome: &mut DeliveryOutcome,
    ) -> NextStep<C::Key, E> {
        loop {
            let Some(first) = state.buffer.first_key().cloned() else {
                return NextStep::Idle;
            };

            if let Some(last) = &state.last_delivered {
                if first <= *last {
                    state.buffer.pop_first();
                    outcome.stale_dropped += 1;
                    log::warn!(
                        "Dropping stale sequence key {:?}: last delivered key is {:?}",
                        first,
                        last
                    );
                    continue;
                }
            }

            let adjacent = state
                .last_delivered
                .as_ref()
                .is_some_and(|last| self.comparator.is_successor(&first, last));
            let expired = state
                .buffer
                .oldest_age(self.clock.now())
                .is_some_and(|age| age >= self.timeout);

            if !(adjacent || expired || force) {
                return NextStep::Idle;
            }

            if !adjacent {
                if let Some(last) = &state.last_delivered {
                    outcome.gaps_skipped += 1;
                    log::debug!(
                        "Gap after sequence key {:?}: releasing {:?}",
                        last,
                        first
                    );
                }
            }

            return match state.buffer.pop_first() {
                Some((key, element)) => {
                    state.last_delivered = Some(key.clone());
                    NextStep::Send(key, element)
                }
                None => NextStep::Idle,
            };
        }
    }
}
