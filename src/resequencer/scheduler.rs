//! Dedicated delivery thread for one resequencer

use crate::exchange::ExceptionHandler;
use crate::resequencer::comparator::SequenceComparator;
use crate::resequencer::engine::ResequencerEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DELIVERY_THREAD_NAME: &str = "resequencer-delivery";

#[derive(Debug)]
struct DeliverySignal {
    requested: Mutex<bool>,
    condition: Condvar,
    running: AtomicBool,
}

impl DeliverySignal {
    fn new() -> Self {
        Self {
            requested: Mutex::new(false),
            condition: Condvar::new(),
            running: AtomicBool::new(true),
        }
    }

    fn notify(&self) {
        match self.requested.lock() {
            Ok(mut requested) => *requested = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
        self.condition.notify_one();
    }

    /// Wait for a request or `interval`, whichever comes first
    fn wait(&self, interval: Duration) {
        let mut requested = match self.requested.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !*requested {
            requested = match self.condition.wait_timeout(requested, interval) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        *requested = false;
    }
}

/// Runs `deliver()` on a signal from a producer or every `interval`
///
/// Stopping lets an in-flight `deliver()` run to completion before the
/// thread exits.
pub struct DeliveryScheduler {
    signal: Arc<DeliverySignal>,
    handle: Option<JoinHandle<()>>,
}

impl DeliveryScheduler {
    pub fn start<E, C>(
        engine: Arc<ResequencerEngine<E, C>>,
        handler: Arc<dyn ExceptionHandler>,
        interval: Duration,
        context: String,
    ) -> std::io::Result<Self>
    where
        E: Send + 'static,
        C: SequenceComparator<E> + 'static,
    {
        let signal = Arc::new(DeliverySignal::new());
        let thread_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name(DELIVERY_THREAD_NAME.to_string())
            .spawn(move || {
                log::debug!("Delivery thread for '{}' started", context);
                loop {
                    thread_signal.wait(interval);
                    if !thread_signal.running.load(Ordering::Acquire) {
                        break;
                    }
                    let outcome = engine.deliver();
                    if outcome.gaps_skipped > 0 {
                        log::debug!(
                            "'{}' released {} element(s) across sequence gaps",
                            context,
                            outcome.gaps_skipped
                        );
                    }
                    for failure in &outcome.failures {
                        handler.handle_exception(&context, failure);
                    }
                }
                log::debug!("Delivery thread for '{}' stopped", context);
            })?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Ask for a delivery attempt without waiting for the interval
    pub fn request(&self) {
        self.signal.notify();
    }

    pub fn is_running(&self) -> bool {
        self.signal.running.load(Ordering::Acquire) && self.handle.is_some()
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        self.signal.running.store(false, Ordering::Release);
        self.signal.notify();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Delivery thread panicked before it could be joined");
            }
        }
    }
}

impl Drop for DeliveryScheduler {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{processor_fn, CollectingExceptionHandler, ProcessError};
    use crate::resequencer::comparator::KeyFnComparator;
    use crate::resequencer::engine::SequenceSender;
    use std::time::Instant;

    fn wait_until(deadline: Duration, condition: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_request_triggers_delivery_before_interval() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delivered);
        let sender: Arc<dyn SequenceSender<i64>> = Arc::new(processor_fn(move |value: i64| {
            sink.lock().unwrap().push(value);
            Ok(())
        }));
        let engine = Arc::new(
            ResequencerEngine::new(KeyFnComparator::new(|value: &i64| Some(*value)), sender)
                .with_last_delivered(0),
        );
        let handler = Arc::new(CollectingExceptionHandler::new());

        let mut scheduler = DeliveryScheduler::start(
            Arc::clone(&engine),
            handler,
            Duration::from_secs(30),
            "test".to_string(),
        )
        .unwrap();
        assert!(scheduler.is_running());

        engine.insert(1).unwrap();
        engine.insert(2).unwrap();
        scheduler.request();

        assert!(wait_until(Duration::from_secs(2), || delivered
            .lock()
            .unwrap()
            .len()
            == 2));
        scheduler.stop();
        assert!(!scheduler.is_running());
        assert_eq!(*delivered.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_failures_reach_exception_handler() {
        let sender: Arc<dyn SequenceSender<i64>> = Arc::new(processor_fn(|value: i64| {
            Err(ProcessError::failed(format!("cannot deliver {}", value)))
        }));
        let engine = Arc::new(
            ResequencerEngine::new(KeyFnComparator::new(|value: &i64| Some(*value)), sender)
                .with_last_delivered(0),
        );
        let handler = Arc::new(CollectingExceptionHandler::new());

        let mut scheduler = DeliveryScheduler::start(
            Arc::clone(&engine),
            Arc::clone(&handler) as Arc<dyn ExceptionHandler>,
            Duration::from_millis(20),
            "failing".to_string(),
        )
        .unwrap();

        engine.insert(1).unwrap();
        scheduler.request();

        assert!(wait_until(Duration::from_secs(2), || handler.count() == 1));
        scheduler.stop();

        let failures = handler.failures();
        assert_eq!(failures[0].0, "failing");
        assert!(failures[0].1.contains("cannot deliver 1"));
        assert_eq!(engine.size(), 0);
    }

    #[test]
    fn test_delivery_thread_survives_panicking_sender() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delivered);
        let sender: Arc<dyn SequenceSender<i64>> = Arc::new(processor_fn(move |value: i64| {
            if value == 1 {
                panic!("cannot deliver 1");
            }
            sink.lock().unwrap().push(value);
            Ok(())
        }));
        let engine = Arc::new(
            ResequencerEngine::new(KeyFnComparator::new(|value: &i64| Some(*value)), sender)
                .with_last_delivered(0),
        );
        let handler = Arc::new(CollectingExceptionHandler::new());

        let mut scheduler = DeliveryScheduler::start(
            Arc::clone(&engine),
            Arc::clone(&handler) as Arc<dyn ExceptionHandler>,
            Duration::from_secs(30),
            "panicking".to_string(),
        )
        .unwrap();

        engine.insert(1).unwrap();
        scheduler.request();
        assert!(wait_until(Duration::from_secs(2), || handler.count() == 1));

        engine.insert(2).unwrap();
        engine.insert(3).unwrap();
        scheduler.request();
        assert!(wait_until(Duration::from_secs(2), || delivered
            .lock()
            .unwrap()
            .len()
            == 2));

        assert!(scheduler.is_running());
        scheduler.stop();
        assert_eq!(*delivered.lock().unwrap(), vec![2, 3]);
        assert_eq!(engine.last_delivered(), Some(3));
        assert!(handler.failures()[0].1.contains("processor panicked: cannot deliver 1"));
    }
}
