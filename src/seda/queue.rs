//! Thread-safe FIFO shared between SEDA producers and consumer workers
//!
//! One mutex guards the items; `not_empty` wakes pollers and `not_full` wakes
//! blocked producers. An item is either fully in the queue or not at all.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl<T> BoundedQueue<T> {
    /// Create a queue; `None` means unbounded
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::new(Some(capacity))
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    "Queue lock poisoned by a panicking thread; continuing with its contents"
                );
                poisoned.into_inner()
            }
        }
    }

    fn wait_on<'a>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, VecDeque<T>>,
        timeout: Duration,
    ) -> MutexGuard<'a, VecDeque<T>> {
        match condvar.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    fn is_full(&self, items: &VecDeque<T>) -> bool {
        self.capacity
            .is_some_and(|capacity| items.len() >= capacity)
    }

    fn push(&self, items: &mut VecDeque<T>, item: T) {
        items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Append without waiting; hands the item back if the queue is full
    pub fn offer(&self, item: T) -> Result<(), T> {
        let mut items = self.lock();
        if self.is_full(&items) {
            return Err(item);
        }
        self.push(&mut items, item);
        Ok(())
    }

    /// Append, waiting as long as needed for space
    pub fn put(&self, item: T) {
        let mut items = self.lock();
        while self.is_full(&items) {
            items = match self.not_full.wait(items) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        self.push(&mut items, item);
    }

    /// Append, waiting at most `timeout` for space; hands the item back on timeout
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.lock();
        while self.is_full(&items) {
            let now = Instant::now();
            if now >= deadline {
                return Err(item);
            }
            items = self.wait_on(&self.not_full, items, deadline - now);
        }
        self.push(&mut items, item);
        Ok(())
    }

    /// Take the head item, waiting at most `timeout`
    pub fn poll(&self, timeout: Duration) -> Option<T> {
        self.poll_until(timeout, || false)
    }

    /// Take the head item, waiting at most `timeout` or until `interrupted`
    /// returns true
    ///
    /// `interrupted` is checked under the queue lock whenever the poller wakes,
    /// so a flag set before [`interrupt_pollers`] is never missed. A queued
    /// item is returned even if `interrupted` is already true.
    ///
    /// [`interrupt_pollers`]: BoundedQueue::interrupt_pollers
    pub fn poll_until(&self, timeout: Duration, interrupted: impl Fn() -> bool) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.lock();
        loop {
            if let Some(item) = items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline || interrupted() {
                return None;
            }
            items = self.wait_on(&self.not_empty, items, deadline - now);
        }
    }

    /// Wake every waiting poller so it re-checks its interrupt condition
    pub fn interrupt_pollers(&self) {
        let _items = self.lock();
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Free slots, or `None` for an unbounded queue
    pub fn remaining_capacity(&self) -> Option<usize> {
        let len = self.len();
        self.capacity
            .map(|capacity| capacity.saturating_sub(len))
    }

    /// Remove every queued item in FIFO order
    pub fn drain(&self) -> Vec<T> {
        let drained: Vec<T> = self.lock().drain(..).collect();
        if !drained.is_empty() {
            self.not_full.notify_all();
        }
        drained
    }
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = BoundedQueue::unbounded();
        for i in 0..5 {
            queue.offer(i).unwrap();
        }

        let polled: Vec<_> = (0..5)
            .filter_map(|_| queue.poll(Duration::from_millis(10)))
            .collect();
        assert_eq!(polled, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
        assert_eq!(queue.remaining_capacity(), None);
    }

    #[test]
    fn test_offer_hands_item_back_when_full() {
        let queue = BoundedQueue::bounded(2);
        queue.offer("a").unwrap();
        queue.offer("b").unwrap();

        assert_eq!(queue.offer("c"), Err("c"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.remaining_capacity(), Some(0));
    }

    #[test]
    fn test_poll_times_out_on_empty_queue() {
        let queue: BoundedQueue<u8> = BoundedQueue::bounded(1);
        let start = Instant::now();

        assert_eq!(queue.poll(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_put_timeout_waits_for_space() {
        let queue = Arc::new(BoundedQueue::bounded(1));
        queue.offer(1).unwrap();

        assert_eq!(queue.put_timeout(2, Duration::from_millis(20)), Err(2));

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                queue.poll(Duration::from_millis(10))
            })
        };
        assert!(queue.put_timeout(3, Duration::from_secs(2)).is_ok());
        assert_eq!(consumer.join().unwrap(), Some(1));
        assert_eq!(queue.drain(), vec![3]);
    }

    #[test]
    fn test_blocking_put_resumes_after_poll() {
        let queue = Arc::new(BoundedQueue::bounded(1));
        queue.put(1);

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.put(2))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.poll(Duration::from_millis(10)), Some(1));
        producer.join().unwrap();
        assert_eq!(queue.poll(Duration::from_millis(100)), Some(2));
    }

    #[test]
    fn test_interrupt_wakes_waiting_poller() {
        let queue: Arc<BoundedQueue<u8>> = Arc::new(BoundedQueue::unbounded());
        let stop = Arc::new(AtomicBool::new(false));
        let poller = {
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let start = Instant::now();
                let result =
                    queue.poll_until(Duration::from_secs(10), || stop.load(Ordering::SeqCst));
                (result, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::SeqCst);
        queue.interrupt_pollers();

        let (result, waited) = poller.join().unwrap();
        assert_eq!(result, None);
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_interrupted_poll_still_returns_queued_item() {
        let queue = BoundedQueue::unbounded();
        queue.offer(9).unwrap();

        assert_eq!(queue.poll_until(Duration::from_secs(1), || true), Some(9));
        assert_eq!(queue.poll_until(Duration::from_secs(1), || true), None);
    }
}
