//! Tests for pool shutdown and requeue of in-flight elements

#[cfg(test)]
mod tests {
    use crate::exchange::{processor_fn, CollectingExceptionHandler, ExceptionHandler, Processor};
    use crate::seda::{PoolState, SedaConfig, SedaEndpoint, WorkerState};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(2) {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    /// Processor that blocks on the first element until released
    fn gated_processor() -> (Arc<dyn Processor<u32>>, mpsc::Sender<()>, Arc<Mutex<Vec<u32>>>) {
        let (release, gate) = mpsc::channel::<()>();
        let gate = Mutex::new(gate);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let processor: Arc<dyn Processor<u32>> = Arc::new(processor_fn(move |value: u32| {
            if value == 1 {
                let _ = gate.lock().unwrap().recv_timeout(Duration::from_secs(5));
            }
            sink.lock().unwrap().push(value);
            Ok(())
        }));
        (processor, release, seen)
    }

    #[test]
    fn test_element_polled_during_stop_is_requeued() {
        let endpoint = SedaEndpoint::new(
            "requeue",
            SedaConfig {
                poll_timeout_ms: 50,
                ..SedaConfig::default()
            },
        );
        let (processor, release, seen) = gated_processor();
        let pool = Arc::new(endpoint.create_consumer_pool(
            processor,
            Arc::new(CollectingExceptionHandler::new()),
        ));
        pool.start().unwrap();

        let producer = endpoint.create_producer();
        producer.submit(1).unwrap();
        assert!(wait_for(|| pool.worker_states() == vec![WorkerState::Processing]));
        producer.submit(2).unwrap();

        let stopper = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.stop())
        };
        assert!(wait_for(|| pool.state() == PoolState::Stopping));

        // The worker finishes element 1, polls element 2, sees the stop and puts it back
        release.send(()).unwrap();
        stopper.join().unwrap().unwrap();

        assert_eq!(pool.state(), PoolState::Stopped);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(endpoint.queue().drain(), vec![2]);
        let stats = pool.stats();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.requeued, 1);
        assert_eq!(stats.lost, 0);
        println!("✓ Element polled during shutdown was returned to the queue");
    }

    #[test]
    fn test_requeue_loss_is_reported_when_queue_stays_full() {
        let endpoint = SedaEndpoint::new(
            "full-on-stop",
            SedaConfig {
                size: Some(1),
                poll_timeout_ms: 50,
                shutdown_grace_ms: 30,
                ..SedaConfig::default()
            },
        );
        let (processor, release, _seen) = gated_processor();
        let handler = Arc::new(CollectingExceptionHandler::new());
        let pool = Arc::new(endpoint.create_consumer_pool(
            processor,
            Arc::clone(&handler) as Arc<dyn ExceptionHandler>,
        ));
        pool.start().unwrap();

        let producer = endpoint.create_producer();
        producer.submit(1).unwrap();
        assert!(wait_for(|| pool.worker_states() == vec![WorkerState::Processing]));
        producer.submit(2).unwrap();

        let stopper = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.stop())
        };
        assert!(wait_for(|| pool.state() == PoolState::Stopping));

        // Fill the only slot as soon as the worker takes element 2
        let filler = {
            let queue = Arc::clone(endpoint.queue());
            thread::spawn(move || queue.put_timeout(3, Duration::from_secs(1)))
        };
        release.send(()).unwrap();
        stopper.join().unwrap().unwrap();
        let _ = filler.join().unwrap();

        let stats = pool.stats();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.requeued + stats.lost, 1);
        if stats.lost == 1 {
            let failures = handler.failures();
            assert!(failures[0].1.contains("could not requeue within 30ms"));
        }
    }

    #[test]
    fn test_stop_returns_promptly_for_idle_pool() {
        let endpoint: Arc<SedaEndpoint<u32>> = SedaEndpoint::new(
            "idle",
            SedaConfig {
                concurrent_consumers: 4,
                poll_timeout_ms: 10_000,
                ..SedaConfig::default()
            },
        );
        let pool = endpoint.create_consumer_pool(
            Arc::new(processor_fn(|_: u32| Ok(()))),
            Arc::new(CollectingExceptionHandler::new()),
        );
        pool.start().unwrap();
        assert!(wait_for(|| pool
            .worker_states()
            .iter()
            .all(|state| *state == WorkerState::Polling)));

        let start = Instant::now();
        pool.stop().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(pool
            .worker_states()
            .iter()
            .all(|state| *state == WorkerState::Stopped));
    }

    #[test]
    fn test_stop_before_start() {
        let endpoint: Arc<SedaEndpoint<u32>> = SedaEndpoint::new("unused", SedaConfig::default());
        let pool = endpoint.create_consumer_pool(
            Arc::new(processor_fn(|_: u32| Ok(()))),
            Arc::new(CollectingExceptionHandler::new()),
        );

        pool.stop().unwrap();
        assert_eq!(pool.state(), PoolState::Stopped);
    }
}
