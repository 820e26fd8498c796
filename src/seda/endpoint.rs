//! SedaEndpoint - named owner of one SEDA queue
//!
//! The endpoint is the coordination point between producers and the consumer
//! pool: it owns the queue and applies its configuration to every producer
//! and pool it creates. Producers hold only a weak reference, so dropping the
//! endpoint makes further submits fail with `EndpointClosed`.

use crate::exchange::{ExceptionHandler, Processor};
use crate::seda::config::SedaConfig;
use crate::seda::consumer::SedaConsumerPool;
use crate::seda::producer::SedaProducer;
use crate::seda::queue::BoundedQueue;
use std::sync::Arc;

/// Named SEDA queue with its producer and consumer settings
///
/// # Example
///
/// ```rust,no_run
/// use seqroute::exchange::{processor_fn, LoggingExceptionHandler};
/// use seqroute::seda::{SedaConfig, SedaEndpoint};
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SedaConfig { size: Some(100), concurrent_consumers: 3, ..SedaConfig::default() };
/// let endpoint = SedaEndpoint::new("work", config);
///
/// let pool = endpoint.create_consumer_pool(
///     Arc::new(processor_fn(|job: String| { println!("{}", job); Ok(()) })),
///     Arc::new(LoggingExceptionHandler::new("work")),
/// );
/// pool.start()?;
///
/// endpoint.create_producer().submit("job-1".to_string())?;
/// pool.stop()?;
/// # Ok(())
/// # }
/// ```
pub struct SedaEndpoint<T> {
    name: String,
    queue: Arc<BoundedQueue<T>>,
    config: SedaConfig,
}

impl<T: Send + 'static> SedaEndpoint<T> {
    pub fn new(name: impl Into<String>, config: SedaConfig) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            queue: Arc::new(BoundedQueue::new(config.size)),
            config,
        })
    }

    pub fn create_producer(self: &Arc<Self>) -> SedaProducer<T> {
        SedaProducer::new(
            self.name.clone(),
            Arc::downgrade(self),
            self.config.block_when_full,
            self.config.offer_timeout(),
        )
    }

    /// Create a (not yet started) consumer pool delivering to `processor`
    pub fn create_consumer_pool(
        &self,
        processor: Arc<dyn Processor<T>>,
        handler: Arc<dyn ExceptionHandler>,
    ) -> SedaConsumerPool<T> {
        SedaConsumerPool::new(self.name.clone(), Arc::clone(&self.queue), processor, handler)
            .with_concurrent_consumers(self.config.concurrent_consumers)
            .with_poll_timeout(self.config.poll_timeout())
            .with_shutdown_grace(self.config.shutdown_grace())
    }
}

impl<T> SedaEndpoint<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SedaConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<BoundedQueue<T>> {
        &self.queue
    }

    /// Number of elements waiting in the queue
    pub fn size(&self) -> usize {
        self.queue.len()
    }
}
