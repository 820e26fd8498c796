//! SEDA producer handle
//!
//! Producers append to their endpoint's queue. By default a full bounded
//! queue fails the submit with `QueueSaturated`; with `block_when_full` the
//! caller waits for space, optionally bounded by `offer_timeout`.

use crate::seda::endpoint::SedaEndpoint;
use crate::seda::error::{SedaError, SedaResult};
use std::sync::Weak;
use std::time::Duration;

/// Lightweight handle for submitting elements to a SEDA endpoint
///
/// # Example
///
/// ```rust,no_run
/// # use seqroute::seda::{SedaConfig, SedaEndpoint};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let endpoint = SedaEndpoint::new("orders", SedaConfig::default());
/// let producer = endpoint.create_producer();
/// producer.submit("order-1".to_string())?;
/// # Ok(())
/// # }
/// ```
pub struct SedaProducer<T> {
    endpoint_name: String,
    endpoint: Weak<SedaEndpoint<T>>,
    block_when_full: bool,
    offer_timeout: Option<Duration>,
}

impl<T> SedaProducer<T> {
    pub(crate) fn new(
        endpoint_name: String,
        endpoint: Weak<SedaEndpoint<T>>,
        block_when_full: bool,
        offer_timeout: Option<Duration>,
    ) -> Self {
        Self {
            endpoint_name,
            endpoint,
            block_when_full,
            offer_timeout,
        }
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    pub fn blocks_when_full(&self) -> bool {
        self.block_when_full
    }

    /// Enqueue an element for the consumer pool
    pub fn submit(&self, element: T) -> SedaResult<()> {
        let endpoint = self
            .endpoint
            .upgrade()
            .ok_or_else(|| SedaError::EndpointClosed {
                endpoint: self.endpoint_name.clone(),
            })?;
        let queue = endpoint.queue();
        let saturated = || SedaError::QueueSaturated {
            capacity: queue.capacity().unwrap_or_default(),
        };

        if !self.block_when_full {
            return queue.offer(element).map_err(|_| saturated());
        }

        match self.offer_timeout {
            Some(timeout) => queue
                .put_timeout(element, timeout)
                .map_err(|_| saturated()),
            None => {
                queue.put(element);
                Ok(())
            }
        }
    }
}

impl<T> Clone for SedaProducer<T> {
    fn clone(&self) -> Self {
        Self {
            endpoint_name: self.endpoint_name.clone(),
            endpoint: Weak::clone(&self.endpoint),
            block_when_full: self.block_when_full,
            offer_timeout: self.offer_timeout,
        }
    }
}
