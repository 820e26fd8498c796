//! Downstream processor boundary
//!
//! Both the resequencer's delivery path and the SEDA worker threads hand
//! elements to a [`Processor`]. Connectors and user code live behind this
//! trait.

use crate::exchange::error::ProcessResult;
use std::sync::Arc;

/// Receives elements from a stage
///
/// Implementations must be shareable between threads: a SEDA pool calls the
/// same processor from every worker.
pub trait Processor<E>: Send + Sync {
    fn process(&self, element: E) -> ProcessResult<()>;
}

impl<E, P> Processor<E> for Arc<P>
where
    P: Processor<E> + ?Sized,
{
    fn process(&self, element: E) -> ProcessResult<()> {
        (**self).process(element)
    }
}

/// Adapter turning a closure into a [`Processor`]
///
/// # Example
///
/// ```rust
/// use seqroute::exchange::{processor_fn, Exchange, Processor};
///
/// let printer = processor_fn(|exchange: Exchange| {
///     println!("{}", exchange.body);
///     Ok(())
/// });
/// printer.process(Exchange::new("hello")).unwrap();
/// ```
pub struct FnProcessor<F> {
    f: F,
}

impl<E, F> Processor<E> for FnProcessor<F>
where
    F: Fn(E) -> ProcessResult<()> + Send + Sync,
{
    fn process(&self, element: E) -> ProcessResult<()> {
        (self.f)(element)
    }
}

/// Wrap a closure as a processor
pub fn processor_fn<E, F>(f: F) -> FnProcessor<F>
where
    F: Fn(E) -> ProcessResult<()> + Send + Sync,
{
    FnProcessor { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ProcessError;
    use std::sync::Mutex;

    #[test]
    fn test_fn_processor_forwards_elements() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let processor = processor_fn(move |value: u32| {
            sink.lock().unwrap().push(value);
            Ok(())
        });

        processor.process(1).unwrap();
        processor.process(2).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_arc_dyn_processor_propagates_errors() {
        let processor: Arc<dyn Processor<u32>> = Arc::new(processor_fn(|value: u32| {
            if value % 2 == 0 {
                Ok(())
            } else {
                Err(ProcessError::failed(format!("odd value {}", value)))
            }
        }));

        assert!(processor.process(2).is_ok());
        let err = processor.process(3).unwrap_err();
        assert_eq!(err.to_string(), "Processing failed: odd value 3");
    }
}
