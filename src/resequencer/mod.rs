//! Gap-detecting Stream Resequencer
//!
//! Restores strict sequence order to an unbounded stream of elements that may
//! arrive out of order, without knowing the stream length or waiting for a
//! fixed batch.
//!
//! # Overview
//!
//! - **Contiguous delivery**: an element is forwarded as soon as its key is the
//!   immediate successor of the last delivered key, and runs cascade out
//! - **Gap timeout**: if the head of the buffer has waited longer than the
//!   timeout behind a missing key, it is forwarded anyway and the gap skipped
//! - **Backpressure**: producers block while the buffer holds `capacity`
//!   elements instead of receiving an error
//! - **Stop policy**: buffered elements are flushed in order (or discarded)
//!   when the resequencer stops
//!
//! # Architecture
//!
//! ```text
//!  producer threads                     delivery thread
//!  ────────────────                     ───────────────
//!  StreamResequencer::process           DeliveryScheduler
//!        │ wait while full                    │ wake on request or timeout
//!        ▼                                    ▼
//!  ┌──────────────────────────────────────────────────────┐
//!  │ ResequencerEngine                                    │
//!  │   ResequencerBuffer  [2][3]   [5][6]     last = 1    │
//!  │                            ^gap                      │
//!  └──────────────────────────────┬───────────────────────┘
//!                                 │ in key order
//!                                 ▼
//!                          SequenceSender
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use seqroute::exchange::{processor_fn, Exchange, Processor};
//! use seqroute::resequencer::{HeaderSequenceComparator, ResequencerConfig, StreamResequencer};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downstream: Arc<dyn Processor<Exchange>> = Arc::new(processor_fn(|exchange: Exchange| {
//!     println!("{}", exchange.body);
//!     Ok(())
//! }));
//!
//! let resequencer = StreamResequencer::from_config(
//!     "orders",
//!     downstream,
//!     HeaderSequenceComparator::new("seqno"),
//!     &ResequencerConfig::default(),
//! );
//! resequencer.start()?;
//! resequencer.process(Exchange::new("second").with_header("seqno", 2))?;
//! resequencer.process(Exchange::new("first").with_header("seqno", 1))?;
//! resequencer.stop()?;
//! # Ok(())
//! # }
//! ```

mod buffer;
mod comparator;
mod config;
mod engine;
mod error;
mod scheduler;
mod stream;

pub use buffer::ResequencerBuffer;
pub use comparator::{HeaderSequenceComparator, KeyFnComparator, SequenceComparator};
pub use config::{DuplicatePolicy, ResequencerConfig, StopPolicy};
pub use engine::{DeliveryOutcome, ResequencerEngine, SequenceSender};
pub use error::{ResequencerError, ResequencerResult};
pub use scheduler::{DeliveryScheduler, DELIVERY_THREAD_NAME};
pub use stream::{ResequencerState, StreamResequencer};

#[cfg(test)]
mod tests;
