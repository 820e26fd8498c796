//! Staged Event-Driven (SEDA) Queue
//!
//! Decouples producers from a pool of consumer threads through a shared,
//! optionally bounded FIFO.
//!
//! # Overview
//!
//! - **Fail-fast or blocking submit**: a full bounded queue rejects a submit
//!   with `QueueSaturated`, or blocks the producer when `block_when_full` is set
//! - **Parallel consumers**: `concurrent_consumers` workers poll the queue with
//!   a timeout and call the downstream processor
//! - **Failure isolation**: a failing element is reported to the exception
//!   handler and the worker carries on
//! - **Requeue on stop**: an element polled after stop was requested goes
//!   back on the queue instead of being processed or lost
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  ┌────────────┐
//! │ Producer A │  │ Producer B │      submit
//! └─────┬──────┘  └─────┬──────┘
//!       ▼               ▼
//! ┌──────────────────────────────┐
//! │ SedaEndpoint                 │
//! │   BoundedQueue [e1][e2][e3]  │
//! └──────┬──────────┬──────────┬─┘
//!        │ poll     │ poll     │ poll
//!   seda-x-1    seda-x-2    seda-x-3     SedaConsumerPool
//!        │          │          │
//!        ▼          ▼          ▼
//!            Processor (no ordering across workers)
//! ```
//!
//! Departure order is not arrival order once more than one worker is
//! running; place a resequencer downstream to restore it.

mod config;
mod consumer;
mod endpoint;
mod error;
mod producer;
mod queue;

pub use config::SedaConfig;
pub use consumer::{PoolState, PoolStats, SedaConsumerPool, WorkerState};
pub use endpoint::SedaEndpoint;
pub use error::{SedaError, SedaResult};
pub use producer::SedaProducer;
pub use queue::BoundedQueue;

#[cfg(test)]
mod tests;
