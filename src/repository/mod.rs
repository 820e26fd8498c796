//! Aggregation repository boundary
//!
//! Stages that accumulate state across exchanges (aggregators, for example)
//! keep it behind [`AggregationRepository`]. The storage format belongs to
//! the implementation; [`MemoryAggregationRepository`] is the in-process
//! default.

mod error;
mod memory;
mod traits;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::MemoryAggregationRepository;
pub use traits::{AggregationRepository, RecoverableRepository};
