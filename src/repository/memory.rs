//! In-memory aggregation repository

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::{AggregationRepository, RecoverableRepository};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct RepositoryState<E> {
    aggregates: HashMap<String, E>,
    in_flight: BTreeMap<u64, E>,
}

/// Repository keeping aggregates and unconfirmed completions in memory
///
/// Contents are lost with the process; recovery only covers completions
/// whose downstream processing failed while the process kept running.
///
/// # Example
///
/// ```rust
/// use seqroute::repository::{AggregationRepository, MemoryAggregationRepository};
///
/// let repository = MemoryAggregationRepository::new();
/// repository.add("order-7", vec!["line 1"]).unwrap();
/// let previous = repository.add("order-7", vec!["line 1", "line 2"]).unwrap();
/// assert_eq!(previous, Some(vec!["line 1"]));
///
/// let completed = repository.remove("order-7", 1).unwrap();
/// assert_eq!(completed.map(|lines| lines.len()), Some(2));
/// assert!(repository.confirm(1).unwrap());
/// ```
#[derive(Debug)]
pub struct MemoryAggregationRepository<E> {
    state: RwLock<RepositoryState<E>>,
}

impl<E> MemoryAggregationRepository<E> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RepositoryState {
                aggregates: HashMap::new(),
                in_flight: BTreeMap::new(),
            }),
        }
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, RepositoryState<E>>> {
        handle_rwlock_read(self.state.read(), |message| {
            RepositoryError::Synchronisation { message }
        })
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, RepositoryState<E>>> {
        handle_rwlock_write(self.state.write(), |message| {
            RepositoryError::Synchronisation { message }
        })
    }

    /// Number of aggregates still being built
    pub fn len(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.aggregates.len())
    }

    pub fn is_empty(&self) -> RepositoryResult<bool> {
        Ok(self.read()?.aggregates.is_empty())
    }
}

impl<E> Default for MemoryAggregationRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send + Sync> AggregationRepository<E> for MemoryAggregationRepository<E> {
    fn add(&self, key: &str, aggregate: E) -> RepositoryResult<Option<E>> {
        Ok(self.write()?.aggregates.insert(key.to_string(), aggregate))
    }

    fn get(&self, key: &str) -> RepositoryResult<Option<E>> {
        Ok(self.read()?.aggregates.get(key).cloned())
    }

    fn remove(&self, key: &str, completion_id: u64) -> RepositoryResult<Option<E>> {
        let mut state = self.write()?;
        if state.in_flight.contains_key(&completion_id) {
            return Err(RepositoryError::CompletionInFlight { completion_id });
        }
        let Some(aggregate) = state.aggregates.remove(key) else {
            return Ok(None);
        };
        state.in_flight.insert(completion_id, aggregate.clone());
        log::trace!("Aggregate '{}' in flight as completion {}", key, completion_id);
        Ok(Some(aggregate))
    }

    fn confirm(&self, completion_id: u64) -> RepositoryResult<bool> {
        let confirmed = self.write()?.in_flight.remove(&completion_id).is_some();
        if !confirmed {
            log::debug!("Confirm of unknown completion {}", completion_id);
        }
        Ok(confirmed)
    }

    fn keys(&self) -> RepositoryResult<Vec<String>> {
        let mut keys: Vec<String> = self.read()?.aggregates.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl<E: Clone + Send + Sync> RecoverableRepository<E> for MemoryAggregationRepository<E> {
    fn scan(&self) -> RepositoryResult<Vec<u64>> {
        Ok(self.read()?.in_flight.keys().copied().collect())
    }

    fn recover(&self, completion_id: u64) -> RepositoryResult<Option<E>> {
        Ok(self.read()?.in_flight.get(&completion_id).cloned())
    }
}
