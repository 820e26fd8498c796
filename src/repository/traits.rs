use crate::repository::error::RepositoryResult;

/// Key/value store for aggregates being built across many exchanges
///
/// An aggregate moves through three states: building (`add`/`get`), in
/// flight (taken by `remove` under a completion id) and gone (`confirm` once
/// downstream processing succeeded). Implementations may persist any of
/// them; callers only see these operations.
pub trait AggregationRepository<E>: Send + Sync {
    /// Store `aggregate` under `key`, returning the one it replaced
    fn add(&self, key: &str, aggregate: E) -> RepositoryResult<Option<E>>;

    fn get(&self, key: &str) -> RepositoryResult<Option<E>>;

    /// Take the completed aggregate for `key`, keeping it in flight as
    /// `completion_id` until confirmed
    fn remove(&self, key: &str, completion_id: u64) -> RepositoryResult<Option<E>>;

    /// Forget an in-flight completion; false if it was unknown
    fn confirm(&self, completion_id: u64) -> RepositoryResult<bool>;

    /// Keys of aggregates still being built
    fn keys(&self) -> RepositoryResult<Vec<String>>;
}

/// Repository that can hand back completions that were never confirmed
pub trait RecoverableRepository<E>: AggregationRepository<E> {
    /// Completion ids still in flight
    fn scan(&self) -> RepositoryResult<Vec<u64>>;

    fn recover(&self, completion_id: u64) -> RepositoryResult<Option<E>>;
}
