//! Synchronisation helpers for lock poisoning
//!
//! The resequencer and SEDA stages share state between producer, worker and
//! delivery threads. A panic inside a downstream processor can poison a lock;
//! these helpers turn that into the owning module's error type instead of
//! propagating the panic to every other thread.

use std::sync::{LockResult, MutexGuard, RwLockReadGuard, RwLockWriteGuard, WaitTimeoutResult};

/// Map a poisoned lock result into an application error
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use seqroute::core::sync::handle_mutex_poison;
/// use seqroute::seda::SedaError;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(
///     mutex.lock(),
///     |message| SedaError::Synchronisation { message }
/// ).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). A thread panicked while holding a lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Map a poisoned RwLock read into an application error
pub fn handle_rwlock_read<T, E>(
    result: LockResult<RwLockReadGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock read poisoned). A writer panicked while holding the lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Map a poisoned RwLock write into an application error
pub fn handle_rwlock_write<T, E>(
    result: LockResult<RwLockWriteGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (RwLock write poisoned). A thread panicked while holding the lock. PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Map a poisoned `Condvar::wait_timeout` result into an application error
///
/// The guard is returned together with whether the wait ended by timeout.
pub fn handle_condvar_wait<'a, T, E>(
    result: LockResult<(MutexGuard<'a, T>, WaitTimeoutResult)>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<(MutexGuard<'a, T>, bool), E> {
    result
        .map(|(guard, timeout)| (guard, timeout.timed_out()))
        .map_err(|poison_err| {
            error_constructor(format!(
                "Internal synchronisation error (condition wait poisoned). PoisonError: {:?}",
                poison_err
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Condvar, Mutex, RwLock};
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct TestError {
        message: String,
    }

    #[test]
    fn test_handle_mutex_poison_success() {
        let mutex = Arc::new(Mutex::new(42));
        let result = handle_mutex_poison(mutex.lock(), |message| TestError { message });

        assert_eq!(*result.unwrap(), 42);
    }

    #[test]
    fn test_handle_mutex_poison_with_poisoned_mutex() {
        let mutex = Arc::new(Mutex::new(42));
        let mutex_clone = Arc::clone(&mutex);

        let _ = thread::spawn(move || {
            let _guard = mutex_clone.lock().unwrap();
            panic!("Intentional panic to poison mutex");
        })
        .join();

        let error = handle_mutex_poison(mutex.lock(), |message| TestError { message }).unwrap_err();
        assert!(error.message.contains("mutex poisoned"));
    }

    #[test]
    fn test_handle_rwlock_read_and_write() {
        let rwlock = RwLock::new(1);

        *handle_rwlock_write(rwlock.write(), |message| TestError { message }).unwrap() = 7;
        let guard = handle_rwlock_read(rwlock.read(), |message| TestError { message }).unwrap();
        assert_eq!(*guard, 7);
    }

    #[test]
    fn test_handle_condvar_wait_reports_timeout() {
        let mutex = Mutex::new(());
        let condvar = Condvar::new();
        let guard = mutex.lock().unwrap();

        let (_guard, timed_out) = handle_condvar_wait(
            condvar.wait_timeout(guard, Duration::from_millis(5)),
            |message| TestError { message },
        )
        .unwrap();
        assert!(timed_out);
    }
}
