//! Synchronisation utilities for robust mutex handling
//!
//! Every `Mutex::lock` and `Condvar::wait*` in the crate goes through
//! [`handle_mutex_poison`] so that a panic on one thread surfaces as a
//! domain error on the others instead of a cascading panic.

use std::sync::LockResult;

/// Convert a poisoned lock result into an application error
///
/// Works for plain `lock()` results as well as the guard-carrying results
/// returned by `Condvar::wait`, `wait_while` and `wait_timeout_while`.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use loopbus::core::sync::handle_mutex_poison;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(mutex.lock(), |msg| msg).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|_| {
        error_constructor(
            "Internal synchronisation error (mutex poisoned). This indicates a panic occurred while holding a lock."
                .to_string(),
        )
    })
}
