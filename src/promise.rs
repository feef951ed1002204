use std::fmt;

use crate::cell::SharedCell;
use crate::{Defer, SettleError};

/// Producer-side handle: settles the shared cell exactly once.
///
/// A `Promise` is `Clone` so that several producer-side closures can alias
/// one logical completion (the fan-in combinators depend on this), but the
/// settle-once contract spans all clones: whichever handle settles first
/// wins, and `resolve`/`reject` on any later clone is a contract violation.
/// Use [`try_resolve`](Promise::try_resolve) / [`try_reject`](Promise::try_reject)
/// when losing that race is expected.
///
/// Dropping every handle to a still-pending cell discards its continuations
/// without firing them. Nothing reports this; a `Promise` you hand out is a
/// commitment to eventually settle it.
///
/// # Examples
///
/// ```
/// use defer_promise::Promise;
///
/// let promise = Promise::<String, String>::new();
/// let defer = promise.defer();
/// promise.resolve("done".into());
/// defer.success(|msg| assert_eq!(msg, "done"));
/// ```
pub struct Promise<T, E> {
    cell: SharedCell<T, E>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T, E> Default for Promise<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Promise<T, E> {
    /// Creates a promise over a fresh pending cell.
    pub fn new() -> Self {
        Self {
            cell: SharedCell::pending(),
        }
    }

    /// Returns a [`Defer`] observing this promise's eventual outcome.
    ///
    /// May be called more than once; every returned `Defer` observes the
    /// same settlement (broadcast), though the usual shape is one promise,
    /// one defer.
    pub fn defer(&self) -> Defer<T, E> {
        Defer::from_cell(self.cell.clone())
    }

    /// Whether this cell has already been resolved or rejected.
    pub fn is_settled(&self) -> bool {
        self.cell.is_settled()
    }
}

impl<T: Clone, E: Clone> Promise<T, E> {
    /// Resolves the cell, firing queued success continuations in attachment
    /// order on this call stack.
    ///
    /// # Panics
    ///
    /// Panics if the cell was already settled. Settling twice means the
    /// at-most-once contract was broken by caller code, so this fails fast
    /// rather than silently dropping the second outcome.
    pub fn resolve(self, value: T) {
        if self.try_resolve(value).is_err() {
            panic!("resolve called on an already settled promise");
        }
    }

    /// Rejects the cell, firing queued failure continuations.
    ///
    /// # Panics
    ///
    /// Panics if the cell was already settled, like [`resolve`](Self::resolve).
    pub fn reject(self, error: E) {
        if self.try_reject(error).is_err() {
            panic!("reject called on an already settled promise");
        }
    }

    /// Non-panicking [`resolve`](Self::resolve): reports
    /// [`SettleError::AlreadySettled`] when another handle settled first.
    pub fn try_resolve(self, value: T) -> Result<(), SettleError> {
        self.cell.settle(Ok(value))
    }

    /// Non-panicking [`reject`](Self::reject).
    pub fn try_reject(self, error: E) -> Result<(), SettleError> {
        self.cell.settle(Err(error))
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.cell.is_settled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn resolve_fires_continuation_attached_first() {
        let promise = Promise::<i32, ()>::new();
        let seen = Rc::new(Cell::new(0));
        let slot = seen.clone();
        let _defer = promise.defer().success(move |v| slot.set(v));
        promise.resolve(42);
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn resolve_fires_continuation_attached_after() {
        let promise = Promise::<i32, ()>::new();
        let defer = promise.defer();
        promise.resolve(42);
        let seen = Rc::new(Cell::new(0));
        let slot = seen.clone();
        defer.success(move |v| slot.set(v));
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn defer_broadcasts_to_every_handle() {
        let promise = Promise::<i32, ()>::new();
        let count = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let count = count.clone();
            promise
                .defer()
                .success(move |v| count.set(count.get() + v));
        }
        promise.resolve(1);
        assert_eq!(count.get(), 3);
    }

    #[test]
    #[should_panic(expected = "already settled")]
    fn resolving_twice_panics() {
        let promise = Promise::<i32, ()>::new();
        let twin = promise.clone();
        promise.resolve(1);
        twin.resolve(2);
    }

    #[test]
    fn try_resolve_reports_lost_race() {
        let promise = Promise::<i32, i32>::new();
        let twin = promise.clone();
        promise.resolve(1);
        assert!(twin.is_settled());
        // Err is the signal; nothing fires twice.
        assert_eq!(twin.try_reject(2), Err(SettleError::AlreadySettled));
    }

    #[test]
    fn dropping_pending_promise_is_silent() {
        let promise = Promise::<i32, ()>::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let defer = promise.defer().success(move |_| flag.set(true));
        drop(promise);
        drop(defer);
        assert!(!fired.get());
    }
}
