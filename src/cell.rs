//! The shared state cell backing every [`Promise`](crate::Promise) /
//! [`Defer`](crate::Defer) pair.
//!
//! A cell starts out `Pending` with two FIFO queues of continuations. The
//! one settlement call stores the outcome and drains the matching queue on
//! the caller's stack. Everything here assumes a single owning thread; the
//! `Rc` handles make the public types `!Send + !Sync`, which is what turns
//! that assumption into a compile-time guarantee.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use crate::SettleError;

pub(crate) type SuccessFn<T> = Box<dyn FnOnce(T)>;
pub(crate) type FailureFn<E> = Box<dyn FnOnce(E)>;

/// Settlement state of a cell. Once non-`Pending` it never changes again.
enum Outcome<T, E> {
    Pending,
    Resolved(T),
    Rejected(E),
}

struct CellInner<T, E> {
    outcome: Outcome<T, E>,
    on_success: Vec<SuccessFn<T>>,
    on_failure: Vec<FailureFn<E>>,
}

/// Reference-counted handle to one cell. Cloning aliases the same cell;
/// the cell is freed when the last handle drops. If that happens while
/// still pending, queued continuations are dropped without firing.
pub(crate) struct SharedCell<T, E> {
    inner: Rc<RefCell<CellInner<T, E>>>,
}

impl<T, E> Clone for SharedCell<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, E> SharedCell<T, E> {
    pub(crate) fn pending() -> Self {
        Self::with_outcome(Outcome::Pending)
    }

    pub(crate) fn settled(outcome: Result<T, E>) -> Self {
        Self::with_outcome(match outcome {
            Ok(value) => Outcome::Resolved(value),
            Err(error) => Outcome::Rejected(error),
        })
    }

    fn with_outcome(outcome: Outcome<T, E>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellInner {
                outcome,
                on_success: Vec::new(),
                on_failure: Vec::new(),
            })),
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        !matches!(self.inner.borrow().outcome, Outcome::Pending)
    }
}

impl<T: Clone, E: Clone> SharedCell<T, E> {
    /// Queue `f` if pending, fire it inline with a clone of the stored
    /// value if already resolved, drop it if already rejected.
    pub(crate) fn attach_success(&self, f: SuccessFn<T>) {
        let value = {
            let mut inner = self.inner.borrow_mut();
            match &inner.outcome {
                Outcome::Pending => {
                    inner.on_success.push(f);
                    return;
                }
                Outcome::Resolved(value) => Some(value.clone()),
                Outcome::Rejected(_) => None,
            }
        };
        // Borrow released before invoking: `f` may reattach or settle cells.
        if let Some(value) = value {
            f(value);
        }
    }

    /// Mirror image of [`attach_success`](Self::attach_success).
    pub(crate) fn attach_failure(&self, f: FailureFn<E>) {
        let error = {
            let mut inner = self.inner.borrow_mut();
            match &inner.outcome {
                Outcome::Pending => {
                    inner.on_failure.push(f);
                    return;
                }
                Outcome::Rejected(error) => Some(error.clone()),
                Outcome::Resolved(_) => None,
            }
        };
        if let Some(error) = error {
            f(error);
        }
    }

    /// The one-time transition out of `Pending`. Stores the outcome, then
    /// fires the matching queue in attachment order on the calling stack.
    ///
    /// Both queues are swapped out before the `RefCell` borrow is released,
    /// so a continuation that attaches to this same cell sees it settled and
    /// fires inline instead of corrupting the drain.
    pub(crate) fn settle(&self, outcome: Result<T, E>) -> Result<(), SettleError> {
        let mut inner = self.inner.borrow_mut();
        if !matches!(inner.outcome, Outcome::Pending) {
            return Err(SettleError::AlreadySettled);
        }
        let on_success = mem::take(&mut inner.on_success);
        let on_failure = mem::take(&mut inner.on_failure);
        match outcome {
            Ok(value) => {
                inner.outcome = Outcome::Resolved(value.clone());
                drop(inner);
                drop(on_failure);
                for f in on_success {
                    f(value.clone());
                }
            }
            Err(error) => {
                inner.outcome = Outcome::Rejected(error.clone());
                drop(inner);
                drop(on_success);
                for f in on_failure {
                    f(error.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn continuations_fire_in_attachment_order() {
        let cell: SharedCell<i32, ()> = SharedCell::pending();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            cell.attach_success(Box::new(move |_| order.borrow_mut().push(tag)));
        }
        cell.settle(Ok(1)).unwrap();
        assert_eq!(*order.borrow(), ["first", "second", "third"]);
    }

    #[test]
    fn reattach_during_drain_fires_inline() {
        let cell: SharedCell<i32, ()> = SharedCell::pending();
        let seen = Rc::new(Cell::new(0));
        {
            let cell = cell.clone();
            let seen = seen.clone();
            cell.clone().attach_success(Box::new(move |v| {
                let seen = seen.clone();
                // Attaching to the cell that is currently draining: it is
                // already settled, so this fires before attach returns.
                cell.attach_success(Box::new(move |w| seen.set(v + w)));
            }));
        }
        cell.settle(Ok(5)).unwrap();
        assert_eq!(seen.get(), 10);
    }

    #[test]
    fn settle_twice_reports_violation() {
        let cell: SharedCell<i32, i32> = SharedCell::pending();
        cell.settle(Ok(1)).unwrap();
        assert_eq!(cell.settle(Err(2)), Err(SettleError::AlreadySettled));
    }

    #[test]
    fn cross_kind_attachment_is_dropped() {
        let cell: SharedCell<i32, i32> = SharedCell::settled(Err(7));
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        cell.attach_success(Box::new(move |_| flag.set(true)));
        assert!(!fired.get());
    }
}
