//! Fan-in combinators layered on the [`Promise`]/[`Defer`] primitives.
//!
//! Both combinators share one skeleton: a countdown shared by every input's
//! success continuation, and first-error-wins rejection. Settlement of the
//! output goes through `try_resolve`/`try_reject` so completions arriving
//! after a first error are no-ops instead of double-settlement violations.
//! Input completion order is unconstrained.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{Defer, Promise};

/// Resolves once every input has resolved; rejects with the first observed
/// error. Inputs that settle after that first error are ignored. An empty
/// input set resolves immediately.
///
/// # Examples
///
/// ```
/// use defer_promise::{join, Defer, Promise};
///
/// let a = Promise::<(), String>::new();
/// let b = Promise::<(), String>::new();
/// let all = join([a.defer(), b.defer(), Defer::resolved(())]);
/// let all = all.success(|_| println!("every backend finished"));
/// b.resolve(());
/// a.resolve(());
/// # let _ = all;
/// ```
pub fn join<E, I>(inputs: I) -> Defer<(), E>
where
    E: Clone + 'static,
    I: IntoIterator<Item = Defer<(), E>>,
{
    let output = Promise::new();
    let joined = output.defer();
    let inputs: Vec<_> = inputs.into_iter().collect();
    if inputs.is_empty() {
        output.resolve(());
        return joined;
    }
    let remaining = Rc::new(Cell::new(inputs.len()));
    for input in inputs {
        let remaining = remaining.clone();
        let on_done = output.clone();
        let on_err = output.clone();
        input
            .success(move |_| {
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let _ = on_done.try_resolve(());
                }
            })
            .fail(move |error| {
                let _ = on_err.try_reject(error);
            });
    }
    joined
}

/// Folds every input's value into one accumulator as completions arrive;
/// rejects with the first observed error.
///
/// Fold order equals completion order, which is unconstrained, so `combine`
/// must not care about ordering (or the caller must know the inputs settle
/// in a fixed sequence). An empty input set resolves to `seed`.
///
/// # Examples
///
/// ```
/// use defer_promise::{reduce, Defer};
///
/// let total = reduce(
///     [Defer::<u32, String>::resolved(1), Defer::resolved(2), Defer::resolved(3)],
///     |sum, n| sum + n,
///     0,
/// );
/// total.success(|sum| assert_eq!(sum, 6));
/// ```
pub fn reduce<R, A, E, F, I>(inputs: I, combine: F, seed: A) -> Defer<A, E>
where
    R: Clone + 'static,
    A: Clone + 'static,
    E: Clone + 'static,
    F: Fn(A, R) -> A + 'static,
    I: IntoIterator<Item = Defer<R, E>>,
{
    let output = Promise::new();
    let reduced = output.defer();
    let inputs: Vec<_> = inputs.into_iter().collect();
    if inputs.is_empty() {
        output.resolve(seed);
        return reduced;
    }
    let remaining = Rc::new(Cell::new(inputs.len()));
    let acc = Rc::new(RefCell::new(Some(seed)));
    let combine = Rc::new(combine);
    for input in inputs {
        let remaining = remaining.clone();
        let acc = acc.clone();
        let combine = combine.clone();
        let on_done = output.clone();
        let on_err = output.clone();
        input
            .success(move |value| {
                let finished = {
                    let mut slot = acc.borrow_mut();
                    if let Some(current) = slot.take() {
                        *slot = Some(combine(current, value));
                    }
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        slot.take()
                    } else {
                        None
                    }
                };
                // Accumulator borrow released before settling: downstream
                // continuations run on this stack.
                if let Some(result) = finished {
                    let _ = on_done.try_resolve(result);
                }
            })
            .fail(move |error| {
                let _ = on_err.try_reject(error);
            });
    }
    reduced
}
