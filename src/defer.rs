use std::cell::RefCell;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::cell::SharedCell;
use crate::Promise;

/// Consumer-side handle: observes or chains off an eventual outcome.
///
/// A `Defer` is deliberately not `Clone`: one handle per logical branch of
/// a chain. When the same outcome has to feed several branches, ask the
/// [`Promise`] for more handles with [`Promise::defer`].
///
/// Continuations always run on whichever stack settles the promise (or
/// inline, when attaching to an already settled cell); nothing is deferred
/// to an executor. If every handle to a pending cell is dropped, attached
/// continuations are discarded silently.
///
/// # Examples
///
/// ```
/// use defer_promise::{Defer, Promise};
///
/// let promise = Promise::<u32, String>::new();
/// let doubled = promise.defer().then(|n| n * 2);
/// promise.resolve(21);
/// doubled.success(|n| assert_eq!(n, 42));
/// ```
pub struct Defer<T, E> {
    cell: SharedCell<T, E>,
}

impl<T, E> Defer<T, E> {
    pub(crate) fn from_cell(cell: SharedCell<T, E>) -> Self {
        Self { cell }
    }

    /// Lifts a plain value into an already-resolved `Defer`.
    pub fn resolved(value: T) -> Self {
        Self::from_cell(SharedCell::settled(Ok(value)))
    }

    /// Lifts an error into an already-rejected `Defer`.
    pub fn failed(error: E) -> Self {
        Self::from_cell(SharedCell::settled(Err(error)))
    }
}

impl<T, E> Defer<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Registers a terminal success observer and hands the same `Defer`
    /// back, so `.success(..).fail(..)` covers both outcomes of one cell.
    ///
    /// `f` never runs if the cell rejects.
    pub fn success(self, f: impl FnOnce(T) + 'static) -> Self {
        self.cell.attach_success(Box::new(f));
        self
    }

    /// Registers a terminal failure observer; counterpart of
    /// [`success`](Self::success).
    pub fn fail(self, f: impl FnOnce(E) + 'static) -> Self {
        self.cell.attach_failure(Box::new(f));
        self
    }

    /// Maps the resolved value into a new downstream `Defer`.
    ///
    /// Rejection short-circuits: the error propagates to the returned
    /// `Defer` and `f` is never invoked. For stages that themselves return
    /// a `Defer`, use [`and_then`](Self::and_then).
    ///
    /// # Examples
    ///
    /// ```
    /// use defer_promise::{Defer, Promise};
    ///
    /// let promise = Promise::<u32, String>::new();
    /// let chained = promise
    ///     .defer()
    ///     .then(|n| n + 1)
    ///     .then(|n| n.to_string());
    /// promise.resolve(1);
    /// chained.success(|s| assert_eq!(s, "2"));
    /// ```
    pub fn then<U, F>(self, f: F) -> Defer<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        let next = Promise::new();
        let out = next.defer();
        let on_err = next.clone();
        self.cell
            .attach_success(Box::new(move |value| next.resolve(f(value))));
        self.cell
            .attach_failure(Box::new(move |error| on_err.reject(error)));
        out
    }

    /// Chains a stage that returns another `Defer` and adopts its outcome:
    /// the returned `Defer` settles when the inner one does, flattening one
    /// level of nesting per stage.
    ///
    /// # Examples
    ///
    /// ```
    /// use defer_promise::{Defer, Promise};
    ///
    /// fn lookup(id: u32) -> Defer<String, String> {
    ///     Defer::resolved(format!("user-{id}"))
    /// }
    ///
    /// let promise = Promise::<u32, String>::new();
    /// let name = promise.defer().and_then(lookup);
    /// promise.resolve(7);
    /// name.success(|n| assert_eq!(n, "user-7"));
    /// ```
    pub fn and_then<U, F>(self, f: F) -> Defer<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Defer<U, E> + 'static,
    {
        let next = Promise::new();
        let out = next.defer();
        let on_err = next.clone();
        self.cell
            .attach_success(Box::new(move |value| f(value).pipe(next)));
        self.cell
            .attach_failure(Box::new(move |error| on_err.reject(error)));
        out
    }

    /// Recovers from rejection with a plain value; a resolved outcome
    /// passes through unchanged.
    pub fn otherwise<F>(self, f: F) -> Defer<T, E>
    where
        F: FnOnce(E) -> T + 'static,
    {
        let next = Promise::new();
        let out = next.defer();
        let on_err = next.clone();
        self.cell
            .attach_success(Box::new(move |value| next.resolve(value)));
        self.cell
            .attach_failure(Box::new(move |error| on_err.resolve(f(error))));
        out
    }

    /// Recovers from rejection with another `Defer`, adopting its outcome;
    /// a resolved outcome passes through unchanged.
    pub fn or_else<F>(self, f: F) -> Defer<T, E>
    where
        F: FnOnce(E) -> Defer<T, E> + 'static,
    {
        let next = Promise::new();
        let out = next.defer();
        let on_err = next.clone();
        self.cell
            .attach_success(Box::new(move |value| next.resolve(value)));
        self.cell
            .attach_failure(Box::new(move |error| f(error).pipe(on_err)));
        out
    }

    /// Forwards this cell's eventual outcome into `into`.
    fn pipe(self, into: Promise<T, E>) {
        let on_err = into.clone();
        self.cell
            .attach_success(Box::new(move |value| into.resolve(value)));
        self.cell
            .attach_failure(Box::new(move |error| on_err.reject(error)));
    }
}

impl<T, E> fmt::Debug for Defer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defer")
            .field("settled", &self.cell.is_settled())
            .finish()
    }
}

/// `Future` adapter returned by `Defer`'s `IntoFuture` impl.
///
/// Built on the same continuation primitives as everything else: converting
/// attaches one success and one failure continuation that park the outcome
/// and wake the stored waker. If the cell is dropped while pending the
/// future is never woken; the silent-drop policy applies to awaiting too.
pub struct DeferFuture<T, E> {
    outcome: Rc<RefCell<Option<Result<T, E>>>>,
    waker: Rc<RefCell<Option<Waker>>>,
}

impl<T, E> IntoFuture for Defer<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = DeferFuture<T, E>;

    /// Makes a `Defer` awaitable on a single-threaded executor.
    ///
    /// # Examples
    ///
    /// ```
    /// use defer_promise::Defer;
    /// use futures::executor::block_on;
    ///
    /// let answer = block_on(async { Defer::<u32, String>::resolved(7).await });
    /// assert_eq!(answer, Ok(7));
    /// ```
    fn into_future(self) -> DeferFuture<T, E> {
        let outcome = Rc::new(RefCell::new(None));
        let waker: Rc<RefCell<Option<Waker>>> = Rc::new(RefCell::new(None));
        let (ok_slot, ok_waker) = (outcome.clone(), waker.clone());
        let (err_slot, err_waker) = (outcome.clone(), waker.clone());
        self.success(move |value| {
            *ok_slot.borrow_mut() = Some(Ok(value));
            if let Some(waker) = ok_waker.borrow_mut().take() {
                waker.wake();
            }
        })
        .fail(move |error| {
            *err_slot.borrow_mut() = Some(Err(error));
            if let Some(waker) = err_waker.borrow_mut().take() {
                waker.wake();
            }
        });
        DeferFuture { outcome, waker }
    }
}

impl<T, E> Future for DeferFuture<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.outcome.borrow_mut().take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                *self.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
