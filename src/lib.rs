//! A single-threaded, non-blocking future/promise pair.
//!
//! [`Promise`] is the producer side: it settles the shared outcome exactly
//! once, via [`resolve`](Promise::resolve) or [`reject`](Promise::reject).
//! [`Defer`] is the consumer side: it attaches continuations, chains new
//! stages with [`then`](Defer::then) / [`and_then`](Defer::and_then) and
//! recovers from errors with [`otherwise`](Defer::otherwise) /
//! [`or_else`](Defer::or_else). The fan-in combinators [`join`] and
//! [`reduce`] merge many outcomes into one.
//!
//! Continuations run synchronously on whichever stack settles the promise;
//! there is no executor and no locking. Every handle is built on
//! `Rc` and is therefore `!Send + !Sync`: one thread owns a chain from
//! creation to settlement, and the compiler enforces it.
//!
//! # Examples
//!
//! ```
//! use defer_promise::{join, Defer, Promise};
//!
//! // A service hands out the consumer side, keeps the producer side, and
//! // settles it when its I/O completes.
//! fn fetch_len(payload: &'static str) -> Defer<usize, String> {
//!     let promise = Promise::new();
//!     let defer = promise.defer();
//!     promise.resolve(payload.len());
//!     defer
//! }
//!
//! let report = fetch_len("four")
//!     .then(|n| n * 10)
//!     .and_then(|n| Defer::resolved(format!("len x10 = {n}")));
//! report.success(|s| assert_eq!(s, "len x10 = 40"));
//!
//! let barrier = join([
//!     fetch_len("a").then(|_| ()),
//!     fetch_len("bc").then(|_| ()),
//! ]);
//! barrier.success(|_| println!("both fetches done"));
//! ```
//!
//! A [`Defer`] can also be awaited on a single-threaded executor; see its
//! `IntoFuture` impl.

use thiserror::Error;

mod cell;
pub mod combine;
pub mod defer;
pub mod promise;

pub use combine::{join, reduce};
pub use defer::{Defer, DeferFuture};
pub use promise::Promise;

/// Violation of the settle-once contract, reported by
/// [`Promise::try_resolve`] / [`Promise::try_reject`].
///
/// The panicking [`Promise::resolve`] / [`Promise::reject`] treat this as a
/// programming error and fail fast instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettleError {
    /// The cell already holds a resolved or rejected outcome.
    #[error("promise was already settled")]
    AlreadySettled,
}
