//! A future that is settled from the outside.
//!
//! `Deferred` pairs a [`Resolver`] (the half that settles) with a [`Promise`]
//! (the half that is awaited). The registry keeps the resolver while the caller
//! awaits the promise.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{FetcherError, FetcherResult};

/// A resolve/reject pair together with the future they settle.
pub struct Deferred<T> {
    resolver: Resolver<T>,
    promise: Promise<T>,
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            resolver: Resolver { tx },
            promise: Promise { rx },
        }
    }

    /// Split into the settling half and the awaitable half.
    pub fn into_parts(self) -> (Resolver<T>, Promise<T>) {
        (self.resolver, self.promise)
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

/// The settling half of a [`Deferred`].
///
/// Settlement consumes the resolver, so a deferred can be settled at most once.
pub struct Resolver<T> {
    tx: oneshot::Sender<FetcherResult<T>>,
}

impl<T> Resolver<T> {
    /// Fulfil the promise with `value`.
    ///
    /// Returns `false` if nobody is awaiting the promise any more.
    pub fn resolve(self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Fail the promise with `error`.
    pub fn reject(self, error: FetcherError) -> bool {
        self.settle(Err(error))
    }

    pub fn settle(self, outcome: FetcherResult<T>) -> bool {
        self.tx.send(outcome).is_ok()
    }

    /// Whether the promise has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("abandoned", &self.is_abandoned())
            .finish()
    }
}

/// The awaitable half of a [`Deferred`].
///
/// Completes with [`FetcherError::Abandoned`] if the resolver is dropped
/// without settling.
pub struct Promise<T> {
    rx: oneshot::Receiver<FetcherResult<T>>,
}

impl<T> Future for Promise<T> {
    type Output = FetcherResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(FetcherError::abandoned(
                "resolver dropped before settlement",
            )),
        })
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").finish_non_exhaustive()
    }
}
