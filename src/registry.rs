//! Pending-call registry for bridged requests.
//!
//! This module provides `PendingRequests`, which tracks in-flight requests by
//! token and settles them when the responder sees the matching response.
//!
//! # Lifecycle
//!
//! - The caller registers a token via `create(token)` before the request is triggered
//! - The responder calls `settle(token, outcome)` once the server round-trip completes
//! - The caller awaits the returned `Promise` without holding any lock
//!
//! Settlement takes the entry out of the table in a single lock acquisition before
//! firing it, so a duplicate settlement for the same token finds nothing and is a no-op.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::deferred::{Deferred, Promise, Resolver};
use crate::error::{FetcherError, FetcherResult};
use crate::token::RequestToken;

/// Tracks in-flight bridged requests and settles them by token.
///
/// One instance is shared (behind an `Arc`) by the `AsyncFetcher` that registers
/// requests and the `ServerFnResponder` that settles them. The table lives as long
/// as the application session; entries live from registration to settlement.
///
/// # Usage
///
/// ```
/// use async_fetcher::{PendingRequests, RequestToken};
///
/// # tokio_test::block_on(async {
/// let pending = PendingRequests::new();
/// let token = RequestToken::generate();
/// let promise = pending.create(token.clone()).expect("fresh token");
/// // ... trigger the request, later the responder calls:
/// pending.resolve(&token, serde_json::json!({ "ok": true }));
/// assert_eq!(promise.await.unwrap()["ok"], true);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct PendingRequests {
    pending: Mutex<HashMap<RequestToken, Resolver<Value>>>,
}

impl PendingRequests {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestToken, Resolver<Value>>> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            log::warn!(
                target: "async_fetcher::registry",
                "Recovered from poisoned pending-request lock"
            );
            poisoned.into_inner()
        })
    }

    /// Register a pending request and return the promise its waiter awaits.
    ///
    /// Must be called before the request is triggered so the response can always
    /// find its entry.
    ///
    /// Returns `None` if the token is already pending. The existing entry is kept.
    pub fn create(&self, token: RequestToken) -> Option<Promise<Value>> {
        let mut pending = self.lock();

        if pending.contains_key(&token) {
            return None;
        }

        let (resolver, promise) = Deferred::new().into_parts();
        pending.insert(token, resolver);

        Some(promise)
    }

    /// Settle a pending request with `outcome` and remove it.
    ///
    /// Returns `true` if a waiter received the outcome. An unknown token (already
    /// settled, or never registered here) is a no-op returning `false`.
    pub fn settle(&self, token: &RequestToken, outcome: FetcherResult<Value>) -> bool {
        // Release the lock before firing the channel.
        let resolver = self.lock().remove(token);

        match resolver {
            Some(resolver) => {
                let delivered = resolver.settle(outcome);
                if !delivered {
                    log::trace!(
                        target: "async_fetcher::registry",
                        "Waiter for {} went away before settlement",
                        token
                    );
                }
                delivered
            }
            None => false,
        }
    }

    /// Settle a pending request successfully.
    pub fn resolve(&self, token: &RequestToken, value: Value) -> bool {
        self.settle(token, Ok(value))
    }

    /// Settle a pending request with a failure.
    pub fn reject(&self, token: &RequestToken, error: FetcherError) -> bool {
        self.settle(token, Err(error))
    }

    /// Remove a pending request without settling it.
    ///
    /// The waiter observes `FetcherError::Abandoned`. Returns `true` if the token
    /// was pending.
    pub fn remove(&self, token: &RequestToken) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Get the number of pending requests.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Whether `token` is currently pending.
    pub fn contains(&self, token: &RequestToken) -> bool {
        self.lock().contains_key(token)
    }

    /// Reject every pending request with `FetcherError::Abandoned`.
    ///
    /// Called when the host tears the session down and no response will arrive.
    /// Returns the number of waiters that were notified.
    pub fn abandon_all(&self, reason: &str) -> usize {
        let entries: Vec<_> = self.lock().drain().collect();

        if !entries.is_empty() {
            log::debug!(
                target: "async_fetcher::registry",
                "Abandoning {} pending request(s): {}",
                entries.len(),
                reason
            );
        }

        entries
            .into_iter()
            .map(|(_, resolver)| resolver.reject(FetcherError::abandoned(reason)))
            .filter(|delivered| *delivered)
            .count()
    }
}
