//! The calling side of the bridge.
//!
//! `AsyncFetcher` turns the host's fire-and-forget load and submit primitives
//! into awaitable calls:
//!
//! ```text
//! fetch("/items")
//!       │
//!       ├─► mint token, tag href          /items?__request-id=<token>
//!       ├─► register token                PendingRequests::create
//!       ├─► trigger                       Navigator::load
//!       │
//!       └─► await promise  ◄── settled by ServerFnResponder when the response lands
//! ```

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::deferred::Promise;
use crate::error::{FetcherError, FetcherResult};
use crate::host::{BoxError, Navigator, SubmitOptions};
use crate::registry::PendingRequests;
use crate::tagging::tag_target;
use crate::token::RequestToken;

/// Awaitable wrapper around the host framework's fetcher.
pub struct AsyncFetcher<N> {
    navigator: N,
    pending: Arc<PendingRequests>,
}

impl<N: Clone> Clone for AsyncFetcher<N> {
    fn clone(&self) -> Self {
        Self {
            navigator: self.navigator.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<N> fmt::Debug for AsyncFetcher<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFetcher")
            .field("pending", &self.pending.pending_count())
            .finish_non_exhaustive()
    }
}

impl<N: Navigator> AsyncFetcher<N> {
    /// Create a fetcher registering its requests in `pending`.
    ///
    /// The responder settling these requests must share the same registry.
    pub fn new(navigator: N, pending: Arc<PendingRequests>) -> Self {
        Self { navigator, pending }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn pending(&self) -> &Arc<PendingRequests> {
        &self.pending
    }

    /// Load `href` and wait for the loader data.
    ///
    /// The settled payload is decoded into `T`; use `serde_json::Value` to keep it
    /// untyped.
    pub async fn fetch<T: DeserializeOwned>(&self, href: &str) -> FetcherResult<T> {
        let token = RequestToken::generate();
        let href = tag_target(href, &token);
        let promise = self.register(&token)?;

        log::debug!(target: "async_fetcher::fetcher", "Loading {}", href);

        let triggered = self.navigator.load(&href);
        self.complete(token, triggered, promise).await
    }

    /// Submit `target` and wait for the action data.
    ///
    /// The token is added to `options.action`, or to the navigator's current
    /// location when no action is given.
    pub async fn submit<T: DeserializeOwned>(
        &self,
        target: Value,
        options: Option<SubmitOptions>,
    ) -> FetcherResult<T> {
        let token = RequestToken::generate();

        let mut options = options.unwrap_or_default();
        let action = options
            .action
            .take()
            .filter(|action| !action.is_empty())
            .unwrap_or_else(|| self.navigator.location());
        options.action = Some(tag_target(&action, &token));

        let promise = self.register(&token)?;

        log::debug!(
            target: "async_fetcher::fetcher",
            "Submitting {} {}",
            options.method,
            options.action.as_deref().unwrap_or_default()
        );

        let triggered = self.navigator.submit(target, options);
        self.complete(token, triggered, promise).await
    }

    fn register(&self, token: &RequestToken) -> FetcherResult<Promise<Value>> {
        self.pending
            .create(token.clone())
            .ok_or_else(|| FetcherError::DuplicateToken {
                token: token.to_string(),
            })
    }

    async fn complete<T: DeserializeOwned>(
        &self,
        token: RequestToken,
        triggered: Result<(), BoxError>,
        promise: Promise<Value>,
    ) -> FetcherResult<T> {
        if let Err(error) = triggered {
            // No response cycle will ever settle this entry.
            self.pending.remove(&token);
            log::debug!(
                target: "async_fetcher::fetcher",
                "Trigger for {} failed: {}",
                token,
                error
            );
            return Err(FetcherError::Trigger(error));
        }

        let value = promise.await?;
        log::trace!(target: "async_fetcher::fetcher", "Request {} settled", token);

        Ok(serde_json::from_value(value)?)
    }
}
