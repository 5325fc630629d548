//! The responding side of the bridge.
//!
//! `ServerFnResponder` sits where the host finishes a client-side load or
//! action. It runs the server round-trip, hands the result back to the host
//! pipeline and, for requests tagged by `AsyncFetcher`, settles the waiting
//! caller as well.
//!
//! # Outcomes
//!
//! | round-trip              | tagged: waiter sees          | pipeline sees        |
//! |-------------------------|------------------------------|----------------------|
//! | `Ok(Data(v))`           | `Ok(v)`                      | `Ok(Data(v))`        |
//! | `Ok(Response(r))`       | `Err(UnexpectedResponse)`    | `Ok(Response(r))`    |
//! | `Err(e)`                | `Err(Server(e))`             | `Ok(Data(null))`     |
//!
//! Untagged requests pass through untouched, errors included, so data loads the
//! host performs on its own behave as if the bridge were not installed.
//!
//! # Module Structure
//!
//! - `layer` - tower middleware form of the responder

mod layer;

pub use layer::{ResponderLayer, ResponderService};

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::error::FetcherError;
use crate::host::{BoxError, ServerResponse};
use crate::registry::PendingRequests;
use crate::tagging::TaggedRequest;
use crate::token::RequestToken;

/// Arguments of a client-side loader interception.
#[derive(Debug)]
pub struct ClientLoaderArgs<F> {
    /// The request as issued by the host, including any request token.
    pub request: Url,
    /// Performs the actual server round-trip.
    pub server_loader: F,
}

/// Arguments of a client-side action interception.
#[derive(Debug)]
pub struct ClientActionArgs<F> {
    /// The request as issued by the host, including any request token.
    pub request: Url,
    /// Performs the actual server round-trip.
    pub server_action: F,
}

/// Settles pending requests from the host's interception hooks.
#[derive(Debug, Clone)]
pub struct ServerFnResponder {
    pending: Arc<PendingRequests>,
}

impl ServerFnResponder {
    /// Create a responder settling requests registered in `pending`.
    pub fn new(pending: Arc<PendingRequests>) -> Self {
        Self { pending }
    }

    pub fn pending(&self) -> &Arc<PendingRequests> {
        &self.pending
    }

    /// Use as (or call from) the host's client loader.
    pub async fn handle_loader<F, Fut>(
        &self,
        args: ClientLoaderArgs<F>,
    ) -> Result<ServerResponse, BoxError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ServerResponse, BoxError>>,
    {
        let token = args.request.request_token();
        self.respond(token, (args.server_loader)()).await
    }

    /// Use as (or call from) the host's client action.
    pub async fn handle_action<F, Fut>(
        &self,
        args: ClientActionArgs<F>,
    ) -> Result<ServerResponse, BoxError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ServerResponse, BoxError>>,
    {
        let token = args.request.request_token();
        self.respond(token, (args.server_action)()).await
    }

    pub(crate) async fn respond<Fut>(
        &self,
        token: Option<RequestToken>,
        round_trip: Fut,
    ) -> Result<ServerResponse, BoxError>
    where
        Fut: Future<Output = Result<ServerResponse, BoxError>>,
    {
        let outcome = round_trip.await;

        let Some(token) = token else {
            return outcome;
        };

        match outcome {
            Ok(response) => {
                let settlement = match &response {
                    ServerResponse::Data(value) => Ok(value.clone()),
                    ServerResponse::Response(inner) => Err(FetcherError::UnexpectedResponse {
                        status: inner.status().as_u16(),
                    }),
                };
                self.settle(&token, settlement);
                Ok(response)
            }
            Err(error) => {
                log::debug!(
                    target: "async_fetcher::responder",
                    "Server round-trip for {} failed: {}",
                    token,
                    error
                );
                self.settle(&token, Err(FetcherError::Server(error)));
                // The waiter owns this error now; the pipeline must not surface it again.
                Ok(ServerResponse::Data(Value::Null))
            }
        }
    }

    fn settle(&self, token: &RequestToken, outcome: Result<Value, FetcherError>) {
        if !self.pending.settle(token, outcome) {
            log::trace!(
                target: "async_fetcher::responder",
                "No waiter for {} (already settled or foreign)",
                token
            );
        }
    }
}
