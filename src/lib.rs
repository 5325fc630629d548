//! Awaitable loads and submissions on top of a fire-and-forget host framework.
//!
//! The calling side ([`AsyncFetcher`]) tags every outgoing request with a fresh
//! token and parks a promise in the shared [`PendingRequests`] registry. The
//! responding side ([`ServerFnResponder`], or [`ResponderLayer`] as tower
//! middleware) reads the token back off the request when the host finishes the
//! server round-trip and settles exactly that promise.

pub mod config;
pub mod deferred;
pub mod demo;
pub mod error;
pub mod fetcher;
pub mod host;
pub mod loopback;
pub mod registry;
pub mod responder;
pub mod tagging;
pub mod token;

pub use config::FetcherConfig;
pub use error::{FetcherError, FetcherResult};
pub use fetcher::AsyncFetcher;
pub use host::{BoxError, Navigator, ServerResponse, SubmitOptions};
pub use loopback::{LoopbackHost, ServerCall, ServerRoutes};
pub use registry::PendingRequests;
pub use responder::{
    ClientActionArgs, ClientLoaderArgs, ResponderLayer, ResponderService, ServerFnResponder,
};
pub use tagging::{REQUEST_TOKEN_KEY, TaggedRequest, is_async_fetcher_request, tag_target};
pub use token::RequestToken;
