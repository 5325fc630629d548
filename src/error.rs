//! Error handling types for async-fetcher
//!
//! Every outcome a waiting caller can observe is expressed as a [`FetcherError`].

use thiserror::Error;

use crate::host::BoxError;

/// Errors surfaced to callers of the async fetcher.
#[derive(Debug, Error)]
pub enum FetcherError {
    /// The server round-trip failed. Displays exactly like the original error.
    #[error(transparent)]
    Server(BoxError),

    /// The server round-trip produced a response object (e.g. a redirect)
    /// instead of data.
    #[error("Encountered a Response object (status {status})")]
    UnexpectedResponse { status: u16 },

    /// The host framework refused to start the request.
    #[error("Failed to trigger request: {0}")]
    Trigger(BoxError),

    /// The pending entry was dropped before it was settled.
    #[error("Request abandoned: {reason}")]
    Abandoned { reason: String },

    /// A request with the same token is already in flight.
    #[error("Request token already pending: {token}")]
    DuplicateToken { token: String },

    /// The settled payload did not match the type the caller asked for.
    #[error("Failed to decode response data: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration error
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for async fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

impl FetcherError {
    /// Create an abandoned error
    pub fn abandoned(reason: impl Into<String>) -> Self {
        FetcherError::Abandoned {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        FetcherError::Config {
            message: message.into(),
        }
    }

    /// Wrap a server round-trip failure
    pub fn server(error: impl Into<BoxError>) -> Self {
        FetcherError::Server(error.into())
    }

    /// Whether an external query layer should retry the request.
    ///
    /// This crate never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetcherError::Server(_) | FetcherError::UnexpectedResponse { .. }
        )
    }
}
