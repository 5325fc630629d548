//! Tagging outgoing targets with a request token, and reading it back.
//!
//! The caller side appends the token as a reserved query parameter; the
//! responder side recovers it from whatever request type the host hands over.

use url::Url;
use url::form_urlencoded;

use crate::token::RequestToken;

/// Reserved query parameter carrying the request token.
///
/// The double-underscore prefix keeps it clear of application parameters.
pub const REQUEST_TOKEN_KEY: &str = "__request-id";

/// Append the token to `target` as the reserved query parameter.
///
/// Uses `&` when `target` already has a query string and `?` otherwise. The path,
/// existing parameters and their order are left untouched. A fragment stays at
/// the end, after the token, since hosts never send it to the server.
pub fn tag_target(target: &str, token: &RequestToken) -> String {
    let (base, fragment) = match target.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (target, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };

    match fragment {
        Some(fragment) => format!("{base}{separator}{REQUEST_TOKEN_KEY}={token}#{fragment}"),
        None => format!("{base}{separator}{REQUEST_TOKEN_KEY}={token}"),
    }
}

/// Extract the request token from a raw query string.
///
/// The first occurrence of the key wins. An empty value counts as untagged.
pub fn request_token_from_query(query: Option<&str>) -> Option<RequestToken> {
    let query = query?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == REQUEST_TOKEN_KEY)
        .and_then(|(_, value)| RequestToken::parse(&value))
}

/// Requests that may carry a request token in their query string.
pub trait TaggedRequest {
    /// The token this request was tagged with, if any.
    fn request_token(&self) -> Option<RequestToken>;
}

impl TaggedRequest for Url {
    fn request_token(&self) -> Option<RequestToken> {
        request_token_from_query(self.query())
    }
}

impl TaggedRequest for http::Uri {
    fn request_token(&self) -> Option<RequestToken> {
        request_token_from_query(self.query())
    }
}

impl<B> TaggedRequest for http::Request<B> {
    fn request_token(&self) -> Option<RequestToken> {
        self.uri().request_token()
    }
}

impl<T: TaggedRequest + ?Sized> TaggedRequest for &T {
    fn request_token(&self) -> Option<RequestToken> {
        (**self).request_token()
    }
}

/// Whether `request` was issued through the async fetcher.
///
/// Host code can use this to route tagged requests to the responder and handle
/// everything else some other way (e.g. answer from a cache first).
pub fn is_async_fetcher_request(request: &impl TaggedRequest) -> bool {
    request.request_token().is_some()
}
