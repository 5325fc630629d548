//! Seams to the host framework.
//!
//! The async fetcher never performs transport itself. It triggers requests
//! through a [`Navigator`] and learns about their results from the responder,
//! which the host installs where it finishes a client-side load or action.

use std::sync::Arc;

use http::{Method, StatusCode, header};
use serde_json::Value;

/// Type-erased error, as used by tower services.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The host framework's request-triggering primitives.
///
/// Both triggers are fire-and-forget: their return only reports whether the
/// request could be started. Results travel back through the responder.
pub trait Navigator: Send + Sync {
    /// Start a load (GET) of `href`.
    fn load(&self, href: &str) -> Result<(), BoxError>;

    /// Start a submission of `target` with the given options.
    fn submit(&self, target: Value, options: SubmitOptions) -> Result<(), BoxError>;

    /// The current navigable location, used when a submission names no action.
    fn location(&self) -> String;
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn load(&self, href: &str) -> Result<(), BoxError> {
        (**self).load(href)
    }

    fn submit(&self, target: Value, options: SubmitOptions) -> Result<(), BoxError> {
        (**self).submit(target, options)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

impl<N: Navigator + ?Sized> Navigator for &N {
    fn load(&self, href: &str) -> Result<(), BoxError> {
        (**self).load(href)
    }

    fn submit(&self, target: Value, options: SubmitOptions) -> Result<(), BoxError> {
        (**self).submit(target, options)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

/// Options accompanying a submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitOptions {
    /// Target URL of the action. Falls back to the navigator's location.
    pub action: Option<String>,
    pub method: Method,
    pub enc_type: Option<String>,
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_enc_type(mut self, enc_type: impl Into<String>) -> Self {
        self.enc_type = Some(enc_type.into());
        self
    }
}

/// Result of a server round-trip as seen by the client-side pipeline.
#[derive(Debug)]
pub enum ServerResponse {
    /// Plain data returned by a loader or action.
    Data(Value),
    /// An opaque response, typically a redirect thrown or returned on the server.
    Response(http::Response<Vec<u8>>),
}

impl ServerResponse {
    pub fn data(value: impl Into<Value>) -> Self {
        Self::Data(value.into())
    }

    /// A `302 Found` response pointing at `location`.
    pub fn redirect(location: &str) -> Self {
        let mut response = http::Response::new(Vec::new());
        *response.status_mut() = StatusCode::FOUND;
        if let Ok(value) = header::HeaderValue::from_str(location) {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Self::Response(response)
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    /// The data payload, if this is not an opaque response.
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Response(_) => None,
        }
    }

    pub fn into_data(self) -> Option<Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Response(_) => None,
        }
    }
}

impl PartialEq for ServerResponse {
    /// Responses compare by status and headers; bodies are opaque.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Data(l), Self::Data(r)) => l == r,
            (Self::Response(l), Self::Response(r)) => {
                l.status() == r.status() && l.headers() == r.headers()
            }
            _ => false,
        }
    }
}
