//! Tower middleware installing the responder in front of a server round-trip.
//!
//! Hosts that model their loader/action round-trip as a tower `Service` wrap it
//! with [`ResponderLayer`]. The request token is read from the request URI
//! before the inner service is called; everything else follows
//! `ServerFnResponder`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use super::ServerFnResponder;
use crate::host::{BoxError, ServerResponse};
use crate::tagging::TaggedRequest;

/// Layer producing [`ResponderService`].
#[derive(Debug, Clone)]
pub struct ResponderLayer {
    responder: ServerFnResponder,
}

impl ResponderLayer {
    pub fn new(responder: ServerFnResponder) -> Self {
        Self { responder }
    }
}

impl<S> Layer<S> for ResponderLayer {
    type Service = ResponderService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponderService {
            inner,
            responder: self.responder.clone(),
        }
    }
}

/// Server round-trip wrapped by the responder.
#[derive(Debug, Clone)]
pub struct ResponderService<S> {
    inner: S,
    responder: ServerFnResponder,
}

impl<S, B> Service<http::Request<B>> for ResponderService<S>
where
    S: Service<http::Request<B>, Response = ServerResponse>,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = ServerResponse;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        // Read the token before the request is moved into the inner service
        let token = req.request_token();
        let round_trip = self.inner.call(req);
        let responder = self.responder.clone();

        Box::pin(async move {
            responder
                .respond(token, async move { round_trip.await.map_err(Into::<BoxError>::into) })
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{Value, json};
    use tower::{ServiceExt, service_fn};

    use crate::registry::PendingRequests;
    use crate::tagging::tag_target;
    use crate::token::RequestToken;

    fn request(uri: &str) -> http::Request<()> {
        http::Request::builder().uri(uri).body(()).unwrap()
    }

    fn layered<F, Fut>(
        pending: &Arc<PendingRequests>,
        handler: F,
    ) -> ResponderService<tower::util::ServiceFn<F>>
    where
        F: FnMut(http::Request<()>) -> Fut,
    {
        ResponderLayer::new(ServerFnResponder::new(pending.clone())).layer(service_fn(handler))
    }

    #[tokio::test]
    async fn tagged_request_settles_waiter() {
        let pending = Arc::new(PendingRequests::new());
        let token = RequestToken::generate();
        let promise = pending.create(token.clone()).unwrap();

        let service = layered(&pending, |_req| async {
            Ok::<_, BoxError>(ServerResponse::data(json!({ "todos": [] })))
        });

        let response = service
            .oneshot(request(&tag_target("/todos", &token)))
            .await
            .unwrap();

        assert_eq!(response, ServerResponse::data(json!({ "todos": [] })));
        assert_eq!(promise.await.unwrap(), json!({ "todos": [] }));
    }

    #[tokio::test]
    async fn tagged_failure_is_swallowed() {
        let pending = Arc::new(PendingRequests::new());
        let token = RequestToken::generate();
        let promise = pending.create(token.clone()).unwrap();

        let service = layered(&pending, |_req| async {
            Err::<ServerResponse, std::io::Error>(std::io::Error::other("boom"))
        });

        let response = service
            .oneshot(request(&tag_target("/todos", &token)))
            .await
            .unwrap();

        assert_eq!(response, ServerResponse::Data(Value::Null));
        assert_eq!(promise.await.unwrap_err().to_string(), "boom");
    }

    #[tokio::test]
    async fn untagged_request_passes_through() {
        let pending = Arc::new(PendingRequests::new());

        let service = layered(&pending, |req: http::Request<()>| async move {
            assert_eq!(req.uri().path(), "/answer");
            Ok::<_, BoxError>(ServerResponse::data(42))
        });

        let response = service.oneshot(request("/answer")).await.unwrap();
        assert_eq!(response, ServerResponse::data(42));
        assert_eq!(pending.pending_count(), 0);
    }

    #[tokio::test]
    async fn untagged_failure_propagates() {
        let pending = Arc::new(PendingRequests::new());

        let service = layered(&pending, |_req| async {
            Err::<ServerResponse, BoxError>("boom".into())
        });

        let error = service.oneshot(request("/answer")).await.unwrap_err();
        assert_eq!(error.to_string(), "boom");
    }
}
