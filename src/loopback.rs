//! In-process host framework used by the demo binary and integration tests.
//!
//! `LoopbackHost` plays the framework's part of the protocol: a triggered load
//! or submission is resolved against the configured origin, routed to a server
//! function on a spawned task and finished through `ServerFnResponder`, just
//! like a client-side loader/action interception would be.
//!
//! ```text
//! Navigator::load(href)
//!       │
//!       └─► spawn ─► [latency] ─► ServerFnResponder::handle_loader
//!                                        │
//!                                        ├─► ServerRoutes::call   (server round-trip)
//!                                        └─► pipeline event recorded
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use http::Method;
use serde_json::Value;
use url::Url;

use crate::config::FetcherConfig;
use crate::error::FetcherResult;
use crate::host::{BoxError, Navigator, ServerResponse, SubmitOptions};
use crate::responder::{ClientActionArgs, ClientLoaderArgs, ServerFnResponder};

/// Boxed server round-trip.
pub type ServerFuture = Pin<Box<dyn Future<Output = Result<ServerResponse, BoxError>> + Send>>;

type ServerFn = Arc<dyn Fn(ServerCall) -> ServerFuture + Send + Sync>;

/// A request as seen by a server function.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerCall {
    pub method: Method,
    pub url: Url,
    /// Submitted payload; `None` for loads.
    pub body: Option<Value>,
}

impl ServerCall {
    /// First value of query parameter `key`.
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// Server functions keyed by path.
#[derive(Clone, Default)]
pub struct ServerRoutes {
    routes: HashMap<String, ServerFn>,
}

impl fmt::Debug for ServerRoutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.routes.keys().collect();
        paths.sort();
        f.debug_struct("ServerRoutes").field("paths", &paths).finish()
    }
}

impl ServerRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `path`, replacing any previous handler.
    pub fn route<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(ServerCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ServerResponse, BoxError>> + Send + 'static,
    {
        let handler: ServerFn =
            Arc::new(move |call: ServerCall| -> ServerFuture { Box::pin(handler(call)) });
        self.routes.insert(path.to_string(), handler);
        self
    }

    /// Run the server function matching the call's path.
    pub fn call(&self, call: ServerCall) -> ServerFuture {
        match self.routes.get(call.url.path()) {
            Some(handler) => handler(call),
            None => {
                let message = format!("no route for {}", call.url.path());
                Box::pin(async move { Err::<ServerResponse, BoxError>(message.into()) })
            }
        }
    }
}

/// Pipeline events kept by a [`LoopbackHost`] before the oldest are dropped.
pub const DEFAULT_PIPELINE_CAPACITY: usize = 64;

/// What the host's own data pipeline received for one request.
#[derive(Debug)]
pub struct PipelineEvent {
    pub url: Url,
    pub result: Result<ServerResponse, String>,
}

/// Most recent pipeline events, oldest dropped first.
#[derive(Debug)]
struct PipelineLog {
    events: Mutex<VecDeque<PipelineEvent>>,
    capacity: usize,
}

impl PipelineLog {
    fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<PipelineEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, event: PipelineEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut events = self.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    fn take(&self) -> Vec<PipelineEvent> {
        self.lock().drain(..).collect()
    }
}

/// In-process host framework implementing [`Navigator`].
pub struct LoopbackHost {
    origin: Url,
    routes: ServerRoutes,
    responder: ServerFnResponder,
    latency: Duration,
    pipeline: Arc<PipelineLog>,
}

impl fmt::Debug for LoopbackHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackHost")
            .field("origin", &self.origin.as_str())
            .field("routes", &self.routes)
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

impl LoopbackHost {
    pub fn new(origin: Url, routes: ServerRoutes, responder: ServerFnResponder) -> Self {
        Self {
            origin,
            routes,
            responder,
            latency: Duration::ZERO,
            pipeline: Arc::new(PipelineLog::new(DEFAULT_PIPELINE_CAPACITY)),
        }
    }

    pub fn from_config(
        config: &FetcherConfig,
        routes: ServerRoutes,
        responder: ServerFnResponder,
    ) -> FetcherResult<Self> {
        Ok(Self::new(config.origin_url()?, routes, responder).with_latency(config.latency()))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Keep at most `capacity` pipeline events; 0 disables recording.
    pub fn with_pipeline_capacity(mut self, capacity: usize) -> Self {
        self.pipeline = Arc::new(PipelineLog::new(capacity));
        self
    }

    /// Drain the pipeline events recorded so far, oldest first.
    pub fn take_pipeline_events(&self) -> Vec<PipelineEvent> {
        self.pipeline.take()
    }

    fn dispatch(&self, call: ServerCall) -> Result<(), BoxError> {
        let runtime = tokio::runtime::Handle::try_current()?;

        let routes = self.routes.clone();
        let responder = self.responder.clone();
        let pipeline = self.pipeline.clone();
        let latency = self.latency;

        runtime.spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let request = call.url.clone();
            let result = if call.method == Method::GET {
                responder
                    .handle_loader(ClientLoaderArgs {
                        request: request.clone(),
                        server_loader: || routes.call(call),
                    })
                    .await
            } else {
                responder
                    .handle_action(ClientActionArgs {
                        request: request.clone(),
                        server_action: || routes.call(call),
                    })
                    .await
            };

            match &result {
                Ok(response) => log::debug!(
                    target: "async_fetcher::loopback",
                    "Pipeline received {:?} for {}",
                    response,
                    request
                ),
                Err(error) => log::warn!(
                    target: "async_fetcher::loopback",
                    "Pipeline error for {}: {}",
                    request,
                    error
                ),
            }

            pipeline.record(PipelineEvent {
                url: request,
                result: result.map_err(|error| error.to_string()),
            });
        });

        Ok(())
    }
}

impl Navigator for LoopbackHost {
    fn load(&self, href: &str) -> Result<(), BoxError> {
        let url = self.origin.join(href)?;
        self.dispatch(ServerCall {
            method: Method::GET,
            url,
            body: None,
        })
    }

    fn submit(&self, target: Value, options: SubmitOptions) -> Result<(), BoxError> {
        let url = match options.action.as_deref() {
            Some(action) => self.origin.join(action)?,
            None => self.origin.clone(),
        };
        self.dispatch(ServerCall {
            method: options.method,
            url,
            body: Some(target),
        })
    }

    fn location(&self) -> String {
        self.origin.to_string()
    }
}
