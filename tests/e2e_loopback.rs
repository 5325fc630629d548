//! Demo app driven through the in-process loopback host.

use std::sync::Arc;
use std::time::Duration;

use async_fetcher::demo::{self, LEGACY_LIST_PATH, LIST_PATH, ListPage, TODOS_PATH, Todo, TodoStore};
use async_fetcher::loopback::PipelineEvent;
use async_fetcher::{
    AsyncFetcher, FetcherConfig, FetcherError, LoopbackHost, Navigator, PendingRequests,
    ServerFnResponder, ServerResponse, SubmitOptions,
};
use http::Method;
use serde_json::{Value, json};

struct App {
    fetcher: AsyncFetcher<Arc<LoopbackHost>>,
    host: Arc<LoopbackHost>,
    pending: Arc<PendingRequests>,
}

fn app(config: FetcherConfig) -> App {
    let pending = Arc::new(PendingRequests::new());
    let routes = demo::routes(&config, Arc::new(TodoStore::new()));
    let host = Arc::new(
        LoopbackHost::from_config(&config, routes, ServerFnResponder::new(pending.clone()))
            .unwrap(),
    );
    App {
        fetcher: AsyncFetcher::new(host.clone(), pending.clone()),
        host,
        pending,
    }
}

fn post() -> Option<SubmitOptions> {
    Some(
        SubmitOptions::new()
            .with_action(TODOS_PATH)
            .with_method(Method::POST),
    )
}

/// The pipeline event is recorded after the waiter is settled, so poll for it.
async fn pipeline_events(host: &LoopbackHost, expected: usize) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    for _ in 0..100 {
        events.extend(host.take_pipeline_events());
        if events.len() >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    events
}

#[tokio::test]
async fn test_todos_round_trip_through_submit_and_fetch() {
    let app = app(FetcherConfig::default());

    for content in ["buy milk", "write docs"] {
        let result: Value = app
            .fetcher
            .submit(json!({ "action": "add", "content": content }), post())
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    let removed: Value = app
        .fetcher
        .submit(json!({ "action": "remove", "id": 1 }), post())
        .await
        .unwrap();
    assert_eq!(removed, Value::Null);

    let todos: Vec<Todo> = app.fetcher.fetch(TODOS_PATH).await.unwrap();
    assert_eq!(
        todos,
        vec![Todo {
            id: 2,
            content: "write docs".to_string()
        }]
    );
    assert_eq!(app.pending.pending_count(), 0);
}

#[tokio::test]
async fn test_failed_action_rejects_caller_and_pipeline_gets_null() {
    let app = app(FetcherConfig::default());

    let error = app
        .fetcher
        .submit::<Value>(json!({ "action": "remove", "id": 9 }), post())
        .await
        .unwrap_err();
    assert!(matches!(error, FetcherError::Server(_)));
    assert_eq!(error.to_string(), "no todo with id 9");

    let events = pipeline_events(&app.host, 1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].url.path(), TODOS_PATH);
    assert_eq!(events[0].result.as_ref().unwrap(), &ServerResponse::Data(Value::Null));
}

#[tokio::test]
async fn test_infinite_list_is_walked_by_following_next() {
    let app = app(FetcherConfig {
        page_size: 4,
        total_items: 10,
        ..FetcherConfig::default()
    });

    let mut href = Some(LIST_PATH.to_string());
    let mut rows = Vec::new();
    let mut pages = 0;
    while let Some(current) = href.take() {
        let page: ListPage = app.fetcher.fetch(&current).await.unwrap();
        rows.extend(page.results);
        href = page.next;
        pages += 1;
    }

    assert_eq!(pages, 3);
    assert_eq!(rows.len(), 10);
    assert_eq!(rows.first().map(String::as_str), Some("Async loaded row #0"));
    assert_eq!(rows.last().map(String::as_str), Some("Async loaded row #9"));
}

#[tokio::test]
async fn test_concurrent_pages_resolve_to_their_own_data() {
    let app = app(FetcherConfig::default());

    let (first, second) = tokio::join!(
        app.fetcher.fetch::<ListPage>("/app/infinite-list?page=0"),
        app.fetcher.fetch::<ListPage>("/app/infinite-list?page=1"),
    );

    assert_eq!(first.unwrap().results[0], "Async loaded row #0");
    assert_eq!(second.unwrap().results[0], "Async loaded row #10");
}

#[tokio::test]
async fn test_redirecting_loader_rejects_but_pipeline_sees_response() {
    let app = app(FetcherConfig::default());

    let error = app
        .fetcher
        .fetch::<Value>(LEGACY_LIST_PATH)
        .await
        .unwrap_err();
    assert!(matches!(error, FetcherError::UnexpectedResponse { status: 302 }));

    let events = pipeline_events(&app.host, 1).await;
    let response = events[0].result.as_ref().unwrap();
    assert_eq!(response, &ServerResponse::redirect(LIST_PATH));
    assert_eq!(app.pending.pending_count(), 0);
}

#[tokio::test]
async fn test_fetch_with_fragment_still_settles() {
    let app = app(FetcherConfig::default());

    let todos: Vec<Todo> = app.fetcher.fetch("/app/todos#top").await.unwrap();
    assert!(todos.is_empty());
    assert_eq!(app.pending.pending_count(), 0);

    let events = pipeline_events(&app.host, 1).await;
    assert_eq!(events[0].url.fragment(), Some("top"));
}

#[tokio::test]
async fn test_unknown_route_rejects_with_server_error() {
    let app = app(FetcherConfig::default());

    let error = app.fetcher.fetch::<Value>("/app/missing").await.unwrap_err();
    assert_eq!(error.to_string(), "no route for /app/missing");
}

#[tokio::test]
async fn test_abandon_all_releases_slow_requests() {
    let app = app(FetcherConfig {
        latency_ms: 200,
        ..FetcherConfig::default()
    });

    let fetcher = app.fetcher.clone();
    let call = tokio::spawn(async move { fetcher.fetch::<Value>(TODOS_PATH).await });

    while app.pending.pending_count() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(app.pending.abandon_all("session closed"), 1);

    let error = call.await.unwrap().unwrap_err();
    assert!(matches!(error, FetcherError::Abandoned { .. }));

    // The late response still reaches the host pipeline.
    let events = pipeline_events(&app.host, 1).await;
    assert_eq!(events[0].result.as_ref().unwrap(), &ServerResponse::data(json!([])));
}

#[test]
fn test_config_file_drives_host_origin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("async-fetcher.toml");
    std::fs::write(&path, "origin = \"http://example.test/base/\"\nlatency_ms = 5\n").unwrap();

    let config = FetcherConfig::load_or_default(Some(&path)).unwrap();
    let host = LoopbackHost::from_config(
        &config,
        demo::routes(&config, Arc::new(TodoStore::new())),
        ServerFnResponder::new(Arc::new(PendingRequests::new())),
    )
    .unwrap();

    assert_eq!(host.location(), "http://example.test/base/");
}
