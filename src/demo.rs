//! Server functions for the demo app.
//!
//! - `/app/todos`: loader lists todos, action adds or removes one
//! - `/app/infinite-list?page=N`: paged rows for an infinite list
//! - `/app/legacy-list`: loader that redirects to the infinite list

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use http::Method;
use serde::{Deserialize, Serialize};

use crate::config::FetcherConfig;
use crate::host::{BoxError, ServerResponse};
use crate::loopback::{ServerCall, ServerRoutes};

pub const TODOS_PATH: &str = "/app/todos";
pub const LIST_PATH: &str = "/app/infinite-list";
pub const LEGACY_LIST_PATH: &str = "/app/legacy-list";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub content: String,
}

/// Payload submitted to the todos action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum TodoAction {
    Add { content: String },
    Remove { id: u64 },
}

/// One page of the infinite list, with hrefs of its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage {
    pub results: Vec<String>,
    pub next: Option<String>,
    pub prev: Option<String>,
}

#[derive(Debug, Default)]
pub struct TodoStore {
    todos: DashMap<u64, Todo>,
    next_id: AtomicU64,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, content: String) -> Todo {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let todo = Todo { id, content };
        self.todos.insert(id, todo.clone());
        todo
    }

    pub fn remove(&self, id: u64) -> bool {
        self.todos.remove(&id).is_some()
    }

    /// All todos in creation order.
    pub fn list(&self) -> Vec<Todo> {
        let mut todos: Vec<Todo> = self.todos.iter().map(|entry| entry.value().clone()).collect();
        todos.sort_by_key(|todo| todo.id);
        todos
    }
}

/// Routes serving the demo app.
pub fn routes(config: &FetcherConfig, store: Arc<TodoStore>) -> ServerRoutes {
    let page_size = config.page_size;
    let total_items = config.total_items;

    ServerRoutes::new()
        .route(TODOS_PATH, move |call| {
            let store = store.clone();
            async move { todos(call, &store) }
        })
        .route(LIST_PATH, move |call| async move {
            list_page(&call, page_size, total_items)
        })
        .route(LEGACY_LIST_PATH, |_call| async {
            Ok::<_, BoxError>(ServerResponse::redirect(LIST_PATH))
        })
}

fn todos(call: ServerCall, store: &TodoStore) -> Result<ServerResponse, BoxError> {
    if call.method == Method::GET {
        return Ok(ServerResponse::Data(serde_json::to_value(store.list())?));
    }

    let body = call.body.ok_or("missing submission payload")?;
    match serde_json::from_value::<TodoAction>(body)? {
        TodoAction::Add { content } => {
            if content.trim().is_empty() {
                return Err("todo content must not be empty".into());
            }
            let todo = store.add(content);
            log::info!(target: "async_fetcher::demo", "Added todo #{}", todo.id);
        }
        TodoAction::Remove { id } => {
            if !store.remove(id) {
                return Err(format!("no todo with id {id}").into());
            }
            log::info!(target: "async_fetcher::demo", "Removed todo #{id}");
        }
    }

    Ok(ServerResponse::Data(serde_json::Value::Null))
}

fn list_page(
    call: &ServerCall,
    page_size: usize,
    total_items: usize,
) -> Result<ServerResponse, BoxError> {
    let page: usize = match call.query("page") {
        Some(page) => page.parse().map_err(|_| format!("invalid page {page:?}"))?,
        None => 0,
    };

    let offset = page.saturating_mul(page_size);
    let end = offset.saturating_add(page_size).min(total_items);
    let results = (offset..end).map(|row| format!("Async loaded row #{row}")).collect();

    let path = call.url.path();
    let list = ListPage {
        results,
        next: (end < total_items).then(|| format!("{path}?page={}", page + 1)),
        prev: (page > 0).then(|| format!("{path}?page={}", page - 1)),
    };

    Ok(ServerResponse::Data(serde_json::to_value(list)?))
}
