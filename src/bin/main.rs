use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_fetcher::demo::{self, LEGACY_LIST_PATH, LIST_PATH, ListPage, TODOS_PATH, Todo, TodoStore};
use async_fetcher::{
    AsyncFetcher, FetcherConfig, FetcherResult, LoopbackHost, PendingRequests, RequestToken,
    ServerFnResponder, SubmitOptions, tag_target,
};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::{Value, json};

/// Awaitable fetcher demo running against an in-process host
#[derive(Parser)]
#[command(name = "async-fetcher")]
#[command(version)]
#[command(about = "Awaitable fetcher demo running against an in-process host")]
struct Cli {
    /// Configuration file (default: ./async-fetcher.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overriding RUST_LOG (e.g. debug, async_fetcher=trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add and remove todos through awaited submissions, then list them
    Todos {
        /// Content of a todo to add (repeatable)
        #[arg(long)]
        add: Vec<String>,

        /// Id of a todo to remove (repeatable)
        #[arg(long)]
        remove: Vec<u64>,
    },
    /// Walk the infinite list page by page until it is exhausted
    Pages {
        /// Stop after this many pages
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Fetch a loader that redirects and show how the call is rejected
    Redirect,
    /// Print a target tagged with a fresh request token
    Tag {
        /// Href or form action to tag (e.g. /todos?filter=open)
        target: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = cli.log_level.as_deref() {
        logger.parse_filters(filter);
    }
    logger.init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> FetcherResult<()> {
    match cli.command {
        Commands::Tag { target } => {
            println!("{}", tag_target(&target, &RequestToken::generate()));
        }
        Commands::Todos { add, remove } => {
            let fetcher = connect(cli.config.as_deref())?;

            for content in add {
                let _: Value = fetcher
                    .submit(json!({ "action": "add", "content": content }), Some(post()))
                    .await?;
            }
            for id in remove {
                let _: Value = fetcher
                    .submit(json!({ "action": "remove", "id": id }), Some(post()))
                    .await?;
            }

            let todos: Vec<Todo> = fetcher.fetch(TODOS_PATH).await?;
            if todos.is_empty() {
                println!("No todos");
            }
            for todo in todos {
                println!("#{} {}", todo.id, todo.content);
            }
        }
        Commands::Pages { limit } => {
            let fetcher = connect(cli.config.as_deref())?;
            let mut href = Some(LIST_PATH.to_string());
            let mut fetched = 0;

            while let Some(current) = href.take() {
                if limit.is_some_and(|limit| fetched >= limit) {
                    break;
                }
                let page: ListPage = fetcher.fetch(&current).await?;
                fetched += 1;

                println!("{} ({} rows)", current, page.results.len());
                for row in &page.results {
                    println!("  {}", row);
                }
                href = page.next;
            }
        }
        Commands::Redirect => {
            let fetcher = connect(cli.config.as_deref())?;
            match fetcher.fetch::<Value>(LEGACY_LIST_PATH).await {
                Ok(value) => println!("Resolved with {}", value),
                Err(e) => println!("Rejected: {} (retryable: {})", e, e.is_retryable()),
            }
        }
    }

    Ok(())
}

/// Demo app wired to a loopback host. Pipeline outcomes are only logged.
fn connect(config_path: Option<&Path>) -> FetcherResult<AsyncFetcher<Arc<LoopbackHost>>> {
    let config = FetcherConfig::load_or_default(config_path)?;

    let pending = Arc::new(PendingRequests::new());
    let responder = ServerFnResponder::new(pending.clone());
    let routes = demo::routes(&config, Arc::new(TodoStore::new()));
    let host = LoopbackHost::from_config(&config, routes, responder)?.with_pipeline_capacity(0);

    Ok(AsyncFetcher::new(Arc::new(host), pending))
}

fn post() -> SubmitOptions {
    SubmitOptions::new()
        .with_action(TODOS_PATH)
        .with_method(Method::POST)
}
