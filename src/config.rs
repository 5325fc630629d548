//! Configuration for the loopback host and demo.
//!
//! Loaded from `async-fetcher.toml`:
//!
//! ```toml
//! origin = "http://localhost:3000/"
//! latency_ms = 25
//! page_size = 10
//! total_items = 45
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FetcherError, FetcherResult};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "async-fetcher.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetcherConfig {
    /// Navigable location of the simulated app; relative hrefs resolve against it.
    pub origin: String,
    /// Simulated server round-trip latency.
    pub latency_ms: u64,
    /// Items per page served by the paged demo loader.
    pub page_size: usize,
    /// Total items available to the paged demo loader.
    pub total_items: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000/".to_string(),
            latency_ms: 0,
            page_size: 10,
            total_items: 45,
        }
    }
}

impl FetcherConfig {
    pub fn from_toml_str(contents: &str) -> FetcherResult<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|err| FetcherError::config(format!("failed to parse TOML: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration file at `path`.
    pub fn load(path: &Path) -> FetcherResult<Self> {
        let contents = fs::read_to_string(path)?;
        log::info!(
            target: "async_fetcher::config",
            "Loaded configuration from {}",
            path.display()
        );
        Self::from_toml_str(&contents)
    }

    /// Read `path` if given, otherwise the default file if present, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> FetcherResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn origin_url(&self) -> FetcherResult<Url> {
        let url = Url::parse(&self.origin)
            .map_err(|err| FetcherError::config(format!("invalid origin {:?}: {err}", self.origin)))?;
        if url.cannot_be_a_base() {
            return Err(FetcherError::config(format!(
                "origin {:?} cannot be used as a base URL",
                self.origin
            )));
        }
        Ok(url)
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    fn validate(&self) -> FetcherResult<()> {
        self.origin_url()?;
        if self.page_size == 0 {
            return Err(FetcherError::config("page_size must be at least 1"));
        }
        Ok(())
    }
}
