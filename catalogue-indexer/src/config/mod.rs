//! Configuration for the catalogue indexer.
//!
//! Settings come from environment variables. An optional `.env` file in the
//! working directory is loaded first.

mod dependencies;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use catalogue_indexer_pipeline::{MigrationConfig, UpdaterConfig};

use crate::IndexingError;

pub use dependencies::{Dependencies, BULK_QUEUE};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default index groups managed by this process.
const DEFAULT_INDEX_GROUPS: &str = "mainstream,detailed,government";

/// Default schema configuration directory.
const DEFAULT_SCHEMA_CONFIG_DIR: &str = "config/schema";

/// Default number of workers per queue.
const DEFAULT_WORKER_COUNT: usize = 4;

/// Default complete reference index for the migration resync pass.
const DEFAULT_REFERENCE_INDEX: &str = "mainstream";

/// Default delay between drain checks in milliseconds.
const DEFAULT_DRAIN_POLL_INTERVAL_MS: u64 = 1000;

/// Process configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub opensearch_url: String,
    /// Index groups this process may create indices for and switch.
    pub index_groups: Vec<String>,
    pub schema_config_dir: PathBuf,
    pub worker_count: usize,
    pub reference_index: String,
    /// Content formats handled by the batch pipeline rather than the
    /// incremental sync path.
    pub migrated_formats: Vec<String>,
    pub drain_poll_interval: Duration,
    /// `None` waits for the queue indefinitely.
    pub drain_timeout: Option<Duration>,
    pub updater: UpdaterConfig,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_GROUPS`: comma-separated index groups (default: mainstream,detailed,government)
    /// - `SCHEMA_CONFIG_DIR`: schema configuration directory (default: config/schema)
    /// - `WORKER_COUNT`: workers per queue (default: 4)
    /// - `REFERENCE_INDEX`: source of the migration resync pass (default: mainstream)
    /// - `MIGRATED_FORMATS`: comma-separated formats refreshed by popularity runs
    /// - `DRAIN_POLL_INTERVAL_MS`: delay between drain checks (default: 1000)
    /// - `DRAIN_TIMEOUT_SECS`: give up waiting for the queue after this long (default: unset)
    /// - `SCROLL_PAGE_SIZE`: hits per shard per scroll page (default: 500)
    /// - `BATCH_SIZE`: records per dispatched batch (default: 25)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let defaults = UpdaterConfig::default();
        let updater = UpdaterConfig {
            scroll_page_size: parse_or(&lookup, "SCROLL_PAGE_SIZE", defaults.scroll_page_size)?,
            batch_size: parse_or(&lookup, "BATCH_SIZE", defaults.batch_size)?,
            ..defaults
        };
        if updater.batch_size == 0 {
            return Err(IndexingError::config("BATCH_SIZE must be at least 1"));
        }

        let worker_count = parse_or(&lookup, "WORKER_COUNT", DEFAULT_WORKER_COUNT)?;
        if worker_count == 0 {
            return Err(IndexingError::config("WORKER_COUNT must be at least 1"));
        }

        let drain_timeout = match lookup("DRAIN_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse("DRAIN_TIMEOUT_SECS", &raw)?)),
            None => None,
        };

        Ok(Self {
            opensearch_url: value("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            index_groups: split_list(&value("INDEX_GROUPS", DEFAULT_INDEX_GROUPS)),
            schema_config_dir: PathBuf::from(value("SCHEMA_CONFIG_DIR", DEFAULT_SCHEMA_CONFIG_DIR)),
            worker_count,
            reference_index: value("REFERENCE_INDEX", DEFAULT_REFERENCE_INDEX),
            migrated_formats: split_list(&value("MIGRATED_FORMATS", "")),
            drain_poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "DRAIN_POLL_INTERVAL_MS",
                DEFAULT_DRAIN_POLL_INTERVAL_MS,
            )?),
            drain_timeout,
            updater,
        })
    }

    /// Settings for the migration controller.
    pub fn migration(&self) -> MigrationConfig {
        MigrationConfig {
            reference_index: self.reference_index.clone(),
            poll_interval: self.drain_poll_interval,
            drain_timeout: self.drain_timeout,
            updater: self.updater.clone(),
        }
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, IndexingError> {
    raw.trim()
        .parse()
        .map_err(|_| IndexingError::config(format!("{key} has an invalid value: '{raw}'")))
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, IndexingError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
