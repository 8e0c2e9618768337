//! Configuration management

use anyhow::Context;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::db::PgDatabaseOptions;
use crate::loader::{LoadOptions, DEFAULT_BATCH_SIZE};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default directory holding the `<table>.xml.gz` dump files.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://so:so@localhost/so";

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default interval between progress reports in milliseconds.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1000;

/// Multi-row insert rewriting is on unless disabled.
pub const DEFAULT_REWRITE_BATCHED_INSERTS: bool = true;

/// Loader configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database: DatabaseConfig,
    pub batch_size: usize,
    pub progress_interval_ms: u64,
    /// Tables to load; empty means every table in the catalog
    pub tables: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub connect_timeout_secs: u64,
    pub rewrite_batched_inserts: bool,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_vars(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Build a configuration from a variable lookup, without validating it
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            data_dir: var("SEDUMP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            database: DatabaseConfig {
                url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                connect_timeout_secs: parse_var(&var, "DATABASE_CONNECT_TIMEOUT")?
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
                rewrite_batched_inserts: parse_var(&var, "SEDUMP_REWRITE_BATCHED_INSERTS")?
                    .unwrap_or(DEFAULT_REWRITE_BATCHED_INSERTS),
            },
            batch_size: parse_var(&var, "SEDUMP_BATCH_SIZE")?.unwrap_or(DEFAULT_BATCH_SIZE),
            progress_interval_ms: parse_var(&var, "SEDUMP_PROGRESS_INTERVAL_MS")?
                .unwrap_or(DEFAULT_PROGRESS_INTERVAL_MS),
            tables: var("SEDUMP_TABLES")
                .map(|list| {
                    list.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.batch_size == 0 {
            anyhow::bail!("Batch size must be greater than 0");
        }

        if self.progress_interval_ms == 0 {
            anyhow::bail!("Progress interval must be greater than 0");
        }

        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            batch_size: self.batch_size,
            progress_interval: Duration::from_millis(self.progress_interval_ms),
        }
    }

    pub fn database_options(&self) -> PgDatabaseOptions {
        PgDatabaseOptions {
            url: self.database.url.clone(),
            connect_timeout: Duration::from_secs(self.database.connect_timeout_secs),
            rewrite_batched_inserts: self.database.rewrite_batched_inserts,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                rewrite_batched_inserts: DEFAULT_REWRITE_BATCHED_INSERTS,
            },
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            tables: Vec::new(),
        }
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}
