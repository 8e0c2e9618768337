//! sedump - Stack Exchange dump loader

use anyhow::Result;
use clap::Parser;
use sedump_common::logging::{init_logging, LogConfig, LogLevel};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

use sedump_loader::config::Config;
use sedump_loader::db::{Database, PgDatabase};
use sedump_loader::loader;
use sedump_loader::schema::Catalog;

/// Load Stack Exchange `<table>.xml.gz` dumps into PostgreSQL
#[derive(Parser, Debug)]
#[command(name = "sedump", version, about)]
struct Cli {
    /// Directory containing the dump files [env: SEDUMP_DATA_DIR]
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Target database [env: DATABASE_URL]
    #[arg(long)]
    database_url: Option<String>,

    /// Rows per commit [env: SEDUMP_BATCH_SIZE]
    #[arg(long)]
    batch_size: Option<usize>,

    /// Load only this table (repeatable) [env: SEDUMP_TABLES]
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<String>,

    /// Execute one insert per row instead of multi-row inserts
    #[arg(long)]
    no_rewrite: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if !self.tables.is_empty() {
            config.tables = self.tables;
        }
        if self.no_rewrite {
            config.database.rewrite_batched_inserts = false;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .log_file_prefix("sedump")
        .filter_directives("sqlx=warn")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {:#}", e);
            process::exit(2);
        },
    };

    if let Err(e) = execute(cli).await {
        error!(error = %format!("{:#}", e), "Load failed");
        process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    cli.apply(&mut config);
    config.validate()?;

    info!(
        data_dir = %config.data_dir.display(),
        batch_size = config.batch_size,
        "Configuration loaded"
    );

    let catalog = Catalog::stack_exchange()?;
    let mut db = PgDatabase::connect(&config.database_options()).await?;

    let result = loader::run(
        &mut db,
        &catalog,
        &config.data_dir,
        &config.tables,
        &config.load_options(),
    )
    .await;

    if let Err(e) = db.close().await {
        error!(error = %e, "Failed to close database connection");
    }

    let summary = result?;
    for stats in &summary.tables {
        info!(
            table = %stats.table,
            rows = stats.rows,
            batches = stats.batches,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Table summary"
        );
    }
    info!(
        tables = summary.tables.len(),
        rows = summary.total_rows(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Load complete"
    );

    Ok(())
}
