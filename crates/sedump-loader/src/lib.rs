//! sedump Loader Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Bulk-loads Stack Exchange data dumps (`<table>.xml.gz`) into PostgreSQL.
//!
//! # Overview
//!
//! - **Schema**: the seven dump tables as explicit column descriptors
//! - **Type Mapping**: DDL types and attribute parsers per SQL type
//! - **Statements**: `create table` and positional `insert` text
//! - **Database**: the [`db::Database`] collaborator and its sqlx implementation
//! - **Loader**: gzip + XML streaming, batching, commits and progress
//!
//! Each table is created, then streamed row by row. Rows are committed in
//! batches of 1024 by default, with a final commit for the last partial
//! batch.
//!
//! # Example
//!
//! ```no_run
//! use sedump_loader::{config::Config, db::PgDatabase, loader, schema::Catalog};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let catalog = Catalog::stack_exchange()?;
//!     let mut db = PgDatabase::connect(&config.database_options()).await?;
//!
//!     let summary = loader::run(
//!         &mut db,
//!         &catalog,
//!         &config.data_dir,
//!         &config.tables,
//!         &config.load_options(),
//!     )
//!     .await?;
//!     println!("loaded {} rows", summary.total_rows());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod loader;
pub mod schema;
pub mod statement;
pub mod typemap;

pub use error::{LoadError, Result};
