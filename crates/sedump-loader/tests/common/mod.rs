//! Common test utilities for sedump loader integration tests
//!
//! - [`MemoryDatabase`]: a [`Database`] that records every call and keeps
//!   committed and uncommitted rows apart, with optional commit failure
//! - dump fixture builders and gzip writers for temporary data directories
//! - [`TestPostgres`]: a PostgreSQL container for the end-to-end tests
#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;

use sedump_loader::db::{Database, PreparedInsert};
use sedump_loader::schema::Table;
use sedump_loader::typemap::Value;
use sedump_loader::{LoadError, Result as LoadResult};

// ============================================================================
// In-memory Database
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    /// DDL passed to `execute`, in order
    pub executed: Vec<String>,
    /// Tables for which an insert was prepared
    pub prepared: Vec<String>,
    /// Rows made durable by each successful commit, DDL commits included
    pub commits: Vec<usize>,
    pub committed: Vec<Vec<Value>>,
    pub uncommitted: Vec<Vec<Value>>,
    pub rollbacks: usize,
    pub closed: bool,
    /// 1-based commit call that fails
    pub fail_commit: Option<usize>,
    commit_calls: usize,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_commit(n: usize) -> Self {
        Self {
            fail_commit: Some(n),
            ..Self::default()
        }
    }

    /// Sizes of the commits that carried rows, skipping DDL commits
    pub fn batch_commits(&self) -> Vec<usize> {
        self.commits.iter().copied().filter(|&n| n > 0).collect()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn execute(&mut self, sql: &str) -> LoadResult<()> {
        self.executed.push(sql.to_string());
        Ok(())
    }

    async fn prepare<'t>(&mut self, table: &'t Table) -> LoadResult<PreparedInsert<'t>> {
        self.prepared.push(table.name().to_string());
        Ok(PreparedInsert::new(table))
    }

    async fn execute_batch(&mut self, statement: &mut PreparedInsert<'_>) -> LoadResult<u64> {
        let sent = statement.pending() as u64;
        self.uncommitted
            .extend(statement.rows().map(|row| row.to_vec()));
        statement.clear_batch();
        Ok(sent)
    }

    async fn commit(&mut self) -> LoadResult<()> {
        self.commit_calls += 1;
        if self.fail_commit == Some(self.commit_calls) {
            return Err(LoadError::Database(sqlx::Error::Protocol(
                "injected commit failure".to_string(),
            )));
        }

        self.commits.push(self.uncommitted.len());
        self.committed.append(&mut self.uncommitted);
        Ok(())
    }

    async fn rollback(&mut self) -> LoadResult<()> {
        self.rollbacks += 1;
        self.uncommitted.clear();
        Ok(())
    }

    async fn close(&mut self) -> LoadResult<()> {
        self.uncommitted.clear();
        self.closed = true;
        Ok(())
    }
}

// ============================================================================
// Dump Fixtures
// ============================================================================

/// A dump document with one `row` element per attribute list
pub fn dump_xml(root: &str, rows: &[Vec<(&str, String)>]) -> String {
    let mut xml = format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<{}>\n", root);
    for row in rows {
        xml.push_str("  <row");
        for (name, value) in row {
            xml.push_str(&format!(" {}=\"{}\"", name, escape(value)));
        }
        xml.push_str(" />\n");
    }
    xml.push_str(&format!("</{}>\n", root));
    xml
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A valid Badges row
pub fn badge_row(id: u32) -> Vec<(&'static str, String)> {
    vec![
        ("Id", id.to_string()),
        ("UserId", (id % 97).to_string()),
        ("Name", format!("Badge {}", id)),
        ("Date", "2014-05-13T23:58:30.457".to_string()),
        ("Class", "3".to_string()),
        ("TagBased", if id % 2 == 0 { "True" } else { "False" }.to_string()),
    ]
}

pub fn badges_xml(count: u32) -> String {
    let rows: Vec<_> = (1..=count).map(badge_row).collect();
    dump_xml("badges", &rows)
}

/// A valid Tags row; the two optional flags are left out on odd ids
pub fn tag_row(id: u32) -> Vec<(&'static str, String)> {
    let mut row = vec![
        ("Id", id.to_string()),
        ("TagName", format!("tag-{}", id)),
        ("Count", (id * 10).to_string()),
        ("ExcerptPostId", (id + 1000).to_string()),
        ("WikiPostId", (id + 2000).to_string()),
    ];
    if id % 2 == 0 {
        row.push(("IsModeratorOnly", "False".to_string()));
        row.push(("IsRequired", "True".to_string()));
    }
    row
}

pub fn tags_xml(count: u32) -> String {
    let rows: Vec<_> = (1..=count).map(tag_row).collect();
    dump_xml("tags", &rows)
}

/// Gzip `xml` into `dir/<file_name>`
pub fn write_gz(dir: &Path, file_name: &str, xml: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let mut encoder = GzEncoder::new(file, Compression::fast());
    encoder.write_all(xml.as_bytes())?;
    encoder.finish()?;
    Ok(path)
}

/// Write `<table>.xml.gz` for each entry into a fresh temporary directory
pub fn data_dir(tables: &[(&str, String)]) -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    for (table, xml) in tables {
        write_gz(dir.path(), &format!("{}.xml.gz", table), xml)?;
    }
    Ok(dir)
}

pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,sedump_loader=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    connection_string: String,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        let container = Postgres::default()
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        Ok(Self {
            _container: container,
            connection_string,
        })
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}
