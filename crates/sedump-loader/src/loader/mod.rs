//! Streaming table loader
//!
//! Each table goes through `Opening -> Streaming -> Draining -> Closed`, with
//! `Failed` reachable from any state. Rows are bound into the table's
//! [`PreparedInsert`] one at a time and committed every `batch_size` rows;
//! the last partial batch is always drained at end of input. On failure the
//! open transaction is rolled back, so only whole committed batches remain.

mod binding;
mod progress;
mod source;

pub use binding::BindingPlan;
pub use progress::{ProgressMonitor, ProgressReport, DEFAULT_PROGRESS_INTERVAL};
pub use source::RowReader;

use std::io::BufRead;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::db::{Database, PreparedInsert};
use crate::error::Result;
use crate::schema::{Catalog, Table};
use crate::statement;

/// Rows per commit
pub const DEFAULT_BATCH_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Opening,
    Streaming,
    Draining,
    Closed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub batch_size: usize,
    pub progress_interval: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Outcome of one table's load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadStats {
    pub table: String,
    pub rows: u64,
    /// Drain cycles, including the final one
    pub batches: u64,
    pub elapsed: Duration,
    /// Closing throughput report
    pub progress: ProgressReport,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub tables: Vec<LoadStats>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

struct TableLoad<'t> {
    table: &'t Table,
    state: LoadState,
    batches: u64,
}

impl<'t> TableLoad<'t> {
    fn new(table: &'t Table) -> Self {
        Self {
            table,
            state: LoadState::Opening,
            batches: 0,
        }
    }

    fn transition(&mut self, next: LoadState) {
        debug!(table = self.table.name(), from = ?self.state, to = ?next, "Load state changed");
        self.state = next;
    }

    async fn stream<D, R>(
        &mut self,
        db: &mut D,
        rows: &mut RowReader<R>,
        options: &LoadOptions,
    ) -> Result<ProgressReport>
    where
        D: Database + ?Sized,
        R: BufRead,
    {
        let mut statement = db.prepare(self.table).await?;
        let plan = BindingPlan::new(self.table);
        let mut monitor = ProgressMonitor::with_interval(self.table.name(), options.progress_interval);
        self.transition(LoadState::Streaming);

        loop {
            plan.reset(&mut statement);
            let more = rows.next_row(|attribute, raw| plan.bind(&mut statement, attribute, raw))?;
            if !more {
                break;
            }

            statement.add_to_batch()?;
            monitor.increment();

            if statement.pending() >= options.batch_size {
                self.drain(db, &mut statement).await?;
                self.transition(LoadState::Streaming);
            }
        }

        self.drain(db, &mut statement).await?;
        Ok(monitor.finish())
    }

    async fn drain<D>(&mut self, db: &mut D, statement: &mut PreparedInsert<'_>) -> Result<()>
    where
        D: Database + ?Sized,
    {
        self.transition(LoadState::Draining);
        let sent = db.execute_batch(statement).await?;
        db.commit().await?;
        self.batches += 1;
        debug!(table = self.table.name(), rows = sent, batch = self.batches, "Committed batch");
        Ok(())
    }
}

/// Stream every row of `rows` into `table`
///
/// The table must already exist. On error the uncommitted batch is rolled
/// back and the error is returned; earlier batches stay committed.
#[instrument(skip_all, fields(table = table.name()))]
pub async fn load_table<D, R>(
    db: &mut D,
    table: &Table,
    mut rows: RowReader<R>,
    options: &LoadOptions,
) -> Result<LoadStats>
where
    D: Database + ?Sized,
    R: BufRead,
{
    let started = Instant::now();
    let mut load = TableLoad::new(table);

    match load.stream(db, &mut rows, options).await {
        Ok(progress) => {
            load.transition(LoadState::Closed);
            let stats = LoadStats {
                table: table.name().to_string(),
                rows: progress.total,
                batches: load.batches,
                elapsed: started.elapsed(),
                progress,
            };
            info!(
                table = table.name(),
                rows = stats.rows,
                batches = stats.batches,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "Table loaded"
            );
            Ok(stats)
        },
        Err(err) => {
            load.transition(LoadState::Failed);
            if let Err(rollback_err) = db.rollback().await {
                warn!(table = table.name(), error = %rollback_err, "Rollback after failure failed");
            }
            error!(
                table = table.name(),
                rows_read = rows.rows(),
                committed_batches = load.batches,
                error = %err,
                "Table load failed"
            );
            Err(err)
        },
    }
}

/// Create and load each selected table from `data_dir`, in catalog order
///
/// An empty `tables` selects the whole catalog. The first error aborts the
/// run.
#[instrument(skip_all, fields(data_dir = %data_dir.display()))]
pub async fn run<D>(
    db: &mut D,
    catalog: &Catalog,
    data_dir: &Path,
    tables: &[String],
    options: &LoadOptions,
) -> Result<RunSummary>
where
    D: Database + ?Sized,
{
    let selected = catalog.select(tables)?;
    let started = Instant::now();
    let mut summary = RunSummary::default();

    info!(tables = selected.len(), batch_size = options.batch_size, "Starting load");

    for table in selected {
        create_table(db, table).await?;

        let path = data_dir.join(table.source_file_name());
        info!(table = table.name(), path = %path.display(), "Loading table");

        let rows = match RowReader::open(&path) {
            Ok(rows) => rows,
            Err(err) => {
                error!(table = table.name(), error = %err, "Cannot open dump file");
                return Err(err);
            },
        };

        summary.tables.push(load_table(db, table, rows, options).await?);
    }

    summary.elapsed = started.elapsed();
    Ok(summary)
}

async fn create_table<D>(db: &mut D, table: &Table) -> Result<()>
where
    D: Database + ?Sized,
{
    let ddl = statement::create_statement(table);
    debug!(table = table.name(), sql = %ddl, "Creating table");
    db.execute(&ddl).await?;
    db.commit().await
}
