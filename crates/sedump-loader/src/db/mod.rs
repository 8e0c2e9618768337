//! Database collaborator used by the loader
//!
//! The loader talks to the target database only through [`Database`]. A
//! [`PreparedInsert`] is the statement handle: it owns the parameter buffer for
//! the row being bound and the batch of rows waiting for the next
//! `execute_batch`.

mod postgres;

pub use postgres::{PgDatabase, PgDatabaseOptions};

use async_trait::async_trait;

use crate::error::{LoadError, Result};
use crate::schema::{SqlType, Table};
use crate::statement;
use crate::typemap::Value;

/// Connection to the target database in explicit-commit mode
///
/// Implementations keep one transaction open between commits. Nothing is
/// durable until [`Database::commit`] returns.
#[async_trait]
pub trait Database: Send {
    /// Execute a DDL statement inside the open transaction
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Prepare the table's insert statement
    async fn prepare<'t>(&mut self, table: &'t Table) -> Result<PreparedInsert<'t>>;

    /// Send every pending row of `statement` and clear its batch
    ///
    /// Returns the number of rows sent.
    async fn execute_batch(&mut self, statement: &mut PreparedInsert<'_>) -> Result<u64>;

    async fn commit(&mut self) -> Result<()>;

    /// Discard the open transaction, if any
    async fn rollback(&mut self) -> Result<()>;

    /// Roll back anything uncommitted and release the connection
    async fn close(&mut self) -> Result<()>;
}

/// Parameter buffer and pending batch for one table's insert statement
///
/// Parameters are addressed by 1-based position, the same numbering as the
/// `$n` placeholders. After [`PreparedInsert::add_to_batch`] every position is
/// unbound again.
#[derive(Debug)]
pub struct PreparedInsert<'t> {
    table: &'t Table,
    sql: String,
    prefix: String,
    parameters: Vec<Option<Value>>,
    batch: Vec<Value>,
}

impl<'t> PreparedInsert<'t> {
    pub fn new(table: &'t Table) -> Self {
        Self {
            table,
            sql: statement::insert_statement(table),
            prefix: statement::insert_prefix(table),
            parameters: vec![None; table.columns().len()],
            batch: Vec::new(),
        }
    }

    pub fn table(&self) -> &'t Table {
        self.table
    }

    /// Single-row insert text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// `insert into ... (...) ` used when rewriting a batch into multi-row inserts
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of parameters per row
    pub fn width(&self) -> usize {
        self.parameters.len()
    }

    pub fn bind_null(&mut self, position: usize, sql_type: SqlType) {
        self.bind(position, Value::Null(sql_type));
    }

    /// Bind `value` at `position`, replacing whatever was bound there
    ///
    /// # Panics
    ///
    /// Panics if `position` is 0 or greater than the table's column count.
    pub fn bind(&mut self, position: usize, value: Value) {
        self.parameters[position - 1] = Some(value);
    }

    pub fn parameter(&self, position: usize) -> Option<&Value> {
        self.parameters.get(position.checked_sub(1)?)?.as_ref()
    }

    /// Move the bound parameters into the batch
    ///
    /// Fails with `MissingColumn` when a position was never bound for this
    /// row; the batch is left untouched in that case.
    pub fn add_to_batch(&mut self) -> Result<()> {
        if let Some(index) = self.parameters.iter().position(Option::is_none) {
            return Err(LoadError::MissingColumn {
                table: self.table.name().to_string(),
                column: self.table.columns()[index].name().to_string(),
            });
        }

        self.batch
            .extend(self.parameters.iter_mut().filter_map(Option::take));
        Ok(())
    }

    /// Rows waiting for `execute_batch`
    pub fn pending(&self) -> usize {
        self.batch.len() / self.width()
    }

    /// Pending rows, each a slice of `width()` values in column order
    pub fn rows(&self) -> std::slice::ChunksExact<'_, Value> {
        self.batch.chunks_exact(self.width())
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }
}
