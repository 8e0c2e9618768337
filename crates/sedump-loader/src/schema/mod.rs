//! Table and column descriptors for the dump tables
//!
//! Descriptors are built once, validated, and then only read. Each [`Column`]
//! keeps its source attribute name untouched; the database identifier is
//! derived on demand with [`to_snake_case`].

mod catalog;
mod naming;

pub use catalog::Catalog;
pub use naming::to_snake_case;

use std::collections::HashSet;

use crate::error::{LoadError, Result};

/// Declared length of a varchar column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarcharLength {
    Bounded(u32),
    Unbounded,
}

/// The closed set of column types found in the dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Boolean,
    Integer,
    SmallInt,
    Timestamp,
    Varchar(VarcharLength),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    sql_type: SqlType,
    nullable: bool,
}

impl Column {
    /// A non-nullable column of a fixed-width type
    pub fn fixed(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: false,
        }
    }

    pub fn varchar(name: impl Into<String>, length: u32) -> Self {
        Self::fixed(name, SqlType::Varchar(VarcharLength::Bounded(length)))
    }

    /// Unbounded varchar, emitted as `text`
    pub fn text(name: impl Into<String>) -> Self {
        Self::fixed(name, SqlType::Varchar(VarcharLength::Unbounded))
    }

    pub fn with_nulls(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Source attribute name, exactly as it appears in the dump
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pg_name(&self) -> String {
        to_snake_case(&self.name)
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    fn validate(&self, table: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(LoadError::schema(format!(
                "table '{}' has a column with an empty name",
                table
            )));
        }
        if self.sql_type == SqlType::Varchar(VarcharLength::Bounded(0)) {
            return Err(LoadError::schema(format!(
                "column '{}.{}' declares varchar(0)",
                table, self.name
            )));
        }
        Ok(())
    }
}

/// A dump table: its source name and ordered columns
///
/// Column order is the DDL column order and the positional binding order of
/// the insert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    /// Build a validated table descriptor
    ///
    /// Fails with `SchemaConfig` when the name is empty, there are no columns,
    /// a column is malformed, or two columns share a name.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(LoadError::schema("table name cannot be empty"));
        }
        if columns.is_empty() {
            return Err(LoadError::schema(format!("table '{}' has no columns", name)));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            column.validate(&name)?;
            if !seen.insert(column.name()) {
                return Err(LoadError::schema(format!(
                    "table '{}' declares column '{}' twice",
                    name,
                    column.name()
                )));
            }
        }

        Ok(Self { name, columns })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pg_name(&self) -> String {
        to_snake_case(&self.name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Dump file name by convention: `<name>.xml.gz`
    pub fn source_file_name(&self) -> String {
        format!("{}.xml.gz", self.name)
    }
}
