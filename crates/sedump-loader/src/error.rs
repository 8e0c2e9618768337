//! Error types for dump loading
//!
//! Nothing here is recovered locally: every variant aborts the table being
//! loaded and, through the driver, the whole run.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::typemap::ParseFailure;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Error, Debug)]
pub enum LoadError {
    /// A table or column descriptor is malformed
    #[error("Schema configuration error: {0}")]
    SchemaConfig(String),

    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Table '{table}' has no column for attribute '{attribute}'")]
    UnknownColumn { table: String, attribute: String },

    #[error("Row in table '{table}' is missing required attribute '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Cannot parse {value:?} for column '{table}.{column}': {source}")]
    ValueParse {
        table: String,
        column: String,
        value: String,
        #[source]
        source: ParseFailure,
    },

    #[error("Failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The decompressed stream failed underneath the tokenizer
    #[error("Failed to read dump stream: {0}")]
    Read(#[source] Arc<std::io::Error>),

    #[error("Malformed dump document: {0}")]
    Xml(#[source] quick_xml::Error),

    #[error("Dump document ends after {rows} rows with {open_elements} unclosed element(s)")]
    Truncated { rows: u64, open_elements: usize },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<quick_xml::Error> for LoadError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(source) => Self::Read(source),
            other => Self::Xml(other),
        }
    }
}

impl LoadError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaConfig(message.into())
    }
}
