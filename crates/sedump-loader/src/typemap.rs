//! Type mapping between dump attributes and PostgreSQL
//!
//! For every [`SqlType`] this module knows the DDL fragment to emit and how to
//! turn the dump's attribute text into a bindable [`Value`]. The dispatch on
//! the type happens once per column, when a [`Binder`] is built; per row only
//! the selected parser runs.

use chrono::NaiveDateTime;
use std::borrow::Cow;
use std::num::ParseIntError;
use thiserror::Error;

use crate::schema::{Column, SqlType, VarcharLength};

/// A native value ready to be bound to a statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL null, typed so the driver can send the right parameter type
    Null(SqlType),
    Boolean(bool),
    Integer(i32),
    SmallInt(i16),
    Timestamp(NaiveDateTime),
    Varchar(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }
}

/// Why an attribute string could not be parsed
#[derive(Error, Debug)]
pub enum ParseFailure {
    #[error("expected `True` or `False`")]
    Boolean,

    #[error("invalid integer: {0}")]
    Integer(#[from] ParseIntError),

    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

pub type ValueParser = fn(&str) -> Result<Value, ParseFailure>;

impl SqlType {
    /// DDL type used in `create table`
    pub fn ddl_type(&self) -> Cow<'static, str> {
        match self {
            SqlType::Boolean => Cow::Borrowed("boolean"),
            SqlType::Integer => Cow::Borrowed("int"),
            SqlType::SmallInt => Cow::Borrowed("smallint"),
            SqlType::Timestamp => Cow::Borrowed("timestamp"),
            SqlType::Varchar(VarcharLength::Bounded(n)) => Cow::Owned(format!("varchar({})", n)),
            SqlType::Varchar(VarcharLength::Unbounded) => Cow::Borrowed("text"),
        }
    }

    pub fn parser(&self) -> ValueParser {
        match self {
            SqlType::Boolean => boolean_value,
            SqlType::Integer => integer_value,
            SqlType::SmallInt => smallint_value,
            SqlType::Timestamp => timestamp_value,
            SqlType::Varchar(_) => varchar_value,
        }
    }
}

fn boolean_value(raw: &str) -> Result<Value, ParseFailure> {
    parse_boolean(raw).map(Value::Boolean)
}

fn integer_value(raw: &str) -> Result<Value, ParseFailure> {
    Ok(Value::Integer(raw.parse()?))
}

fn smallint_value(raw: &str) -> Result<Value, ParseFailure> {
    Ok(Value::SmallInt(raw.parse()?))
}

fn timestamp_value(raw: &str) -> Result<Value, ParseFailure> {
    parse_timestamp(raw).map(Value::Timestamp)
}

fn varchar_value(raw: &str) -> Result<Value, ParseFailure> {
    Ok(Value::Varchar(raw.to_owned()))
}

/// Dump booleans are exactly `True` or `False`
pub fn parse_boolean(raw: &str) -> Result<bool, ParseFailure> {
    match raw {
        "True" => Ok(true),
        "False" => Ok(false),
        _ => Err(ParseFailure::Boolean),
    }
}

/// ISO local date-time without offset; seconds and fraction are optional
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ParseFailure> {
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(ts) => Ok(ts),
        Err(err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").map_err(|_| err.into()),
    }
}

/// Parses one column's attribute and names the parameter it belongs to
#[derive(Clone, Copy)]
pub struct Binder {
    position: usize,
    parse: ValueParser,
}

impl Binder {
    /// `position` is 1-based, matching the insert statement placeholders
    pub fn new(position: usize, column: &Column) -> Self {
        Self {
            position,
            parse: column.sql_type().parser(),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn parse(&self, raw: &str) -> Result<Value, ParseFailure> {
        (self.parse)(raw)
    }
}

impl std::fmt::Debug for Binder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder").field("position", &self.position).finish()
    }
}
