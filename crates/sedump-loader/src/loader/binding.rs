//! Attribute-to-parameter resolution for one table
//!
//! A [`BindingPlan`] is built once when a table is opened and never changes
//! while its rows stream through.

use std::collections::HashMap;

use crate::db::PreparedInsert;
use crate::error::{LoadError, Result};
use crate::schema::{SqlType, Table};
use crate::typemap::Binder;

#[derive(Debug)]
pub struct BindingPlan {
    /// 1-based positions of nullable columns with the null type to bind
    nullable: Vec<(usize, SqlType)>,
    binders: HashMap<String, Binder>,
}

impl BindingPlan {
    pub fn new(table: &Table) -> Self {
        let mut nullable = Vec::new();
        let mut binders = HashMap::with_capacity(table.columns().len());

        for (index, column) in table.columns().iter().enumerate() {
            let position = index + 1;
            if column.is_nullable() {
                nullable.push((position, column.sql_type()));
            }
            binders.insert(column.name().to_string(), Binder::new(position, column));
        }

        Self { nullable, binders }
    }

    pub fn nullable_positions(&self) -> &[(usize, SqlType)] {
        &self.nullable
    }

    /// Bind null at every nullable position before a row's attributes apply
    pub fn reset(&self, statement: &mut PreparedInsert<'_>) {
        for &(position, sql_type) in &self.nullable {
            statement.bind_null(position, sql_type);
        }
    }

    /// Parse `raw` for the column named `attribute` and bind it
    pub fn bind(&self, statement: &mut PreparedInsert<'_>, attribute: &str, raw: &str) -> Result<()> {
        let table = statement.table();
        let binder = self
            .binders
            .get(attribute)
            .ok_or_else(|| LoadError::UnknownColumn {
                table: table.name().to_string(),
                attribute: attribute.to_string(),
            })?;

        let value = binder.parse(raw).map_err(|source| LoadError::ValueParse {
            table: table.name().to_string(),
            column: attribute.to_string(),
            value: raw.to_string(),
            source,
        })?;

        statement.bind(binder.position(), value);
        Ok(())
    }
}
