//! DDL and DML text for a table descriptor

use crate::schema::Table;

/// `create table if not exists` with columns in declaration order
///
/// Non-nullable columns carry `not null`.
pub fn create_statement(table: &Table) -> String {
    let columns = table
        .columns()
        .iter()
        .map(|column| {
            let mut definition = format!("{} {}", column.pg_name(), column.sql_type().ddl_type());
            if !column.is_nullable() {
                definition.push_str(" not null");
            }
            definition
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("create table if not exists {} ({});", table.pg_name(), columns)
}

/// `insert into <table> (<columns>) ` without the values clause
pub fn insert_prefix(table: &Table) -> String {
    let columns = table
        .columns()
        .iter()
        .map(|column| column.pg_name())
        .collect::<Vec<_>>()
        .join(", ");

    format!("insert into {} ({}) ", table.pg_name(), columns)
}

/// Single-row insert with one positional parameter per column
///
/// Parameter `$n` binds column `n` (1-based) of the table. The loader relies
/// on this order.
pub fn insert_statement(table: &Table) -> String {
    let placeholders = (1..=table.columns().len())
        .map(|position| format!("${}", position))
        .collect::<Vec<_>>()
        .join(", ");

    format!("{}values ({});", insert_prefix(table), placeholders)
}
