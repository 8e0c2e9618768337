//! PostgreSQL implementation of [`Database`] over sqlx
//!
//! The pool holds a single connection; one transaction stays open from the
//! first statement after a commit until the next commit.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Duration;
use tracing::{debug, info};

use super::{Database, PreparedInsert};
use crate::error::Result;
use crate::schema::{SqlType, Table};
use crate::typemap::Value;

/// Bind parameter limit of the PostgreSQL wire protocol
const MAX_BIND_PARAMETERS: usize = 65_535;

#[derive(Debug, Clone)]
pub struct PgDatabaseOptions {
    pub url: String,
    pub connect_timeout: Duration,

    /// Send a batch as multi-row inserts instead of one insert per row
    pub rewrite_batched_inserts: bool,
}

pub struct PgDatabase {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    rewrite_batched_inserts: bool,
}

impl PgDatabase {
    pub async fn connect(options: &PgDatabaseOptions) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(options.connect_timeout)
            .connect(&options.url)
            .await?;

        info!(
            rewrite_batched_inserts = options.rewrite_batched_inserts,
            "Connected to target database"
        );

        Ok(Self {
            pool,
            tx: None,
            rewrite_batched_inserts: options.rewrite_batched_inserts,
        })
    }

    /// The open transaction, beginning one if needed
    async fn transaction(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };
        Ok(self.tx.insert(tx))
    }

    async fn execute_rows(&mut self, statement: &PreparedInsert<'_>) -> Result<u64> {
        let tx = self.transaction().await?;
        let mut sent = 0;

        for row in statement.rows() {
            let query = row
                .iter()
                .fold(sqlx::query(statement.sql()), |query, value| bind_value(query, value));
            query.execute(&mut **tx).await?;
            sent += 1;
        }

        Ok(sent)
    }

    async fn execute_rewritten(&mut self, statement: &PreparedInsert<'_>) -> Result<u64> {
        let rows_per_insert = (MAX_BIND_PARAMETERS / statement.width()).max(1);
        let rows: Vec<&[Value]> = statement.rows().collect();
        let tx = self.transaction().await?;
        let mut sent = 0;

        for chunk in rows.chunks(rows_per_insert) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(statement.prefix());
            builder.push_values(chunk.iter(), |mut tuple, row| {
                for value in row.iter() {
                    match value {
                        Value::Null(sql_type) => push_null(&mut tuple, *sql_type),
                        Value::Boolean(v) => {
                            tuple.push_bind(*v);
                        },
                        Value::Integer(v) => {
                            tuple.push_bind(*v);
                        },
                        Value::SmallInt(v) => {
                            tuple.push_bind(*v);
                        },
                        Value::Timestamp(v) => {
                            tuple.push_bind(*v);
                        },
                        Value::Varchar(v) => {
                            tuple.push_bind(v.as_str());
                        },
                    }
                }
            });

            builder.build().execute(&mut **tx).await?;
            sent += chunk.len() as u64;
        }

        Ok(sent)
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null(SqlType::Boolean) => query.bind(None::<bool>),
        Value::Null(SqlType::Integer) => query.bind(None::<i32>),
        Value::Null(SqlType::SmallInt) => query.bind(None::<i16>),
        Value::Null(SqlType::Timestamp) => query.bind(None::<NaiveDateTime>),
        Value::Null(SqlType::Varchar(_)) => query.bind(None::<&str>),
        Value::Boolean(v) => query.bind(*v),
        Value::Integer(v) => query.bind(*v),
        Value::SmallInt(v) => query.bind(*v),
        Value::Timestamp(v) => query.bind(*v),
        Value::Varchar(v) => query.bind(v.as_str()),
    }
}

fn push_null(tuple: &mut sqlx::query_builder::Separated<'_, '_, Postgres, &'static str>, sql_type: SqlType) {
    match sql_type {
        SqlType::Boolean => tuple.push_bind(None::<bool>),
        SqlType::Integer => tuple.push_bind(None::<i32>),
        SqlType::SmallInt => tuple.push_bind(None::<i16>),
        SqlType::Timestamp => tuple.push_bind(None::<NaiveDateTime>),
        SqlType::Varchar(_) => tuple.push_bind(None::<String>),
    };
}

#[async_trait]
impl Database for PgDatabase {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        let tx = self.transaction().await?;
        sqlx::query(sql).execute(&mut **tx).await?;
        Ok(())
    }

    async fn prepare<'t>(&mut self, table: &'t Table) -> Result<PreparedInsert<'t>> {
        let statement = PreparedInsert::new(table);
        let tx = self.transaction().await?;

        // Fails early if the insert does not match the created table
        (&mut **tx).prepare(statement.sql()).await?;
        debug!(table = table.name(), sql = statement.sql(), "Prepared insert statement");

        Ok(statement)
    }

    async fn execute_batch(&mut self, statement: &mut PreparedInsert<'_>) -> Result<u64> {
        if statement.pending() == 0 {
            return Ok(0);
        }

        let sent = if self.rewrite_batched_inserts {
            self.execute_rewritten(statement).await?
        } else {
            self.execute_rows(statement).await?
        };

        statement.clear_batch();
        Ok(sent)
    }

    async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let rolled_back = self.rollback().await;
        self.pool.close().await;
        debug!("Closed target database connection");
        rolled_back
    }
}
