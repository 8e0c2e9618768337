//! End-to-end load into a real PostgreSQL
//!
//! These tests require Docker. Run with:
//!
//! ```bash
//! cargo test -p sedump-loader --test postgres_e2e_test -- --ignored --nocapture
//! ```

mod common;

use common::{badges_xml, data_dir, dump_xml, init_test_tracing, tags_xml, TestPostgres};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use sedump_loader::db::{Database, PgDatabase, PgDatabaseOptions};
use sedump_loader::loader::{self, LoadOptions};
use sedump_loader::schema::Catalog;
use sedump_loader::LoadError;

fn db_options(url: &str, rewrite_batched_inserts: bool) -> PgDatabaseOptions {
    PgDatabaseOptions {
        url: url.to_string(),
        connect_timeout: Duration::from_secs(30),
        rewrite_batched_inserts,
    }
}

async fn count(url: &str, table: &str) -> i64 {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(url)
        .await
        .expect("Failed to connect for verification");
    let (n,): (i64,) = sqlx::query_as(&format!("select count(*) from {}", table))
        .fetch_one(&pool)
        .await
        .expect("Count query failed");
    pool.close().await;
    n
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_load_badges_and_tags() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = data_dir(&[("badges", badges_xml(2049)), ("tags", tags_xml(10))]).unwrap();
    let catalog = Catalog::stack_exchange().unwrap();

    for rewrite in [true, false] {
        let mut db = PgDatabase::connect(&db_options(pg.connection_string(), rewrite))
            .await
            .expect("Failed to connect");

        let tables = vec!["badges".to_string(), "tags".to_string()];
        let summary = loader::run(&mut db, &catalog, dir.path(), &tables, &LoadOptions::default())
            .await
            .expect("Load failed");
        db.close().await.unwrap();

        assert_eq!(summary.total_rows(), 2059);
        assert_eq!(summary.tables[0].batches, 3);
    }

    // Tables are created once and appended to on the second pass
    assert_eq!(count(pg.connection_string(), "badges").await, 2 * 2049);
    assert_eq!(count(pg.connection_string(), "tags").await, 20);

    let pool = PgPoolOptions::new()
        .connect(pg.connection_string())
        .await
        .unwrap();
    let nulls: (i64,) = sqlx::query_as("select count(*) from tags where is_required is null")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(nulls.0, 10);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_failed_table_keeps_committed_batches() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");

    let mut rows: Vec<_> = (1..=25).map(common::badge_row).collect();
    rows[22][4].1 = "not-a-class".to_string();
    let dir = data_dir(&[("badges", dump_xml("badges", &rows))]).unwrap();
    let catalog = Catalog::stack_exchange().unwrap();

    let mut db = PgDatabase::connect(&db_options(pg.connection_string(), true))
        .await
        .unwrap();
    let options = LoadOptions {
        batch_size: 10,
        ..LoadOptions::default()
    };
    let err = loader::run(&mut db, &catalog, dir.path(), &["badges".to_string()], &options)
        .await
        .unwrap_err();
    db.close().await.unwrap();

    assert!(matches!(err, LoadError::ValueParse { ref column, .. } if column == "Class"));
    assert_eq!(count(pg.connection_string(), "badges").await, 20);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_overlength_varchar_is_rejected_by_database() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");

    let mut rows: Vec<_> = (1..=3).map(common::badge_row).collect();
    rows[1][2].1 = "x".repeat(51);
    let dir = data_dir(&[("badges", dump_xml("badges", &rows))]).unwrap();
    let catalog = Catalog::stack_exchange().unwrap();

    let mut db = PgDatabase::connect(&db_options(pg.connection_string(), true))
        .await
        .unwrap();
    let err = loader::run(
        &mut db,
        &catalog,
        dir.path(),
        &["badges".to_string()],
        &LoadOptions::default(),
    )
    .await
    .unwrap_err();
    db.close().await.unwrap();

    assert!(matches!(err, LoadError::Database(_)));
    assert_eq!(count(pg.connection_string(), "badges").await, 0);
}
