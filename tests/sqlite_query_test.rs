//! Integration tests against a real SQLite database.
//!
//! Tests verify that:
//! - The pool opens SQLite files read-only
//! - The executor enforces the row cap and reports truncation
//! - The schema inspector produces a capped snapshot with model-ready context

use askdb::config::DatabaseConfig;
use askdb::db::{DbPool, QueryExecutor, SchemaInspector};
use askdb::models::QueryRequest;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Create and seed a SQLite database file, then return a read-only pool on it.
async fn setup_db() -> (DbPool, String) {
    let temp_file = NamedTempFile::new().unwrap();
    // Keep the temp file alive - prevent deletion when function returns
    let db_path = temp_file
        .into_temp_path()
        .keep()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    // Seed with a plain writable connection; the tool itself never gets one
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))
        .unwrap()
        .create_if_missing(true);
    let seed_pool = SqlitePool::connect_with(options).await.unwrap();
    sqlx::query("CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT, spend REAL)")
        .execute(&seed_pool)
        .await
        .unwrap();
    sqlx::query("CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, total REAL)")
        .execute(&seed_pool)
        .await
        .unwrap();
    for i in 0..20 {
        sqlx::query("INSERT INTO customers (name, spend) VALUES (?, ?)")
            .bind(format!("customer-{i}"))
            .bind(i as f64 * 10.0)
            .execute(&seed_pool)
            .await
            .unwrap();
    }
    seed_pool.close().await;

    let config = DatabaseConfig::parse(&format!("sqlite:{}", db_path)).unwrap();
    let pool = DbPool::connect(&config, Duration::from_secs(5))
        .await
        .unwrap();
    (pool, db_path)
}

#[tokio::test]
async fn test_select_returns_rows_and_columns() {
    let (pool, _path) = setup_db().await;
    let executor = QueryExecutor::new();

    let request = QueryRequest::new("SELECT id, name FROM customers ORDER BY id LIMIT 3");
    let result = executor.execute_query(&pool, &request).await.unwrap();

    assert_eq!(result.columns, vec!["id", "name"]);
    assert_eq!(result.row_count(), 3);
    assert!(!result.truncated);
    assert_eq!(result.rows[0]["name"], serde_json::json!("customer-0"));

    pool.close().await;
}

#[tokio::test]
async fn test_row_cap_truncates_unbounded_select() {
    let (pool, _path) = setup_db().await;
    let executor = QueryExecutor::new();

    // 20 rows seeded, cap at 5: exactly 5 back and the truncated flag set
    let mut request = QueryRequest::new("SELECT * FROM customers");
    request.limit = Some(5);
    let result = executor.execute_query(&pool, &request).await.unwrap();

    assert_eq!(result.row_count(), 5);
    assert!(result.truncated);

    // Cap above the table size: everything back, not truncated
    let mut request = QueryRequest::new("SELECT * FROM customers");
    request.limit = Some(100);
    let result = executor.execute_query(&pool, &request).await.unwrap();

    assert_eq!(result.row_count(), 20);
    assert!(!result.truncated);

    pool.close().await;
}

#[tokio::test]
async fn test_empty_result_set() {
    let (pool, _path) = setup_db().await;
    let executor = QueryExecutor::new();

    let request = QueryRequest::new("SELECT * FROM customers WHERE id = -1");
    let result = executor.execute_query(&pool, &request).await.unwrap();

    assert_eq!(result.row_count(), 0);
    assert!(!result.truncated);

    pool.close().await;
}

#[tokio::test]
async fn test_readonly_pool_rejects_writes() {
    let (pool, _path) = setup_db().await;
    let executor = QueryExecutor::new();

    // The guard blocks writes before execution; this checks the second
    // layer, the read-only file handle itself.
    let request = QueryRequest::new("INSERT INTO customers (name) VALUES ('x')");
    let result = executor.execute_query(&pool, &request).await;
    assert!(result.is_err(), "write on read-only pool should fail");

    pool.close().await;
}

#[tokio::test]
async fn test_sql_error_is_reported_not_fatal() {
    let (pool, _path) = setup_db().await;
    let executor = QueryExecutor::new();

    let request = QueryRequest::new("SELECT * FROM no_such_table");
    let result = executor.execute_query(&pool, &request).await;

    let err = result.unwrap_err();
    assert!(!err.is_fatal(), "a bad query should not end the session");

    pool.close().await;
}

#[tokio::test]
async fn test_schema_snapshot_lists_tables_and_columns() {
    let (pool, _path) = setup_db().await;

    let snapshot = SchemaInspector::snapshot(&pool, 25, 400).await.unwrap();

    let table_names: Vec<&str> = snapshot.tables.iter().map(|t| t.name.as_str()).collect();
    assert!(table_names.contains(&"customers"));
    assert!(table_names.contains(&"orders"));
    assert!(!snapshot.tables_truncated);
    assert!(!snapshot.columns_truncated);

    let context = snapshot.context();
    assert!(context.contains("TABLES:"));
    assert!(context.contains("- customers"));
    assert!(context.contains("COLUMNS:"));
    assert!(context.contains("customers.spend"));

    pool.close().await;
}

#[tokio::test]
async fn test_schema_snapshot_caps_apply() {
    let (pool, _path) = setup_db().await;

    // Two tables seeded; capping at one must set the truncation flag
    let snapshot = SchemaInspector::snapshot(&pool, 1, 400).await.unwrap();
    assert_eq!(snapshot.tables.len(), 1);
    assert!(snapshot.tables_truncated);

    let snapshot = SchemaInspector::snapshot(&pool, 25, 2).await.unwrap();
    assert_eq!(snapshot.columns.len(), 2);
    assert!(snapshot.columns_truncated);

    pool.close().await;
}
