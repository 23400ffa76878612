//! Query execution engine.
//!
//! Executes validated read-only queries with a hard row cap and a timeout.
//! The cap is enforced by streaming: the executor fetches at most
//! `limit + 1` rows, so an unbounded SELECT never pulls a full table into
//! memory, and the extra row tells us the result was truncated.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{AppError, AppResult};
use crate::models::{
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryRequest, QueryResult,
};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
pub struct QueryExecutor {
    default_timeout: Duration,
    default_limit: u32,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            default_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Create a new query executor with custom settings.
    pub fn with_defaults(timeout_secs: u64, row_limit: u32) -> Self {
        Self {
            default_timeout: Duration::from_secs(timeout_secs),
            default_limit: row_limit.min(MAX_ROW_LIMIT),
        }
    }

    /// Execute a SELECT query and return results.
    ///
    /// The caller is responsible for validating the SQL first; this layer
    /// only enforces the row cap and the timeout.
    pub async fn execute_query(
        &self,
        pool: &DbPool,
        request: &QueryRequest,
    ) -> AppResult<QueryResult> {
        let start = Instant::now();
        // Clamp limit to [1, MAX_ROW_LIMIT] so limit=0 cannot mark every result as truncated
        let row_limit = request
            .limit
            .map(|l| l.clamp(1, MAX_ROW_LIMIT))
            .unwrap_or(self.default_limit);
        let query_timeout = request
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        debug!(
            sql = %request.sql,
            limit = row_limit,
            timeout_secs = query_timeout.as_secs(),
            "Executing query"
        );

        match pool {
            DbPool::MySql(p) => {
                let rows = fetch::mysql(p, &request.sql, row_limit, query_timeout).await?;
                process_rows(rows, row_limit, start)
            }
            DbPool::Postgres(p) => {
                let rows = fetch::postgres(p, &request.sql, row_limit, query_timeout).await?;
                process_rows(rows, row_limit, start)
            }
            DbPool::SQLite(p) => {
                let rows = fetch::sqlite(p, &request.sql, row_limit, query_timeout).await?;
                process_rows(rows, row_limit, start)
            }
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Process rows from any database type into a QueryResult.
fn process_rows<R: RowToJson>(
    rows: Vec<R>,
    row_limit: u32,
    start: Instant,
) -> AppResult<QueryResult> {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    if rows.is_empty() {
        return Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms,
            truncated: false,
        });
    }

    let columns = rows[0].column_names();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;
    let rows_to_take = (row_limit as usize).min(total_rows);

    let json_rows: Vec<serde_json::Map<String, serde_json::Value>> = rows
        .iter()
        .take(rows_to_take)
        .map(|r| r.to_json_map())
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    Ok(QueryResult {
        columns,
        rows: json_rows,
        execution_time_ms,
        truncated,
    })
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> AppResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(AppError::from)?);
    }
    Ok(rows)
}

fn timeout_error(query_timeout: Duration) -> AppError {
    AppError::timeout("query execution", query_timeout.as_secs() as u32)
}

// =============================================================================
// Database-Specific Fetch
// =============================================================================
//
// Queries run unprepared; the SQL comes from a model, never with bound
// parameters, and unprepared execution avoids prepared-statement quirks.

mod fetch {
    use super::*;
    use sqlx::Executor;
    use sqlx::mysql::MySqlRow;
    use sqlx::postgres::PgRow;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{MySqlPool, PgPool, SqlitePool};

    pub async fn mysql(
        pool: &MySqlPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> AppResult<Vec<MySqlRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();
        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error(query_timeout)),
        }
    }

    pub async fn postgres(
        pool: &PgPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> AppResult<Vec<PgRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();
        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error(query_timeout)),
        }
    }

    pub async fn sqlite(
        pool: &SqlitePool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> AppResult<Vec<SqliteRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();
        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error(query_timeout)),
        }
    }
}
