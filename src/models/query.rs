//! Query-related data models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// A validated SQL query ready for execution.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// The SQL statement. Must already have passed read-only validation.
    pub sql: String,
    /// Maximum rows to return. None uses the executor default.
    pub limit: Option<u32>,
    /// Query timeout in seconds. None uses the executor default.
    pub timeout_secs: Option<u64>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            limit: None,
            timeout_secs: None,
        }
    }
}

/// Result of a query execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in select order.
    pub columns: Vec<String>,
    /// Result rows as JSON objects keyed by column name.
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// Execution time in milliseconds.
    pub execution_time_ms: u64,
    /// True if the result set was cut off at the row limit.
    pub truncated: bool,
}

impl QueryResult {
    /// Number of rows returned (after truncation).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// A sample of at most `n` rows, used when asking the model to
    /// summarize results. Never hands the full result set to the LLM.
    pub fn sample_rows(&self, n: usize) -> &[serde_json::Map<String, JsonValue>] {
        &self.rows[..self.rows.len().min(n)]
    }
}
