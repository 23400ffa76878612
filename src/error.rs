//! Error types for askdb.
//!
//! All errors are defined with `thiserror`. Each variant carries an
//! actionable message so the interactive loop can print something the
//! user can act on instead of a bare driver error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("LLM error: {message}")]
    Llm { message: String, suggestion: String },

    #[error("Rejected SQL: {operation} - {reason}")]
    SqlRejected { operation: String, reason: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an LLM error with a helpful suggestion.
    pub fn llm(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a rejected-SQL error naming the blocked operation.
    pub fn sql_rejected(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SqlRejected {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::Llm { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error should end the session rather than the current question.
    ///
    /// Connection loss is fatal; everything else (bad SQL from the model,
    /// a query error, a timeout) only aborts the question being asked.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convert sqlx errors to AppError.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => AppError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                AppError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => AppError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => AppError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                AppError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => AppError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => AppError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => AppError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => AppError::database(
                format!("Column not found: {}", col),
                None,
                "The generated query references a column that does not exist",
            ),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => AppError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                AppError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => AppError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => AppError::internal("Database worker crashed"),
            _ => AppError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Convert reqwest errors to AppError.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::llm(
                "Request to the model API timed out",
                "Increase --llm-timeout or check network connectivity",
            )
        } else if err.is_connect() {
            AppError::llm(
                format!("Could not reach the model API: {}", err),
                "Check OPENAI_BASE_URL and network connectivity",
            )
        } else if err.is_status() {
            let status = err
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            AppError::llm(
                format!("Model API returned HTTP {}", status),
                "Verify OPENAI_API_KEY and OPENAI_MODEL are valid",
            )
        } else if err.is_decode() {
            AppError::llm(
                format!("Malformed response from the model API: {}", err),
                "The endpoint may not be OpenAI-compatible; check OPENAI_BASE_URL",
            )
        } else {
            AppError::llm(
                format!("Model API request failed: {}", err),
                "Check network connectivity and API configuration",
            )
        }
    }
}

/// Result type alias for askdb operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = AppError::database("Syntax error", Some("42601".to_string()), "Check SQL syntax");
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
    }

    #[test]
    fn test_llm_error_suggestion() {
        let err = AppError::llm("empty response", "retry the question");
        assert_eq!(err.suggestion(), Some("retry the question"));
    }

    #[test]
    fn test_sql_rejected_names_operation() {
        let err = AppError::sql_rejected("INSERT", "write operations are not allowed");
        let msg = err.to_string();
        assert!(msg.contains("INSERT"));
        assert!(msg.contains("not allowed"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(AppError::connection("gone", "reconnect").is_fatal());
        assert!(!AppError::timeout("query", 30).is_fatal());
        assert!(!AppError::sql_rejected("DROP", "blocked").is_fatal());
        assert!(!AppError::llm("bad output", "ask again").is_fatal());
    }
}
