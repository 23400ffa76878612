//! Read-only enforcement for model-generated SQL.
//!
//! Nothing the model produces reaches the database without passing through
//! [`validate_generated`]: the raw completion is stripped of markdown
//! wrapping, parsed with [sqlparser](https://docs.rs/sqlparser/), and
//! rejected unless it is exactly one read-only statement. Parsing the AST
//! means write operations cannot slip through on formatting tricks,
//! comments, or dialect quirks the way they can with keyword denylists.

use crate::error::{AppError, AppResult};
use crate::models::DatabaseType;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

/// Type of SQL statement detected by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlStatementType {
    /// SELECT and other read-only queries (SELECT, SHOW, EXPLAIN over a query)
    Select,
    /// INSERT, UPDATE, DELETE, MERGE, COPY
    DmlWrite,
    /// CREATE, DROP, ALTER, TRUNCATE
    Ddl,
    /// BEGIN, COMMIT, ROLLBACK, SAVEPOINT
    Transaction,
    /// CALL, EXECUTE, PREPARE (stored procedures)
    ProcedureCall,
    /// GRANT, REVOKE, SET, PRAGMA, VACUUM, ATTACH, ...
    Administrative,
    /// Unknown or unparseable statement
    Unknown,
}

mod error_messages {
    pub const DML_WRITE: &str = "Write operations are not allowed. This tool runs read-only queries only.";
    pub const DDL: &str = "Schema modifications are not allowed. This tool runs read-only queries only.";
    pub const TRANSACTION: &str = "Transaction control statements are not allowed.";
    pub const PROCEDURE: &str = "Procedure calls are not allowed; their side effects cannot be verified.";
    pub const ADMINISTRATIVE: &str = "Administrative statements are not allowed.";
    pub const UNKNOWN: &str = "Unrecognized SQL statement. Only SELECT queries are allowed.";
    pub const PARSE_ERROR: &str = "Failed to parse generated SQL.";
    pub const MULTIPLE: &str = "Multiple SQL statements are not allowed; expected exactly one query.";
    pub const EMPTY: &str = "Model returned empty SQL.";
}

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Strip the markdown wrapping models like to add around SQL.
///
/// Handles fenced blocks (with or without a language tag), stray backticks,
/// and a trailing semicolon. Returns an error for empty output.
pub fn sanitize_candidate(raw: &str) -> AppResult<String> {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag line if present ("```sql\n...")
        let rest = match rest.split_once('\n') {
            Some((_tag, body)) => body,
            None => rest,
        };
        text = rest.strip_suffix("```").unwrap_or(rest);
    }

    let cleaned = text.trim_matches('`').trim().trim_end_matches(';').trim();

    if cleaned.is_empty() {
        return Err(AppError::llm(
            error_messages::EMPTY,
            "Try rephrasing the question",
        ));
    }

    Ok(cleaned.to_string())
}

/// Sanitize a raw model completion and validate it as a single read-only
/// statement. Returns the cleaned SQL ready for execution.
pub fn validate_generated(raw: &str, db_type: DatabaseType) -> AppResult<String> {
    let sql = sanitize_candidate(raw)?;
    validate_readonly(&sql, db_type)?;
    Ok(sql)
}

/// Validate SQL for read-only execution.
///
/// Returns `Ok(())` if the input is exactly one allowed statement (SELECT,
/// including CTEs, or EXPLAIN over one), or `Err(AppError::SqlRejected)`
/// naming the blocked operation otherwise.
///
/// # Examples
///
/// ```
/// use askdb::guard::validate_readonly;
/// use askdb::models::DatabaseType;
///
/// assert!(validate_readonly("SELECT * FROM users", DatabaseType::PostgreSQL).is_ok());
/// assert!(validate_readonly("INSERT INTO users VALUES (1)", DatabaseType::PostgreSQL).is_err());
/// ```
pub fn validate_readonly(sql: &str, db_type: DatabaseType) -> AppResult<()> {
    let dialect = get_dialect(db_type);

    let statements = Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| {
        AppError::invalid_input(format!("{} Error: {}", error_messages::PARSE_ERROR, e))
    })?;

    match statements.as_slice() {
        [] => Err(AppError::invalid_input("Empty SQL statement")),
        [stmt] => validate_statement(stmt),
        _ => Err(AppError::invalid_input(error_messages::MULTIPLE)),
    }
}

/// Validate a single parsed statement.
fn validate_statement(stmt: &Statement) -> AppResult<()> {
    let (stmt_type, operation_name) = classify_statement(stmt);

    match stmt_type {
        SqlStatementType::Select => Ok(()),
        SqlStatementType::DmlWrite => Err(AppError::sql_rejected(
            operation_name,
            error_messages::DML_WRITE,
        )),
        SqlStatementType::Ddl => Err(AppError::sql_rejected(operation_name, error_messages::DDL)),
        SqlStatementType::Transaction => Err(AppError::sql_rejected(
            operation_name,
            error_messages::TRANSACTION,
        )),
        SqlStatementType::ProcedureCall => Err(AppError::sql_rejected(
            operation_name,
            error_messages::PROCEDURE,
        )),
        SqlStatementType::Administrative => Err(AppError::sql_rejected(
            operation_name,
            error_messages::ADMINISTRATIVE,
        )),
        SqlStatementType::Unknown => Err(AppError::sql_rejected(
            operation_name,
            error_messages::UNKNOWN,
        )),
    }
}

/// Classify a parsed statement into a statement type.
pub fn classify_statement(stmt: &Statement) -> (SqlStatementType, &'static str) {
    match stmt {
        // Read-only operations - ALLOWED
        Statement::Query(_) => (SqlStatementType::Select, "SELECT"),
        Statement::ShowTables { .. } => (SqlStatementType::Select, "SHOW TABLES"),
        Statement::ShowColumns { .. } => (SqlStatementType::Select, "SHOW COLUMNS"),
        Statement::ShowDatabases { .. } => (SqlStatementType::Select, "SHOW DATABASES"),
        Statement::ShowSchemas { .. } => (SqlStatementType::Select, "SHOW SCHEMAS"),
        Statement::ShowCreate { .. } => (SqlStatementType::Select, "SHOW CREATE"),
        Statement::ShowVariable { .. } => (SqlStatementType::Select, "SHOW VARIABLE"),
        Statement::ShowVariables { .. } => (SqlStatementType::Select, "SHOW VARIABLES"),
        Statement::ExplainTable { .. } => (SqlStatementType::Select, "EXPLAIN TABLE"),

        // EXPLAIN needs special handling - check underlying statement
        Statement::Explain { statement, .. } => {
            let (inner_type, inner_name) = classify_statement(statement);
            if inner_type == SqlStatementType::Select {
                (SqlStatementType::Select, "EXPLAIN")
            } else {
                // EXPLAIN on write operation - block it
                (inner_type, inner_name)
            }
        }

        // DML Write operations - BLOCKED
        Statement::Insert(_) => (SqlStatementType::DmlWrite, "INSERT"),
        Statement::Update { .. } => (SqlStatementType::DmlWrite, "UPDATE"),
        Statement::Delete(_) => (SqlStatementType::DmlWrite, "DELETE"),
        Statement::Merge { .. } => (SqlStatementType::DmlWrite, "MERGE"),
        Statement::Copy { .. } => (SqlStatementType::DmlWrite, "COPY"),

        // DDL operations - BLOCKED
        Statement::CreateTable { .. } => (SqlStatementType::Ddl, "CREATE TABLE"),
        Statement::CreateView { .. } => (SqlStatementType::Ddl, "CREATE VIEW"),
        Statement::CreateIndex(_) => (SqlStatementType::Ddl, "CREATE INDEX"),
        Statement::CreateSchema { .. } => (SqlStatementType::Ddl, "CREATE SCHEMA"),
        Statement::CreateDatabase { .. } => (SqlStatementType::Ddl, "CREATE DATABASE"),
        Statement::CreateSequence { .. } => (SqlStatementType::Ddl, "CREATE SEQUENCE"),
        Statement::CreateFunction { .. } => (SqlStatementType::Ddl, "CREATE FUNCTION"),
        Statement::CreateProcedure { .. } => (SqlStatementType::Ddl, "CREATE PROCEDURE"),
        Statement::CreateTrigger { .. } => (SqlStatementType::Ddl, "CREATE TRIGGER"),
        Statement::CreateVirtualTable { .. } => (SqlStatementType::Ddl, "CREATE VIRTUAL TABLE"),
        Statement::AlterTable { .. } => (SqlStatementType::Ddl, "ALTER TABLE"),
        Statement::AlterView { .. } => (SqlStatementType::Ddl, "ALTER VIEW"),
        Statement::AlterIndex { .. } => (SqlStatementType::Ddl, "ALTER INDEX"),
        Statement::Drop { .. } => (SqlStatementType::Ddl, "DROP"),
        Statement::DropFunction { .. } => (SqlStatementType::Ddl, "DROP FUNCTION"),
        Statement::DropProcedure { .. } => (SqlStatementType::Ddl, "DROP PROCEDURE"),
        Statement::DropTrigger { .. } => (SqlStatementType::Ddl, "DROP TRIGGER"),
        Statement::Truncate { .. } => (SqlStatementType::Ddl, "TRUNCATE"),
        Statement::Comment { .. } => (SqlStatementType::Ddl, "COMMENT"),

        // Transaction control - BLOCKED
        Statement::StartTransaction { .. } => (SqlStatementType::Transaction, "BEGIN"),
        Statement::Commit { .. } => (SqlStatementType::Transaction, "COMMIT"),
        Statement::Rollback { .. } => (SqlStatementType::Transaction, "ROLLBACK"),
        Statement::Savepoint { .. } => (SqlStatementType::Transaction, "SAVEPOINT"),
        Statement::ReleaseSavepoint { .. } => (SqlStatementType::Transaction, "RELEASE SAVEPOINT"),

        // Procedure/Function calls - BLOCKED (cannot verify behavior)
        Statement::Call { .. } => (SqlStatementType::ProcedureCall, "CALL"),
        Statement::Execute { .. } => (SqlStatementType::ProcedureCall, "EXECUTE"),
        Statement::Prepare { .. } => (SqlStatementType::ProcedureCall, "PREPARE"),
        Statement::Deallocate { .. } => (SqlStatementType::ProcedureCall, "DEALLOCATE"),

        // Administrative operations - BLOCKED
        Statement::Grant { .. } => (SqlStatementType::Administrative, "GRANT"),
        Statement::Revoke { .. } => (SqlStatementType::Administrative, "REVOKE"),
        Statement::Set(_) => (SqlStatementType::Administrative, "SET"),
        Statement::Use(_) => (SqlStatementType::Administrative, "USE"),
        Statement::Kill { .. } => (SqlStatementType::Administrative, "KILL"),
        Statement::Vacuum { .. } => (SqlStatementType::Administrative, "VACUUM"),
        Statement::Analyze { .. } => (SqlStatementType::Administrative, "ANALYZE"),
        Statement::LockTables { .. } => (SqlStatementType::Administrative, "LOCK"),
        Statement::UnlockTables => (SqlStatementType::Administrative, "UNLOCK"),
        Statement::Flush { .. } => (SqlStatementType::Administrative, "FLUSH"),
        Statement::Pragma { .. } => (SqlStatementType::Administrative, "PRAGMA"),
        Statement::AttachDatabase { .. } => (SqlStatementType::Administrative, "ATTACH"),

        // Unknown/other statements - BLOCKED (conservative approach)
        _ => (SqlStatementType::Unknown, "Unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Use PostgreSQL as default test database type
    const TEST_DB_TYPE: DatabaseType = DatabaseType::PostgreSQL;

    // =========================================================================
    // Tests for sanitize_candidate
    // =========================================================================

    #[test]
    fn test_sanitize_plain_sql() {
        assert_eq!(
            sanitize_candidate("SELECT 1;").unwrap(),
            "SELECT 1".to_string()
        );
    }

    #[test]
    fn test_sanitize_fenced_block_with_tag() {
        let raw = "```sql\nSELECT id FROM users;\n```";
        assert_eq!(sanitize_candidate(raw).unwrap(), "SELECT id FROM users");
    }

    #[test]
    fn test_sanitize_fenced_block_without_tag() {
        let raw = "```\nSELECT 1\n```";
        assert_eq!(sanitize_candidate(raw).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_sanitize_stray_backticks() {
        assert_eq!(sanitize_candidate("`SELECT 1`").unwrap(), "SELECT 1");
    }

    #[test]
    fn test_sanitize_empty_is_llm_error() {
        let result = sanitize_candidate("   ");
        assert!(matches!(result.unwrap_err(), AppError::Llm { .. }));

        let result = sanitize_candidate("```sql\n```");
        assert!(result.is_err());
    }

    // =========================================================================
    // Tests for validate_readonly
    // =========================================================================

    #[test]
    fn test_validate_readonly_select_ok() {
        assert!(validate_readonly("SELECT * FROM users", TEST_DB_TYPE).is_ok());
    }

    #[test]
    fn test_validate_readonly_cte_ok() {
        let sql = "WITH recent AS (SELECT * FROM orders WHERE created_at > '2026-01-01') \
                   SELECT count(*) FROM recent";
        assert!(validate_readonly(sql, TEST_DB_TYPE).is_ok());
    }

    #[test]
    fn test_validate_readonly_insert_error() {
        let result = validate_readonly("INSERT INTO users VALUES (1)", TEST_DB_TYPE);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, AppError::SqlRejected { .. }));
    }

    #[test]
    fn test_validate_readonly_update_error() {
        assert!(validate_readonly("UPDATE users SET name = 'test'", TEST_DB_TYPE).is_err());
    }

    #[test]
    fn test_validate_readonly_create_error() {
        assert!(validate_readonly("CREATE TABLE test (id INT)", TEST_DB_TYPE).is_err());
    }

    #[test]
    fn test_validate_readonly_drop_error() {
        assert!(validate_readonly("DROP TABLE users", TEST_DB_TYPE).is_err());
    }

    #[test]
    fn test_error_names_blocked_operation() {
        let err = validate_readonly("TRUNCATE TABLE logs", TEST_DB_TYPE).unwrap_err();
        assert!(err.to_string().contains("TRUNCATE"));
    }

    // =========================================================================
    // Tests for complex SQL patterns (AST parsing handles correctly)
    // =========================================================================

    #[test]
    fn test_complex_select_with_subquery() {
        let sql = r#"
            SELECT u.name, (SELECT COUNT(*) FROM orders WHERE user_id = u.id) as order_count
            FROM users u
            WHERE u.id IN (SELECT user_id FROM active_users)
        "#;
        assert!(validate_readonly(sql, TEST_DB_TYPE).is_ok());
    }

    #[test]
    fn test_select_with_union() {
        let sql = "SELECT a FROM t1 UNION ALL SELECT b FROM t2";
        assert!(validate_readonly(sql, TEST_DB_TYPE).is_ok());
    }

    #[test]
    fn test_multiple_statements_blocked() {
        let sql = "SELECT 1; INSERT INTO users VALUES (1)";
        assert!(validate_readonly(sql, TEST_DB_TYPE).is_err());

        // Even two SELECTs: one question, one query
        let sql = "SELECT 1; SELECT 2";
        assert!(validate_readonly(sql, TEST_DB_TYPE).is_err());
    }

    #[test]
    fn test_insert_select_blocked() {
        // INSERT ... SELECT should be blocked even though it contains SELECT
        let sql = "INSERT INTO archive SELECT * FROM users WHERE created_at < '2020-01-01'";
        assert!(validate_readonly(sql, TEST_DB_TYPE).is_err());
    }

    #[test]
    fn test_explain_select_allowed() {
        assert!(validate_readonly("EXPLAIN SELECT * FROM users", TEST_DB_TYPE).is_ok());
    }

    #[test]
    fn test_explain_write_blocked() {
        assert!(validate_readonly("EXPLAIN DELETE FROM users", TEST_DB_TYPE).is_err());
    }

    #[test]
    fn test_pragma_blocked_sqlite() {
        assert!(validate_readonly("PRAGMA writable_schema = ON", DatabaseType::SQLite).is_err());
    }

    // =========================================================================
    // Tests for validate_generated (end-to-end sanitization + validation)
    // =========================================================================

    #[test]
    fn test_validate_generated_fenced_select() {
        let raw = "```sql\nSELECT name FROM users LIMIT 10;\n```";
        let sql = validate_generated(raw, TEST_DB_TYPE).unwrap();
        assert_eq!(sql, "SELECT name FROM users LIMIT 10");
    }

    #[test]
    fn test_validate_generated_fenced_write_still_blocked() {
        let raw = "```sql\nDELETE FROM users;\n```";
        assert!(validate_generated(raw, TEST_DB_TYPE).is_err());
    }

    #[test]
    fn test_validate_generated_garbage_is_invalid_input() {
        let result = validate_generated("sure, here is the query you asked for", TEST_DB_TYPE);
        assert!(matches!(result.unwrap_err(), AppError::InvalidInput { .. }));
    }
}
