//! Schema introspection.
//!
//! Builds the capped [`SchemaSnapshot`] that is rendered into the prompt
//! context. The caps exist to keep the prompt affordable on wide
//! databases; one extra row is fetched past each cap to detect truncation.
//!
//! SQL queries are organized in the `queries` submodule with constants for
//! each database type, mirroring the per-database structure used elsewhere
//! in the db layer.

use crate::db::pool::DbPool;
use crate::error::AppResult;
use crate::models::{ColumnInfo, SchemaSnapshot, TableInfo};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Take a snapshot of the schema, capped at `table_cap` tables and
    /// `column_cap` columns.
    pub async fn snapshot(
        pool: &DbPool,
        table_cap: u32,
        column_cap: u32,
    ) -> AppResult<SchemaSnapshot> {
        let snapshot = match pool {
            DbPool::Postgres(p) => postgres::snapshot(p, table_cap, column_cap).await?,
            DbPool::MySql(p) => mysql::snapshot(p, table_cap, column_cap).await?,
            DbPool::SQLite(p) => sqlite::snapshot(p, table_cap, column_cap).await?,
        };

        debug!(
            tables = snapshot.tables.len(),
            columns = snapshot.columns.len(),
            tables_truncated = snapshot.tables_truncated,
            columns_truncated = snapshot.columns_truncated,
            "Schema snapshot taken"
        );

        Ok(snapshot)
    }
}

/// Cut a list at `cap` elements, reporting whether anything was dropped.
fn apply_cap<T>(mut items: Vec<T>, cap: u32) -> (Vec<T>, bool) {
    let truncated = items.len() > cap as usize;
    items.truncate(cap as usize);
    (items, truncated)
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_schema, table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
              AND table_schema NOT IN ('pg_catalog', 'information_schema')
            ORDER BY table_schema, table_name
            LIMIT $1
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT table_schema, table_name, column_name, data_type
            FROM information_schema.columns
            WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
            ORDER BY table_schema, table_name, ordinal_position
            LIMIT $1
            "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT table_schema, table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
              AND table_schema = DATABASE()
            ORDER BY table_name
            LIMIT ?
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT table_schema, table_name, column_name, data_type
            FROM information_schema.columns
            WHERE table_schema = DATABASE()
            ORDER BY table_name, ordinal_position
            LIMIT ?
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            LIMIT ?
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT name, type
            FROM pragma_table_info(?)
            ORDER BY cid
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::PgPool;

    pub async fn snapshot(
        pool: &PgPool,
        table_cap: u32,
        column_cap: u32,
    ) -> AppResult<SchemaSnapshot> {
        let table_rows: Vec<(String, String)> = sqlx::query_as(queries::postgres::LIST_TABLES)
            .bind(table_cap as i64 + 1)
            .fetch_all(pool)
            .await?;
        let (table_rows, tables_truncated) = apply_cap(table_rows, table_cap);
        let tables = table_rows
            .into_iter()
            .map(|(schema, name)| TableInfo {
                schema: Some(schema),
                name,
            })
            .collect();

        let column_rows: Vec<(String, String, String, String)> =
            sqlx::query_as(queries::postgres::LIST_COLUMNS)
                .bind(column_cap as i64 + 1)
                .fetch_all(pool)
                .await?;
        let (column_rows, columns_truncated) = apply_cap(column_rows, column_cap);
        let columns = column_rows
            .into_iter()
            .map(|(table_schema, table_name, name, data_type)| ColumnInfo {
                table_schema: Some(table_schema),
                table_name,
                name,
                data_type,
            })
            .collect();

        Ok(SchemaSnapshot {
            tables,
            columns,
            tables_truncated,
            columns_truncated,
        })
    }
}

mod mysql {
    use super::*;
    use sqlx::MySqlPool;

    pub async fn snapshot(
        pool: &MySqlPool,
        table_cap: u32,
        column_cap: u32,
    ) -> AppResult<SchemaSnapshot> {
        let table_rows: Vec<(String, String)> = sqlx::query_as(queries::mysql::LIST_TABLES)
            .bind(table_cap as i64 + 1)
            .fetch_all(pool)
            .await?;
        let (table_rows, tables_truncated) = apply_cap(table_rows, table_cap);
        let tables = table_rows
            .into_iter()
            .map(|(schema, name)| TableInfo {
                schema: Some(schema),
                name,
            })
            .collect();

        let column_rows: Vec<(String, String, String, String)> =
            sqlx::query_as(queries::mysql::LIST_COLUMNS)
                .bind(column_cap as i64 + 1)
                .fetch_all(pool)
                .await?;
        let (column_rows, columns_truncated) = apply_cap(column_rows, column_cap);
        let columns = column_rows
            .into_iter()
            .map(|(table_schema, table_name, name, data_type)| ColumnInfo {
                table_schema: Some(table_schema),
                table_name,
                name,
                data_type,
            })
            .collect();

        Ok(SchemaSnapshot {
            tables,
            columns,
            tables_truncated,
            columns_truncated,
        })
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;

    pub async fn snapshot(
        pool: &SqlitePool,
        table_cap: u32,
        column_cap: u32,
    ) -> AppResult<SchemaSnapshot> {
        let table_rows: Vec<(String,)> = sqlx::query_as(queries::sqlite::LIST_TABLES)
            .bind(table_cap as i64 + 1)
            .fetch_all(pool)
            .await?;
        let (table_rows, tables_truncated) = apply_cap(table_rows, table_cap);
        let tables: Vec<TableInfo> = table_rows
            .into_iter()
            .map(|(name,)| TableInfo { schema: None, name })
            .collect();

        // SQLite has no information_schema; walk the (already capped) table
        // list and collect columns until the column cap is hit.
        let mut columns = Vec::new();
        let mut columns_truncated = false;
        'outer: for table in &tables {
            let column_rows: Vec<(String, String)> = sqlx::query_as(queries::sqlite::LIST_COLUMNS)
                .bind(&table.name)
                .fetch_all(pool)
                .await?;
            for (name, data_type) in column_rows {
                if columns.len() >= column_cap as usize {
                    columns_truncated = true;
                    break 'outer;
                }
                columns.push(ColumnInfo {
                    table_schema: None,
                    table_name: table.name.clone(),
                    name,
                    data_type,
                });
            }
        }

        Ok(SchemaSnapshot {
            tables,
            columns,
            tables_truncated,
            columns_truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_cap_under_limit() {
        let (items, truncated) = apply_cap(vec![1, 2, 3], 5);
        assert_eq!(items, vec![1, 2, 3]);
        assert!(!truncated);
    }

    #[test]
    fn test_apply_cap_at_limit() {
        let (items, truncated) = apply_cap(vec![1, 2, 3], 3);
        assert_eq!(items, vec![1, 2, 3]);
        assert!(!truncated);
    }

    #[test]
    fn test_apply_cap_over_limit() {
        let (items, truncated) = apply_cap(vec![1, 2, 3, 4], 3);
        assert_eq!(items, vec![1, 2, 3]);
        assert!(truncated);
    }
}
