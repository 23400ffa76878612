//! Schema snapshot models.
//!
//! The snapshot is taken once at startup and rendered into a compact text
//! block that rides along with every question sent to the model.

use serde::{Deserialize, Serialize};

/// A table discovered during schema introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    /// Schema the table lives in ("public", "main", ...). None for SQLite.
    pub schema: Option<String>,
    pub name: String,
}

impl TableInfo {
    /// Qualified name as shown to the model.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.name),
            None => self.name.clone(),
        }
    }
}

/// A column discovered during schema introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub table_schema: Option<String>,
    pub table_name: String,
    pub name: String,
    pub data_type: String,
}

impl ColumnInfo {
    pub fn qualified_name(&self) -> String {
        match &self.table_schema {
            Some(s) => format!("{}.{}.{}", s, self.table_name, self.name),
            None => format!("{}.{}", self.table_name, self.name),
        }
    }
}

/// Point-in-time view of the database schema, capped in size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableInfo>,
    pub columns: Vec<ColumnInfo>,
    /// True when the table list was cut off at the configured cap.
    pub tables_truncated: bool,
    /// True when the column list was cut off at the configured cap.
    pub columns_truncated: bool,
}

impl SchemaSnapshot {
    /// Render the compact schema summary sent to the LLM.
    ///
    /// Lists qualified table names, then qualified column names with their
    /// data types. Empty sections get a "(none found)" placeholder so the
    /// model does not hallucinate tables into an empty database.
    pub fn context(&self) -> String {
        let mut lines = Vec::with_capacity(self.tables.len() + self.columns.len() + 4);

        lines.push("TABLES:".to_string());
        if self.tables.is_empty() {
            lines.push("- (none found)".to_string());
        } else {
            for table in &self.tables {
                lines.push(format!("- {}", table.qualified_name()));
            }
        }

        lines.push(String::new());
        lines.push("COLUMNS:".to_string());
        if self.columns.is_empty() {
            lines.push("- (none found)".to_string());
        } else {
            for col in &self.columns {
                lines.push(format!("- {} ({})", col.qualified_name(), col.data_type));
            }
        }

        lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
