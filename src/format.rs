//! Output formatting for query results.

use crate::models::QueryResult;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ASCII table format (like the MySQL CLI)
    #[default]
    Table,
    /// JSON format
    Json,
    /// Markdown table format
    Markdown,
}

impl OutputFormat {
    /// Parse a format name, used by the `\format` REPL command.
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "table" => Some(Self::Table),
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

/// Render a query result in the requested format.
pub fn render_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_as_table(result),
        OutputFormat::Json => format_as_json(result),
        OutputFormat::Markdown => format_as_markdown(result),
    }
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

fn format_as_json(result: &QueryResult) -> String {
    serde_json::to_string_pretty(&result.rows).unwrap_or_else(|_| "[]".to_string())
}

fn format_as_table(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.width()).collect();
    for row in &result.rows {
        for (i, col) in result.columns.iter().enumerate() {
            if let Some(value) = row.get(col) {
                let val_width = format_value(value).width();
                widths[i] = widths[i].max(val_width);
            }
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("| {:^width$} ", col, width = w))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in &result.rows {
        let row_str: String = result
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| {
                let value = row.get(col).cloned().unwrap_or(JsonValue::Null);
                let formatted = format_value(&value);
                if matches!(value, JsonValue::Number(_)) {
                    format!("| {:>width$} ", formatted, width = w)
                } else {
                    format!("| {:<width$} ", formatted, width = w)
                }
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_count = result.row_count();
    let row_text = if row_count == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "{} {} in set ({:.2} sec)\n",
        row_count,
        row_text,
        result.execution_time_ms as f64 / 1000.0
    ));

    output
}

fn format_as_markdown(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();

    let header: String = result
        .columns
        .iter()
        .map(|c| format!("| {} ", c))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = result.columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in &result.rows {
        let row_str: String = result
            .columns
            .iter()
            .map(|col| {
                let value = row.get(col).cloned().unwrap_or(JsonValue::Null);
                format!("| {} ", format_value(&value))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&format!("\n*{} rows*", result.row_count()));

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> QueryResult {
        let mut row1 = serde_json::Map::new();
        row1.insert("id".to_string(), JsonValue::from(1));
        row1.insert("name".to_string(), JsonValue::from("alice"));
        let mut row2 = serde_json::Map::new();
        row2.insert("id".to_string(), JsonValue::from(2));
        row2.insert("name".to_string(), JsonValue::Null);

        QueryResult {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![row1, row2],
            execution_time_ms: 12,
            truncated: false,
        }
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&JsonValue::Null), "NULL");
        assert_eq!(format_value(&JsonValue::from(42)), "42");
        assert_eq!(format_value(&JsonValue::from("x")), "x");
    }

    #[test]
    fn test_table_contains_headers_and_values() {
        let output = render_result(&sample_result(), OutputFormat::Table);
        assert!(output.contains("id"));
        assert!(output.contains("alice"));
        assert!(output.contains("NULL"));
        assert!(output.contains("2 rows in set"));
    }

    #[test]
    fn test_table_empty_set() {
        let result = QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms: 0,
            truncated: false,
        };
        assert_eq!(render_result(&result, OutputFormat::Table), "Empty set");
    }

    #[test]
    fn test_markdown_shape() {
        let output = render_result(&sample_result(), OutputFormat::Markdown);
        assert!(output.starts_with("| id | name |"));
        assert!(output.contains("|---|---|"));
        assert!(output.ends_with("*2 rows*"));
    }

    #[test]
    fn test_json_round_trips() {
        let output = render_result(&sample_result(), OutputFormat::Json);
        let parsed: Vec<serde_json::Map<String, JsonValue>> =
            serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["name"], JsonValue::from("alice"));
    }

    #[test]
    fn test_parse_name() {
        assert!(matches!(
            OutputFormat::parse_name("markdown"),
            Some(OutputFormat::Markdown)
        ));
        assert!(matches!(
            OutputFormat::parse_name("MD"),
            Some(OutputFormat::Markdown)
        ));
        assert!(OutputFormat::parse_name("yaml").is_none());
    }
}
