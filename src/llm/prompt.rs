//! Prompt construction for SQL generation and result explanation.

use crate::models::{DatabaseType, QueryResult};

/// How many result rows are shown to the model when explaining results.
pub const EXPLAIN_SAMPLE_ROWS: usize = 10;

/// System prompt for SQL generation.
///
/// The model is told to return bare SQL with a row limit; both constraints
/// are enforced again downstream (guard validation, executor row cap), so
/// a disobedient model degrades the experience but never the safety.
pub fn sql_system_prompt(db_type: DatabaseType, row_limit: u32) -> String {
    format!(
        "You are a {dialect} assistant. Return exactly one read-only SQL query. \
         Output SQL text only, no markdown and no explanation. \
         Rules: only SELECT statements (CTEs allowed), include LIMIT {limit} \
         unless the user asks for fewer rows.",
        dialect = db_type.dialect_name(),
        limit = row_limit
    )
}

/// User prompt for SQL generation.
pub fn sql_user_prompt(question: &str, schema_context: &str, db_type: DatabaseType) -> String {
    format!(
        "Question:\n{question}\n\n\
         Schema context:\n{schema_context}\n\n\
         Return one {dialect} query now.",
        dialect = db_type.dialect_name()
    )
}

/// System prompt for result explanation.
pub fn explain_system_prompt() -> &'static str {
    "You explain SQL query results clearly for a beginner. \
     Be concise and mention if results are truncated."
}

/// User prompt for result explanation. Sends at most
/// [`EXPLAIN_SAMPLE_ROWS`] rows, never the full result set.
pub fn explain_user_prompt(question: &str, sql: &str, result: &QueryResult) -> String {
    let sample = result.sample_rows(EXPLAIN_SAMPLE_ROWS);
    let sample_json =
        serde_json::to_string(sample).unwrap_or_else(|_| "[unrenderable rows]".to_string());

    let mut prompt = format!(
        "Original question: {question}\n\
         SQL used: {sql}\n\
         Sample rows (max {EXPLAIN_SAMPLE_ROWS}): {sample_json}\n\
         Total rows returned: {count}",
        count = result.row_count()
    );
    if result.truncated {
        prompt.push_str("\nNote: the result set was truncated at the row limit.");
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;

    fn result_with_rows(n: usize, truncated: bool) -> QueryResult {
        let rows = (0..n)
            .map(|i| {
                let mut m = serde_json::Map::new();
                m.insert("id".to_string(), JsonValue::from(i as i64));
                m
            })
            .collect();
        QueryResult {
            columns: vec!["id".to_string()],
            rows,
            execution_time_ms: 1,
            truncated,
        }
    }

    #[test]
    fn test_sql_system_prompt_names_dialect_and_limit() {
        let prompt = sql_system_prompt(DatabaseType::SQLite, 100);
        assert!(prompt.contains("SQLite"));
        assert!(prompt.contains("LIMIT 100"));
        assert!(prompt.contains("read-only"));
    }

    #[test]
    fn test_sql_user_prompt_carries_question_and_schema() {
        let prompt = sql_user_prompt(
            "how many users signed up this year?",
            "TABLES:\n- users",
            DatabaseType::PostgreSQL,
        );
        assert!(prompt.contains("how many users signed up this year?"));
        assert!(prompt.contains("TABLES:\n- users"));
        assert!(prompt.contains("PostgreSQL query"));
    }

    #[test]
    fn test_explain_prompt_samples_ten_rows() {
        let result = result_with_rows(50, false);
        let prompt = explain_user_prompt("q", "SELECT 1", &result);
        assert!(prompt.contains("Total rows returned: 50"));
        // Ten sample rows: ids 0..=9 present, 10 absent
        assert!(prompt.contains("{\"id\":9}"));
        assert!(!prompt.contains("{\"id\":10}"));
    }

    #[test]
    fn test_explain_prompt_mentions_truncation() {
        let result = result_with_rows(5, true);
        let prompt = explain_user_prompt("q", "SELECT 1", &result);
        assert!(prompt.contains("truncated"));

        let result = result_with_rows(5, false);
        let prompt = explain_user_prompt("q", "SELECT 1", &result);
        assert!(!prompt.contains("truncated at the row limit"));
    }
}
