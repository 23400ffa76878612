//! Chat-completions client for OpenAI-compatible endpoints.

use crate::error::{AppError, AppResult};
use crate::llm::prompt;
use crate::models::{DatabaseType, QueryResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for the model API.
#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    /// Create a new client.
    ///
    /// Fails fast when no API key is configured, so the user learns about
    /// it at startup rather than on the first question.
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            AppError::llm(
                "OPENAI_API_KEY is not set",
                "Add it to your .env file or pass --api-key",
            )
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    /// Ask the model to generate SQL for a question. Returns the raw
    /// completion; the caller runs it through the guard before execution.
    pub async fn generate_sql(
        &self,
        question: &str,
        schema_context: &str,
        db_type: DatabaseType,
        row_limit: u32,
    ) -> AppResult<String> {
        let system = prompt::sql_system_prompt(db_type, row_limit);
        let user = prompt::sql_user_prompt(question, schema_context, db_type);
        self.chat(&system, &user).await
    }

    /// Ask the model to summarize query results for the user.
    pub async fn explain_results(
        &self,
        question: &str,
        sql: &str,
        result: &QueryResult,
    ) -> AppResult<String> {
        let system = prompt::explain_system_prompt();
        let user = prompt::explain_user_prompt(question, sql, result);
        self.chat(system, &user).await
    }

    async fn chat(&self, system: &str, user: &str) -> AppResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        debug!(model = %self.model, "Sending chat completion request");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = extract_error_message(&body).unwrap_or(body);
            return Err(AppError::llm(
                format!("Model API returned HTTP {}: {}", status, truncate(&detail, 300)),
                "Verify OPENAI_API_KEY and OPENAI_MODEL are valid",
            ));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        content.ok_or_else(|| {
            AppError::llm(
                "Model returned an empty response",
                "Try rephrasing the question",
            )
        })
    }
}

/// Pull the human-readable message out of an OpenAI-style error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(String::from)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
