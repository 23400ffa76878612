//! Interactive question/answer loop.
//!
//! One question at a time: generate SQL, validate it, run it, render the
//! rows, ask the model for a short explanation. Errors from the model or
//! the database abort the current question, not the session; losing the
//! database connection ends the session.

use crate::db::{DbPool, QueryExecutor};
use crate::error::{AppError, AppResult};
use crate::format::{OutputFormat, render_result};
use crate::guard;
use crate::llm::LlmClient;
use crate::models::{QueryRequest, SchemaSnapshot};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::info;

const SEPARATOR_WIDTH: usize = 60;

/// An interactive session against one database.
pub struct Session {
    pool: DbPool,
    executor: QueryExecutor,
    llm: LlmClient,
    snapshot: SchemaSnapshot,
    format: OutputFormat,
    row_limit: u32,
}

/// What a line of input turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    /// A question for the model.
    Ask(String),
    /// A backslash command with its argument.
    Command { name: String, arg: String },
    /// Blank input; read the next line.
    Skip,
    /// End the session.
    Quit,
}

/// Classify a line of input: quit words, blank lines, backslash commands,
/// or a question. Pure string handling, so the session state stays out of it.
fn classify_line(line: &str) -> Action {
    let line = line.trim();
    if line.is_empty() {
        return Action::Skip;
    }

    let lower = line.to_lowercase();
    if lower == "exit" || lower == "quit" {
        return Action::Quit;
    }

    if let Some(command) = line.strip_prefix('\\') {
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        return Action::Command {
            name: name.to_string(),
            arg: arg.to_string(),
        };
    }

    Action::Ask(line.to_string())
}

impl Session {
    pub fn new(
        pool: DbPool,
        executor: QueryExecutor,
        llm: LlmClient,
        snapshot: SchemaSnapshot,
        format: OutputFormat,
        row_limit: u32,
    ) -> Self {
        Self {
            pool,
            executor,
            llm,
            snapshot,
            format,
            row_limit,
        }
    }

    /// Run the loop until the user quits or a shutdown signal arrives.
    pub async fn run(&mut self) -> AppResult<()> {
        println!("Natural Language SQL Assistant ({})", self.pool.db_type());
        println!("Type 'exit' to quit, '\\help' for commands.\n");

        if self.snapshot.is_empty() {
            println!("Schema loaded, but no tables were found.");
        } else {
            println!("Schema loaded. You can now ask questions like:");
            println!("  - 'Show top 10 customers by total spend this year'\n");
        }

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print!("Question> ");
            std::io::stdout().flush().ok();

            let line = tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => line,
                    // EOF or a broken stdin both end the session
                    Ok(None) => break,
                    Err(e) => {
                        return Err(AppError::internal(format!("Failed to read input: {}", e)));
                    }
                },
                _ = wait_for_signal() => {
                    println!();
                    info!("Shutdown signal received");
                    break;
                }
            };

            match classify_line(&line) {
                Action::Quit => {
                    println!("Goodbye!");
                    break;
                }
                Action::Skip => continue,
                Action::Command { name, arg } => self.handle_command(&name, &arg),
                Action::Ask(question) => {
                    if let Err(e) = self.handle_question(&question).await {
                        print_error(&e);
                        if e.is_fatal() {
                            return Err(e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_command(&mut self, name: &str, arg: &str) {
        match name {
            "schema" => {
                println!("{}", self.snapshot.context());
                if self.snapshot.tables_truncated || self.snapshot.columns_truncated {
                    println!("\n(schema snapshot truncated at configured caps)");
                }
                println!();
            }
            "format" => match OutputFormat::parse_name(arg) {
                Some(format) => {
                    self.format = format;
                    println!("Output format set to {}.\n", format);
                }
                None => println!("Unknown format '{}'. Use table, json or markdown.\n", arg),
            },
            "help" => {
                println!("Commands:");
                println!("  \\schema          show the schema snapshot sent to the model");
                println!("  \\format <name>   set output format (table, json, markdown)");
                println!("  \\help            show this help");
                println!("  exit / quit      end the session\n");
            }
            _ => println!("Unknown command '\\{}'. Try \\help.\n", name),
        }
    }

    /// Close the underlying connection pool.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// The full generate/validate/execute/explain pipeline for one question.
    async fn handle_question(&self, question: &str) -> AppResult<()> {
        let db_type = self.pool.db_type();
        let context = self.snapshot.context();

        let raw = self
            .llm
            .generate_sql(question, &context, db_type, self.row_limit)
            .await?;
        let sql = guard::validate_generated(&raw, db_type)?;

        // Every statement that reaches the database gets logged first
        info!(sql = %sql, "Generated SQL");
        println!("\nGenerated SQL:\n{}\n", sql);

        let request = QueryRequest {
            sql: sql.clone(),
            limit: Some(self.row_limit),
            timeout_secs: None,
        };
        let result = self.executor.execute_query(&self.pool, &request).await?;

        println!("Rows returned: {}", result.row_count());
        if result.truncated {
            println!("(truncated at the {} row limit)", self.row_limit);
        }
        if result.rows.is_empty() {
            println!("No rows matched.");
        } else {
            println!("{}", render_result(&result, self.format));
        }

        let explanation = self.llm.explain_results(question, &sql, &result).await?;
        println!("\nExplanation:\n{}", explanation);
        println!("\n{}\n", "-".repeat(SEPARATOR_WIDTH));

        Ok(())
    }
}

fn print_error(err: &AppError) {
    println!("Error: {}", err);
    if let Some(suggestion) = err.suggestion() {
        println!("Hint: {}", suggestion);
    }
    println!();
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
