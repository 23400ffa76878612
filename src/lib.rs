//! askdb - natural-language questions against SQL databases.
//!
//! A small interactive tool: connect to a database, snapshot its schema,
//! let a language model translate questions into SQL, validate that the
//! SQL is read-only, execute it with a row cap, and explain the results.
//!
//! Supports SQLite, PostgreSQL and MySQL via sqlx.

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod guard;
pub mod llm;
pub mod models;
pub mod repl;

pub use config::{Config, DatabaseConfig};
pub use db::{DbPool, QueryExecutor, SchemaInspector};
pub use error::{AppError, AppResult};
pub use format::OutputFormat;
pub use llm::LlmClient;
pub use repl::Session;
