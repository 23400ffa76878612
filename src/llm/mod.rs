//! LLM integration.
//!
//! Two calls per question: one to turn the question plus schema context
//! into SQL, one to turn the query results into a short explanation.

pub mod client;
pub mod prompt;

pub use client::LlmClient;
