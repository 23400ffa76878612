//! Data models for askdb.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

pub use connection::DatabaseType;
pub use query::{
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryRequest, QueryResult,
};
pub use schema::{ColumnInfo, SchemaSnapshot, TableInfo};
