//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool setup
//! - Query execution with row caps and timeouts
//! - Schema introspection
//! - Row-to-JSON type mappings

pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::DbPool;
pub use schema::SchemaInspector;
