//! Database abstraction layer
//!
//! This module provides a trait-based abstraction over query backends,
//! allowing the harness to run the same assertion against in-memory
//! fixtures, a PostgreSQL server, or a local clone of remote data.

pub mod clone;
pub mod connection;
pub mod fixtures;
pub mod postgres;
pub mod sqlite;
pub mod types;

// Re-export main types
pub use connection::{Connection, ConnectionFactory};
pub use postgres::{ExecutionMode, PostgresConnection};
pub use sqlite::SqliteConnection;
pub use types::{CellValue, ColumnDef, DataType, QueryResults, Row};
