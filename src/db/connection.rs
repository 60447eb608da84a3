//! Connection traits
//!
//! Defines the interface every backend exposes to the harness.
//! This abstraction allows for:
//! - Several backends (in-memory fixtures, PostgreSQL, cloned datasets)
//! - Easy testing with hand-written connections
//! - A single way of acquiring connections, whatever the backend

use crate::db::types::QueryResults;
use crate::error::{DbResult, Result};

/// A live handle through which queries are executed.
///
/// Dropping the handle releases the connection. Implementations release any
/// per-query statement state before `execute_query` returns.
pub trait Connection: Send {
    /// Execute a read query and return its rows
    ///
    /// # Arguments
    /// * `sql` - The query text, passed to the backend unchanged
    ///
    /// # Errors
    /// Returns the backend's own error (`DbError::Sqlite`, `DbError::Postgres`)
    /// if it rejects or fails the query
    fn execute_query(&mut self, sql: &str) -> DbResult<QueryResults>;

    /// Short name of the backend, used in log output
    fn backend_name(&self) -> &str;
}

/// Produces a ready-to-use connection on demand.
///
/// Factories carry no state beyond their configuration and are invoked once
/// per assertion. They must be safe to invoke from several threads when
/// assertions run concurrently.
pub trait ConnectionFactory: Send + Sync {
    /// Acquire a new connection
    ///
    /// # Errors
    /// Returns a backend or configuration error if no connection can be made
    fn create_connection(&self) -> Result<Box<dyn Connection>>;
}

impl<F> ConnectionFactory for F
where
    F: Fn() -> Result<Box<dyn Connection>> + Send + Sync,
{
    fn create_connection(&self) -> Result<Box<dyn Connection>> {
        self()
    }
}
