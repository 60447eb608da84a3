//! Query executor
//!
//! Runs one query on one connection, captures whatever the backend raises,
//! and renders successful results in the canonical `label=value` form.

use crate::db::connection::Connection;
use crate::db::types::QueryResults;
use crate::error::CheckFailure;
use crate::harness::checker::{Checker, Failure};
use std::fmt::Write;
use std::panic::{self, AssertUnwindSafe};

/// Why an execution did not pass
#[derive(Debug)]
pub enum ExecutionError {
    /// The query failed and no exception checker was present
    Query(Failure),
    /// The active checker rejected the outcome
    Check(CheckFailure),
}

/// Execute `sql`, turning both errors and panics into a [`Failure`].
pub fn run_query(connection: &mut dyn Connection, sql: &str) -> Result<QueryResults, Failure> {
    tracing::debug!(backend = connection.backend_name(), sql, "executing query");
    match panic::catch_unwind(AssertUnwindSafe(|| connection.execute_query(sql))) {
        Ok(Ok(results)) => {
            tracing::debug!(rows = results.row_count, "query succeeded");
            Ok(results)
        }
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "query failed");
            Err(Failure::from_error(err))
        }
        Err(payload) => {
            let failure = Failure::from_panic(payload);
            tracing::warn!(%failure, "backend panicked during query");
            Err(failure)
        }
    }
}

/// Execute `sql` on `connection` and judge the outcome with `checker`.
///
/// The connection is consumed; results are dropped before the connection on
/// every path.
pub fn assert_query(
    mut connection: Box<dyn Connection>,
    sql: &str,
    checker: Checker<'_>,
) -> Result<(), ExecutionError> {
    let results = match (run_query(connection.as_mut(), sql), checker) {
        (Err(failure), Checker::Exception(check)) => {
            return check.check(Some(&failure)).map_err(ExecutionError::Check);
        }
        (Err(failure), _) => return Err(ExecutionError::Query(failure)),
        (Ok(_), Checker::Exception(check)) => {
            tracing::debug!("query succeeded but a failure was expected");
            return check.check(None).map_err(ExecutionError::Check);
        }
        (Ok(results), _) => results,
    };

    let text = serialize(&results);
    drop(results);
    drop(connection);

    match checker {
        Checker::Result(check) => check.check(&text).map_err(ExecutionError::Check),
        _ => Ok(()),
    }
}

/// Render rows as `label=value` pairs joined by `"; "`, one line per row.
///
/// Values use the backend's own textual form. Row order is the backend's.
pub fn serialize(results: &QueryResults) -> String {
    let mut buf = String::new();
    for row in &results.rows {
        for (i, (column, value)) in results.columns.iter().zip(&row.values).enumerate() {
            if i > 0 {
                buf.push_str("; ");
            }
            let _ = write!(buf, "{}={}", column.name, value);
        }
        buf.push('\n');
    }
    buf
}
