//! Dataset cloning
//!
//! Copies tables from a source connection into a fresh in-memory SQLite
//! database so queries run against a local snapshot of remote data.

use crate::config::{ConnectionConfig, Settings};
use crate::db::connection::Connection;
use crate::db::postgres::{ExecutionMode, PostgresConnection};
use crate::db::sqlite::{SqliteConnection, quote_ident};
use crate::error::{DbError, DbResult};

/// Clone the configured FoodMart tables from the PostgreSQL backend.
pub fn clone_foodmart(config: &ConnectionConfig, settings: &Settings) -> DbResult<SqliteConnection> {
    let mut remote = PostgresConnection::connect(config, ExecutionMode::Translated)?;
    clone_tables(&mut remote, &settings.foodmart_schema, &settings.clone_tables)
}

/// Copy `schema.table` for every table in `tables` from `source` into a new
/// local database, under the same schema name.
pub fn clone_tables(
    source: &mut dyn Connection,
    schema: &str,
    tables: &[String],
) -> DbResult<SqliteConnection> {
    let mut local = SqliteConnection::open_in_memory()?;
    local.attach_schema(schema)?;

    for table in tables {
        let sql = format!("SELECT * FROM {}.{}", quote_ident(schema), quote_ident(table));
        let results = source.execute_query(&sql).map_err(|e| {
            DbError::CloneFailed(format!("Reading {}.{} from {}: {}", schema, table, source.backend_name(), e))
        })?;
        tracing::debug!(schema, table = %table, rows = results.row_count, "copying table");
        local.load_table(schema, table, &results)?;
    }

    tracing::info!(schema, tables = tables.len(), "cloned dataset");
    Ok(local)
}
