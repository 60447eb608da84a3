//! SQLite connection
//!
//! In-process backend built on rusqlite. Serves the fixture datasets and
//! locally cloned copies of remote datasets.

use crate::db::connection::Connection;
use crate::db::fixtures;
use crate::db::types::{CellValue, ColumnDef, DataType, QueryResults, Row};
use crate::error::{DbError, DbResult};
use rusqlite::types::Value;

/// Connection to an in-memory SQLite database
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    name: &'static str,
}

impl SqliteConnection {
    /// Open an empty in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            conn,
            name: "sqlite",
        })
    }

    /// Open an in-memory database with the `hr` and `foodmart` fixtures attached.
    pub fn open_fixtures() -> DbResult<Self> {
        let mut connection = Self::open_in_memory()?;
        for (dataset, script) in fixtures::DATASETS {
            connection.conn.execute_batch(script).map_err(|e| {
                DbError::ConnectionFailed(format!("Loading fixture '{}': {}", dataset, e))
            })?;
        }
        connection.name = "fixtures";
        tracing::debug!("opened fixture connection");
        Ok(connection)
    }

    /// Attach an empty in-memory schema under `schema`.
    pub fn attach_schema(&mut self, schema: &str) -> DbResult<()> {
        self.conn
            .execute_batch(&format!(
                "ATTACH DATABASE ':memory:' AS {};",
                quote_ident(schema)
            ))
            .map_err(|e| DbError::CloneFailed(e.to_string()))?;
        self.name = "clone";
        Ok(())
    }

    /// Create `schema.table` shaped like `results` and copy every row into it.
    pub fn load_table(&mut self, schema: &str, table: &str, results: &QueryResults) -> DbResult<()> {
        let map_err = |e: rusqlite::Error| {
            DbError::CloneFailed(format!("Loading {}.{}: {}", schema, table, e))
        };

        let target = format!("{}.{}", quote_ident(schema), quote_ident(table));
        let column_defs: Vec<String> = results
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.data_type.sqlite_affinity()))
            .collect();
        self.conn
            .execute_batch(&format!("CREATE TABLE {} ({});", target, column_defs.join(", ")))
            .map_err(map_err)?;

        if results.columns.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; results.columns.len()].join(", ");
        let tx = self.conn.transaction().map_err(map_err)?;
        {
            let mut stmt = tx
                .prepare(&format!("INSERT INTO {} VALUES ({})", target, placeholders))
                .map_err(map_err)?;
            for row in &results.rows {
                let params: Vec<Value> = row.values.iter().map(to_sqlite_value).collect();
                stmt.execute(rusqlite::params_from_iter(params))
                    .map_err(map_err)?;
            }
        }
        tx.commit().map_err(map_err)?;
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn execute_query(&mut self, sql: &str) -> DbResult<QueryResults> {
        let mut stmt = self.conn.prepare(sql).map_err(DbError::Sqlite)?;
        let columns: Vec<ColumnDef> = stmt
            .columns()
            .iter()
            .map(|col| ColumnDef {
                name: col.name().to_string(),
                data_type: col
                    .decl_type()
                    .map_or(DataType::Unknown(String::new()), datatype_from_decl_type),
            })
            .collect();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([]).map_err(DbError::Sqlite)?;
        while let Some(row) = cursor.next().map_err(DbError::Sqlite)? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value: Value = row.get(i).map_err(DbError::Sqlite)?;
                values.push(from_sqlite_value(value));
            }
            rows.push(Row { values });
        }

        Ok(QueryResults::new(columns, rows))
    }

    fn backend_name(&self) -> &str {
        self.name
    }
}

/// Map a declared SQLite column type to our DataType enum
fn datatype_from_decl_type(decl: &str) -> DataType {
    let upper = decl.to_ascii_uppercase();
    if upper.contains("INT") {
        DataType::BigInt
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        DataType::Text
    } else if upper.contains("BLOB") {
        DataType::Bytea
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        DataType::Double
    } else {
        DataType::Numeric
    }
}

fn from_sqlite_value(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Integer(i) => CellValue::Integer(i),
        Value::Real(f) => CellValue::Float(f),
        Value::Text(s) => CellValue::Text(s),
        Value::Blob(b) => CellValue::Binary(b),
    }
}

fn to_sqlite_value(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Integer(i) => Value::Integer(*i),
        CellValue::Float(f) => Value::Real(*f),
        CellValue::Boolean(b) => Value::Integer(i64::from(*b)),
        CellValue::Binary(b) => Value::Blob(b.clone()),
        other => Value::Text(other.to_string()),
    }
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
