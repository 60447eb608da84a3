//! Database type definitions
//!
//! Core data structures for representing query results and values as
//! a backend hands them to the harness.

use std::fmt;

/// Query execution results
#[derive(Debug, Clone, Default)]
pub struct QueryResults {
    /// Column definitions, in the backend's reported order
    pub columns: Vec<ColumnDef>,
    /// Result rows, in the backend's natural order
    pub rows: Vec<Row>,
    /// Row count as reported by the backend
    pub row_count: usize,
}

/// Column definition in query results
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Column label
    pub name: String,
    /// Data type
    pub data_type: DataType,
}

/// Database data types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    // Integer types
    SmallInt,
    Integer,
    BigInt,
    /// Unsigned 32-bit object identifier
    Oid,

    // Floating point
    Real,
    Double,
    Numeric,

    // Text types
    Text,
    Varchar,
    Char,

    // Boolean
    Boolean,

    // Date/time types
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,

    // JSON types
    Json,
    Jsonb,

    // Binary data
    Bytea,

    // UUID
    Uuid,

    // Array type
    Array(Box<DataType>),

    // Other/unknown types
    Unknown(String),
}

/// A single row of query results
#[derive(Debug, Clone)]
pub struct Row {
    /// Cell values in column order
    pub values: Vec<CellValue>,
}

/// A cell value (single column value in a row)
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// NULL value
    Null,

    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Text/string value
    Text(String),

    /// Boolean value
    Boolean(bool),

    /// JSON value (parsed)
    Json(serde_json::Value),

    /// Binary data
    Binary(Vec<u8>),

    /// Date/time value, already rendered by the backend
    DateTime(String),

    /// UUID value
    Uuid(String),

    /// Array value
    Array(Vec<CellValue>),
}

impl QueryResults {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }
}

impl DataType {
    /// Column type to declare when materializing this type in SQLite
    pub fn sqlite_affinity(&self) -> &'static str {
        match self {
            DataType::SmallInt
            | DataType::Integer
            | DataType::BigInt
            | DataType::Oid
            | DataType::Boolean => "INTEGER",
            DataType::Real | DataType::Double => "REAL",
            DataType::Numeric => "NUMERIC",
            DataType::Bytea => "BLOB",
            _ => "TEXT",
        }
    }
}

/// Renders the value the way the backend reported it. No truncation and no
/// custom number formatting.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) | CellValue::DateTime(s) | CellValue::Uuid(s) => f.write_str(s),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Json(v) => write!(f, "{}", v),
            CellValue::Binary(b) => write!(f, "<binary {} bytes>", b.len()),
            CellValue::Array(arr) => {
                f.write_str("{")?;
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl CellValue {
    /// Check if this is a NULL value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}
