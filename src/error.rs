//! Error types for queryassert
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors with clear error chains.
//!
//! Two families live here. Backend and configuration errors
//! ([`QueryAssertError`], [`DbError`], [`ConfigError`]) describe what went
//! wrong while talking to a database. Harness errors ([`HarnessError`],
//! [`CheckFailure`]) describe why an assertion did not pass.

use std::io;

/// Main error type for backend and configuration operations
#[derive(Debug, thiserror::Error)]
pub enum QueryAssertError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Database operation errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Failed to establish connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The background connection went away between queries
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// The SQLite engine rejected or failed a statement
    #[error("Query execution failed: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// The PostgreSQL server rejected or failed a statement
    #[error("Query execution failed: {0}")]
    Postgres(#[source] tokio_postgres::Error),

    /// A value has no decoder that reproduces the server's text for it
    #[error("Cannot render column '{column}' of type {type_name}")]
    Undecodable {
        column: String,
        type_name: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Copying a remote dataset into the local clone failed
    #[error("Dataset clone failed: {0}")]
    CloneFailed(String),
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Config file not found
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Connection profile not found
    #[error("Connection profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Why an outcome checker rejected a query outcome
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckFailure {
    /// Serialized rows differ from the expected text
    #[error("result mismatch\nexpected:\n{expected}\nactual:\n{actual}")]
    Mismatch { expected: String, actual: String },

    /// An error was expected but the query succeeded
    #[error("expected an error containing [{expected}] but query succeeded")]
    UnexpectedSuccess { expected: String },

    /// The failure trace does not mention the expected text
    #[error("error trace does not contain [{expected}]\n{trace}")]
    MissingSubstring { expected: String, trace: String },

    /// Raised by a caller-supplied checker
    #[error("{0}")]
    Custom(String),
}

/// A failed assertion, always naming the query that caused it
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Could not obtain a connection or otherwise prepare the call
    #[error("exception while executing [{sql}]: {source}")]
    Setup {
        sql: String,
        #[source]
        source: QueryAssertError,
    },

    /// The query itself failed and no exception checker was supplied
    #[error("exception while executing [{sql}]\n{trace}")]
    Execution { sql: String, trace: String },

    /// The query ran but its outcome was rejected
    #[error("assertion failed for [{sql}]: {source}")]
    Assertion {
        sql: String,
        #[source]
        source: CheckFailure,
    },
}

impl HarnessError {
    /// The query text this failure belongs to
    pub fn sql(&self) -> &str {
        match self {
            HarnessError::Setup { sql, .. }
            | HarnessError::Execution { sql, .. }
            | HarnessError::Assertion { sql, .. } => sql,
        }
    }
}

/// Specialized Result type for backend operations
pub type Result<T> = std::result::Result<T, QueryAssertError>;

/// Specialized Result type for database operations
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized Result type for checker verdicts
pub type CheckResult = std::result::Result<(), CheckFailure>;

/// Specialized Result type for terminal assertions
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
