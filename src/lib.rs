//! queryassert - Fluent assertions for SQL query results
//!
//! queryassert runs a query against a chosen backend and checks one of three
//! things: that the rows render to an exact text, that the query fails with
//! a message containing some text, or only that it runs.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`harness`]: The `assert_that()` builder, configurations, executor and checkers
//! - [`db`]: Connection traits and the SQLite and PostgreSQL backends
//! - [`config`]: Connection profiles and harness settings
//! - [`error`]: Error types and result aliases
//!
//! # Canonical form
//!
//! Each row renders as `label=value` pairs joined by `"; "` and ends with a
//! newline. Values use the backend's own text form and rows keep the
//! backend's order, so expectations for unordered queries need an
//! `ORDER BY`.
//!
//! # Example
//!
//! ```no_run
//! use queryassert::{Config, assert_that};
//!
//! let base = assert_that();
//! base.query("select 1 as x").returns("x=1\n");
//! base.query("select empid, name from hr.emps where deptno = 20")
//!     .returns("empid=200; name=Eric\n");
//! base.query("select * from nonexistent_table")
//!     .throws("no such table: nonexistent_table");
//!
//! // Same check against the external FoodMart server
//! base.with(Config::Foodmart)
//!     .query("select count(*) as c from foodmart.sales_fact_1997")
//!     .runs();
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod harness;

pub use db::{Connection, ConnectionFactory};
pub use error::{
    CheckFailure, CheckResult, ConfigError, DbError, HarnessError, HarnessResult,
    QueryAssertError, Result,
};
pub use harness::{AssertQuery, AssertThat, Config, assert_that};
