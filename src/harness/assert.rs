//! Fluent assertion builder
//!
//! ```no_run
//! use queryassert::{Config, assert_that};
//!
//! assert_that().query("select 1 as x").returns("x=1\n");
//! assert_that()
//!     .with(Config::FoodmartNative)
//!     .query("select * from nonexistent_table")
//!     .throws("nonexistent_table");
//! ```

use crate::db::connection::{Connection, ConnectionFactory};
use crate::error::{CheckResult, HarnessError, HarnessResult};
use crate::harness::checker::{Checker, ExpectedSubstring, ExpectedText};
use crate::harness::config::{Config, ConfigConnectionFactory};
use crate::harness::executor::{self, ExecutionError};
use std::fmt;
use std::sync::Arc;

/// Start an assertion against the in-memory fixture configuration.
pub fn assert_that() -> AssertThat {
    AssertThat::new(Config::Regular)
}

/// Builder snapshot holding the backend queries will run against.
///
/// Every `with*` call returns a new snapshot and leaves `self` untouched.
#[derive(Clone)]
pub struct AssertThat {
    factory: Arc<dyn ConnectionFactory>,
}

impl AssertThat {
    pub fn new(config: Config) -> Self {
        Self {
            factory: Arc::new(ConfigConnectionFactory::new(config)),
        }
    }

    /// Run queries against a named configuration.
    pub fn with(&self, config: Config) -> Self {
        Self::new(config)
    }

    /// Run queries against connections from a caller-supplied factory.
    pub fn with_factory(&self, factory: impl ConnectionFactory + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Bind a query. Nothing runs until a terminal method is called.
    pub fn query(&self, sql: impl Into<String>) -> AssertQuery {
        AssertQuery {
            factory: Arc::clone(&self.factory),
            sql: sql.into(),
        }
    }
}

impl fmt::Debug for AssertThat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertThat").finish_non_exhaustive()
    }
}

/// A query bound to a backend.
///
/// Each terminal call opens its own connection and runs the query once, so
/// the same `AssertQuery` can be checked repeatedly.
#[derive(Clone)]
pub struct AssertQuery {
    factory: Arc<dyn ConnectionFactory>,
    sql: String,
}

impl AssertQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Assert that the rows serialize to exactly `expected`.
    #[track_caller]
    pub fn returns(&self, expected: &str) {
        if let Err(err) = self.try_returns(expected) {
            fail(err);
        }
    }

    /// Assert that the serialized rows satisfy `check`.
    #[track_caller]
    pub fn returns_with(&self, check: impl Fn(&str) -> CheckResult) {
        if let Err(err) = self.try_returns_with(check) {
            fail(err);
        }
    }

    /// Assert that the query fails with a trace containing `expected`.
    #[track_caller]
    pub fn throws(&self, expected: &str) {
        if let Err(err) = self.try_throws(expected) {
            fail(err);
        }
    }

    /// Assert only that the query does not fail.
    #[track_caller]
    pub fn runs(&self) {
        if let Err(err) = self.try_runs() {
            fail(err);
        }
    }

    pub fn try_returns(&self, expected: &str) -> HarnessResult<()> {
        let check = ExpectedText(expected.to_string());
        self.check(Checker::Result(&check))
    }

    pub fn try_returns_with(&self, check: impl Fn(&str) -> CheckResult) -> HarnessResult<()> {
        self.check(Checker::Result(&check))
    }

    pub fn try_throws(&self, expected: &str) -> HarnessResult<()> {
        let check = ExpectedSubstring(expected.to_string());
        self.check(Checker::Exception(&check))
    }

    pub fn try_runs(&self) -> HarnessResult<()> {
        self.check(Checker::None)
    }

    /// Run the query and return its canonical serialization.
    pub fn fetch(&self) -> HarnessResult<String> {
        let mut connection = self.connect()?;
        let results = executor::run_query(connection.as_mut(), &self.sql).map_err(|failure| {
            HarnessError::Execution {
                sql: self.sql.clone(),
                trace: failure.trace(),
            }
        })?;
        Ok(executor::serialize(&results))
    }

    fn connect(&self) -> HarnessResult<Box<dyn Connection>> {
        self.factory
            .create_connection()
            .map_err(|source| HarnessError::Setup {
                sql: self.sql.clone(),
                source,
            })
    }

    fn check(&self, checker: Checker<'_>) -> HarnessResult<()> {
        let connection = self.connect()?;
        executor::assert_query(connection, &self.sql, checker).map_err(|err| match err {
            ExecutionError::Query(failure) => HarnessError::Execution {
                sql: self.sql.clone(),
                trace: failure.trace(),
            },
            ExecutionError::Check(source) => HarnessError::Assertion {
                sql: self.sql.clone(),
                source,
            },
        })
    }
}

impl fmt::Debug for AssertQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertQuery")
            .field("sql", &self.sql)
            .finish_non_exhaustive()
    }
}

#[track_caller]
fn fail(err: HarnessError) -> ! {
    tracing::debug!(sql = err.sql(), "assertion failed");
    panic!("{}", err)
}
