//! Builder behaviour with caller-supplied connection factories

use crate::common::CountingFactory;
use queryassert::db::{Connection, QueryResults, SqliteConnection};
use queryassert::error::{DbError, DbResult, Result};
use queryassert::{Config, HarnessError, assert_that};

/// Connection whose engine panics instead of returning an error
struct Panicking;

impl Connection for Panicking {
    fn execute_query(&mut self, _sql: &str) -> DbResult<QueryResults> {
        panic!("planner reached unreachable state")
    }

    fn backend_name(&self) -> &str {
        "panicking"
    }
}

#[test]
fn test_factory_used_once_per_terminal_call() {
    let factory = CountingFactory::default();
    let query = assert_that()
        .with_factory(factory.clone())
        .query("select 1 as x");
    assert_eq!(factory.calls(), 0);

    query.returns("x=1\n");
    query.runs();
    assert_eq!(factory.calls(), 2);
}

#[test]
fn test_derived_builders_are_independent() {
    let first = CountingFactory::default();
    let second = CountingFactory::default();

    let base = assert_that();
    let a = base.with_factory(first.clone());
    let b = base.with_factory(second.clone());
    let c = base.with(Config::Regular);

    a.query("select 1 as x").runs();
    b.query("select 1 as x").runs();
    b.query("select 2 as x").runs();
    c.query("select 3 as x").returns("x=3\n");
    base.query("select 4 as x").returns("x=4\n");

    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 2);
}

#[test]
fn test_bespoke_connection_setup() {
    let factory = || -> Result<Box<dyn Connection>> {
        let conn = SqliteConnection::open_fixtures()?;
        Ok(Box::new(conn))
    };
    assert_that()
        .with_factory(factory)
        .query("select d.name from hr.depts d where d.deptno = 30")
        .returns("name=Marketing\n");
}

#[test]
fn test_setup_failure_names_query() {
    let factory =
        || -> Result<Box<dyn Connection>> { Err(DbError::ConnectionFailed("timeout".into()).into()) };
    let err = assert_that()
        .with_factory(factory)
        .query("select 1")
        .try_returns("x=1\n")
        .unwrap_err();
    assert!(matches!(err, HarnessError::Setup { .. }));
    assert_eq!(err.sql(), "select 1");
    assert!(err.to_string().contains("timeout"));
}

#[test]
fn test_backend_panic_satisfies_throws() {
    let factory = || -> Result<Box<dyn Connection>> { Ok(Box::new(Panicking)) };
    assert_that()
        .with_factory(factory)
        .query("select 1")
        .throws("planner reached unreachable state");
}

#[test]
fn test_backend_panic_fails_returns() {
    let factory = || -> Result<Box<dyn Connection>> { Ok(Box::new(Panicking)) };
    let err = assert_that()
        .with_factory(factory)
        .query("select 1")
        .try_returns("")
        .unwrap_err();
    match err {
        HarnessError::Execution { trace, .. } => {
            assert!(trace.starts_with("panicked: planner reached unreachable state"));
        }
        other => panic!("Expected Execution, got {:?}", other),
    }
}
