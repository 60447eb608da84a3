//! Assertions against a live PostgreSQL server
//!
//! These tests skip unless QUERYASSERT_FOODMART_URL points at a reachable server.

use crate::common::foodmart_config;
use queryassert::config::ConnectionConfig;
use queryassert::db::{Connection, ExecutionMode, PostgresConnection};
use queryassert::error::Result;
use queryassert::{AssertThat, Config, HarnessError, assert_that};
use rstest::rstest;
use std::time::Duration;

/// Connection settings for the server, or None when it is unreachable
fn reachable() -> Option<ConnectionConfig> {
    let config = foodmart_config()?;
    if let Err(e) = PostgresConnection::connect(&config, ExecutionMode::Translated) {
        eprintln!(
            "Skipping test: Database not available at {}:{} - {}",
            config.host, config.port, e
        );
        return None;
    }
    Some(config)
}

/// Builder bound to the server in `mode`, or None when it is unreachable
fn postgres(mode: ExecutionMode) -> Option<AssertThat> {
    let config = reachable()?;
    let factory = move || -> Result<Box<dyn Connection>> {
        Ok(Box::new(PostgresConnection::connect(&config, mode)?))
    };
    Some(assert_that().with_factory(factory))
}

#[test]
fn test_translated_select_literal() {
    let Some(pg) = postgres(ExecutionMode::Translated) else {
        return;
    };
    pg.query("SELECT 1 AS x").returns("x=1\n");
}

#[test]
fn test_modes_render_booleans_differently() {
    let Some(translated) = postgres(ExecutionMode::Translated) else {
        return;
    };
    let Some(native) = postgres(ExecutionMode::Native) else {
        return;
    };
    translated.query("SELECT true AS t").returns("t=true\n");
    native.query("SELECT true AS t").returns("t=t\n");
}

#[test]
fn test_native_two_rows() {
    let Some(pg) = postgres(ExecutionMode::Native) else {
        return;
    };
    pg.query("SELECT * FROM (VALUES (1, 2), (3, 4)) AS v(a, b) ORDER BY a")
        .returns("a=1; b=2\na=3; b=4\n");
}

#[test]
fn test_missing_relation_throws() {
    let Some(pg) = postgres(ExecutionMode::Translated) else {
        return;
    };
    pg.query("SELECT * FROM nonexistent_table")
        .throws("relation \"nonexistent_table\" does not exist");
}

#[test]
fn test_foodmart_configs_run() {
    if foodmart_config().is_none() {
        return;
    }
    if postgres(ExecutionMode::Translated).is_none() {
        return;
    }
    let base = assert_that();
    for config in [Config::Foodmart, Config::FoodmartNative, Config::FoodmartClone] {
        base.with(config)
            .query("SELECT count(*) AS c FROM foodmart.sales_fact_1997")
            .runs();
    }
}

#[rstest]
#[case("SELECT interval '1 day' AS i")]
#[case("SELECT interval '1 year 2 months 3 days 04:05:06.5' AS i, interval '-1 day 1 hour' AS j")]
#[case("SELECT 'NaN'::numeric AS n")]
#[case("SELECT 1e40::numeric AS n")]
#[case("SELECT 1.50::numeric AS n, -0.0001234::numeric AS m")]
#[case("SELECT 'pg_class'::regclass::oid AS o")]
#[case("SELECT '04:05:06+02'::timetz AS t, '04:05:06.5'::time AS u")]
fn test_translated_values_match_server_text(#[case] sql: &str) {
    let Some(translated) = postgres(ExecutionMode::Translated) else {
        return;
    };
    let Some(native) = postgres(ExecutionMode::Native) else {
        return;
    };
    assert_eq!(
        translated.query(sql).fetch().unwrap(),
        native.query(sql).fetch().unwrap()
    );
}

#[test]
fn test_translated_interval() {
    let Some(pg) = postgres(ExecutionMode::Translated) else {
        return;
    };
    pg.query("SELECT interval '1 day' AS i").returns("i=1 day\n");
}

#[test]
fn test_value_without_decoder_fails_query() {
    let Some(pg) = postgres(ExecutionMode::Translated) else {
        return;
    };
    let query = pg.query("SELECT '10.0.0.1'::inet AS a");
    match query.try_returns("a=10.0.0.1\n").unwrap_err() {
        HarnessError::Execution { trace, .. } => {
            assert!(trace.contains("Cannot render column 'a' of type inet"));
        }
        other => panic!("Expected Execution, got {:?}", other),
    }
}

#[test]
fn test_server_error_keeps_sqlstate_and_cause() {
    let Some(pg) = postgres(ExecutionMode::Translated) else {
        return;
    };
    let query = pg.query("SELECT * FROM nonexistent_table");
    query.throws("42P01");
    query.throws("Caused by: ERROR: relation \"nonexistent_table\" does not exist");
}

#[test]
fn test_native_keeps_last_statement_rows() {
    let Some(pg) = postgres(ExecutionMode::Native) else {
        return;
    };
    pg.query("CREATE TEMP TABLE native_t (a int); SELECT 1 AS x")
        .returns("x=1\n");
    pg.query("SELECT 1 AS x; CREATE TEMP TABLE native_t (a int)")
        .returns("");
}

#[test]
fn test_dropped_connection_leaves_server() {
    let Some(config) = reachable() else {
        return;
    };
    let mut conn = PostgresConnection::connect(&config, ExecutionMode::Native).unwrap();
    let pid = conn
        .execute_query("SELECT pg_backend_pid() AS pid")
        .unwrap()
        .rows[0]
        .values[0]
        .to_string();
    drop(conn);

    let mut observer = PostgresConnection::connect(&config, ExecutionMode::Native).unwrap();
    let sql = format!("SELECT count(*) AS n FROM pg_stat_activity WHERE pid = {}", pid);
    let gone = (0..50).any(|_| {
        let results = observer.execute_query(&sql).unwrap();
        if results.rows[0].values[0].to_string() == "0" {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
        false
    });
    assert!(gone, "backend {} still listed after drop", pid);
}
