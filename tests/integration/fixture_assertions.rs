//! Assertions against the in-memory fixture configuration

use queryassert::db::{Connection, SqliteConnection};
use queryassert::{CheckFailure, Config, HarnessError, assert_that};
use rstest::rstest;

#[test]
fn test_select_literal() {
    assert_that().query("select 1 as x").returns("x=1\n");
}

#[test]
fn test_two_columns_two_rows() {
    assert_that()
        .query("select 1 as a, 2 as b union all select 3, 4")
        .returns("a=1; b=2\na=3; b=4\n");
}

#[test]
fn test_empty_result_is_empty_text() {
    assert_that()
        .query("select empid from hr.emps where deptno = 99")
        .returns("");
}

#[test]
fn test_hr_dataset() {
    assert_that()
        .query("select empid, deptno, name from hr.emps order by empid")
        .returns(
            "empid=100; deptno=10; name=Bill\n\
             empid=110; deptno=10; name=Theodore\n\
             empid=150; deptno=10; name=Sebastian\n\
             empid=200; deptno=20; name=Eric\n",
        );
}

#[test]
fn test_backend_value_rendering() {
    assert_that()
        .query("select salary, commission from hr.emps where empid = 150")
        .returns("salary=7000; commission=NULL\n");
}

#[test]
fn test_join_across_datasets() {
    assert_that()
        .query(
            "select s.cust_id, p.product_name \
             from foodmart.sales_fact_1997 s \
             join foodmart.product p on p.product_id = s.prod_id \
             order by s.cust_id",
        )
        .returns(
            "cust_id=100; product_name=Washington Berry Juice\n\
             cust_id=150; product_name=Washington Mango Drink\n",
        );
}

#[rstest]
#[case("select deptno from hr.depts")]
#[case("select empid, commission from hr.emps where deptno = 10")]
#[case("select * from foodmart.product")]
fn test_one_line_per_row(#[case] sql: &str) {
    let results = SqliteConnection::open_fixtures()
        .unwrap()
        .execute_query(sql)
        .unwrap();
    let text = assert_that().query(sql).fetch().unwrap();
    assert_eq!(text.lines().count(), results.row_count);
    assert_eq!(text.matches('\n').count(), results.row_count);
    assert!(text.ends_with('\n'));
}

#[rstest]
#[case("select * from nonexistent_table", "no such table: nonexistent_table")]
#[case("selec 1", "syntax error")]
#[case("select nosuchcolumn from hr.depts", "no such column: nosuchcolumn")]
fn test_throws_matches_substring(#[case] sql: &str, #[case] expected: &str) {
    assert_that().query(sql).throws(expected);
}

#[test]
fn test_throws_is_case_sensitive() {
    let err = assert_that()
        .query("select * from nonexistent_table")
        .try_throws("No Such Table")
        .unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Assertion {
            source: CheckFailure::MissingSubstring { .. },
            ..
        }
    ));
}

#[test]
fn test_throws_fails_when_query_succeeds() {
    let err = assert_that()
        .query("select 1 as x")
        .try_throws("anything")
        .unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Assertion {
            source: CheckFailure::UnexpectedSuccess { .. },
            ..
        }
    ));
}

#[test]
#[should_panic(expected = "expected an error containing [anything] but query succeeded")]
fn test_throws_panics_when_query_succeeds() {
    assert_that().query("select 1 as x").throws("anything");
}

#[test]
fn test_returns_surfaces_query_failure() {
    let err = assert_that()
        .query("select * from nonexistent_table")
        .try_returns("")
        .unwrap_err();
    match err {
        HarnessError::Execution { sql, trace } => {
            assert_eq!(sql, "select * from nonexistent_table");
            assert!(trace.contains("no such table"));
        }
        other => panic!("Expected Execution, got {:?}", other),
    }
}

#[test]
fn test_failure_trace_carries_backend_error() {
    let query = assert_that().query("select * from nonexistent_table");
    query.throws("SqliteFailure");
    query.throws("Caused by: no such table: nonexistent_table");
}

#[test]
fn test_runs_ignores_content() {
    assert_that().query("select * from hr.emps").runs();
}

#[test]
#[should_panic(expected = "exception while executing [selec 1]")]
fn test_runs_fails_on_syntax_error() {
    assert_that().query("selec 1").runs();
}

#[test]
fn test_mismatch_reports_both_texts() {
    let err = assert_that()
        .query("select 1 as x")
        .try_returns("x=2\n")
        .unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("assertion failed for [select 1 as x]"));
    assert!(message.contains("expected:\nx=2\n"));
    assert!(message.contains("actual:\nx=1\n"));
}

#[test]
fn test_same_query_checked_twice() {
    let query = assert_that().query("select name from hr.depts order by deptno");
    let expected = "name=Sales\nname=Marketing\nname=HR\n";
    query.returns(expected);
    query.returns(expected);
    assert!(query.try_throws("x").is_err());
    assert!(query.try_throws("x").is_err());
}

#[test]
fn test_explicit_regular_config_matches_default() {
    assert_that()
        .with(Config::Regular)
        .query("select count(*) as c from hr.emps")
        .returns("c=4\n");
}

#[test]
fn test_queries_on_several_threads() {
    let base = assert_that();
    let handles: Vec<_> = (1..=4)
        .map(|n| {
            let query = base.query(format!("select {} as n", n));
            std::thread::spawn(move || query.try_returns(&format!("n={}\n", n)))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
}
