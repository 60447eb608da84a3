//! Assertion harness
//!
//! Chains a backend selection to a query to exactly one terminal check:
//! - [`assert`]: the fluent `AssertThat` / `AssertQuery` builder
//! - [`config`]: named backend configurations and their factory
//! - [`executor`]: single-query execution and canonical serialization
//! - [`checker`]: result and exception checkers

pub mod assert;
pub mod checker;
pub mod config;
pub mod executor;

pub use assert::{AssertQuery, AssertThat, assert_that};
pub use checker::{Checker, ExceptionCheck, ExpectedSubstring, ExpectedText, Failure, ResultCheck};
pub use config::{Config, ConfigConnectionFactory};
