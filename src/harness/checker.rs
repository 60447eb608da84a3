//! Outcome checkers
//!
//! A query outcome is judged by at most one checker: a result checker for
//! the serialized rows, or an exception checker for the captured failure.

use crate::error::{CheckFailure, CheckResult, DbError};
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::{self, Write};

/// A failure raised while a query executed
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    backtrace: Backtrace,
}

/// What the backend raised
#[derive(Debug)]
pub enum FailureKind {
    /// The connection returned an error
    Error(DbError),
    /// The connection panicked
    Panic(String),
}

impl Failure {
    pub fn from_error(err: DbError) -> Self {
        Self {
            kind: FailureKind::Error(err),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        Self {
            kind: FailureKind::Panic(message),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Full diagnostic text: message, cause chain, debug form and, when
    /// `RUST_BACKTRACE` is set, the stack at the point of capture.
    pub fn trace(&self) -> String {
        let mut out = String::new();
        match &self.kind {
            FailureKind::Error(err) => {
                let _ = writeln!(out, "{}", err);
                let mut source = err.source();
                while let Some(cause) = source {
                    let _ = writeln!(out, "Caused by: {}", cause);
                    source = cause.source();
                }
                let _ = writeln!(out, "{:?}", err);
            }
            FailureKind::Panic(message) => {
                let _ = writeln!(out, "panicked: {}", message);
            }
        }
        if self.backtrace.status() == BacktraceStatus::Captured {
            let _ = writeln!(out, "{}", self.backtrace);
        }
        out
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Error(err) => write!(f, "{}", err),
            FailureKind::Panic(message) => write!(f, "panicked: {}", message),
        }
    }
}

/// Judges the canonical serialization of a successful query
pub trait ResultCheck {
    fn check(&self, actual: &str) -> CheckResult;
}

impl<F> ResultCheck for F
where
    F: Fn(&str) -> CheckResult,
{
    fn check(&self, actual: &str) -> CheckResult {
        self(actual)
    }
}

/// Judges the failure of a query that was expected to fail.
///
/// `None` means the query succeeded.
pub trait ExceptionCheck {
    fn check(&self, failure: Option<&Failure>) -> CheckResult;
}

/// Requires the serialization to equal a literal exactly
#[derive(Debug, Clone)]
pub struct ExpectedText(pub String);

impl ResultCheck for ExpectedText {
    fn check(&self, actual: &str) -> CheckResult {
        if actual == self.0 {
            Ok(())
        } else {
            Err(CheckFailure::Mismatch {
                expected: self.0.clone(),
                actual: actual.to_string(),
            })
        }
    }
}

/// Requires a failure whose trace contains a literal (case-sensitive)
#[derive(Debug, Clone)]
pub struct ExpectedSubstring(pub String);

impl ExceptionCheck for ExpectedSubstring {
    fn check(&self, failure: Option<&Failure>) -> CheckResult {
        let Some(failure) = failure else {
            return Err(CheckFailure::UnexpectedSuccess {
                expected: self.0.clone(),
            });
        };
        let trace = failure.trace();
        if trace.contains(&self.0) {
            Ok(())
        } else {
            Err(CheckFailure::MissingSubstring {
                expected: self.0.clone(),
                trace,
            })
        }
    }
}

/// Which checker, if any, judges an execution
#[derive(Clone, Copy)]
pub enum Checker<'a> {
    /// Only require that the query does not fail
    None,
    /// Require success and judge the rows
    Result(&'a dyn ResultCheck),
    /// Require failure and judge the trace
    Exception(&'a dyn ExceptionCheck),
}
