//! The single error taxonomy surfaced to users.
//!
//! Every variant carries the source file name and line so the top-level
//! handler in `main.rs` can render `<filename>:<line>: error: <message>`,
//! matching the original interpreter's one-line fatal diagnostic.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub struct JayError {
    pub file: String,
    pub line: usize,
    pub kind: ErrorKind,
}

impl JayError {
    pub fn new(file: impl Into<String>, line: usize, kind: ErrorKind) -> Self {
        Self { file: file.into(), line, kind }
    }
}

impl fmt::Display for JayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: error: {}", self.file, self.line, self.kind)
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("expected {expected}, got {got}")]
    ExpectedToken { expected: String, got: String },
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("undefined function '{0}'")]
    UndefinedFunction(String),
    #[error("undefined class '{0}'")]
    UndefinedClass(String),
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("value of type '{0}' is not callable")]
    NotAFunction(String),
    #[error("cannot reassign constant '{0}'")]
    ConstReassign(String),
    #[error("cannot modify constant '{0}'")]
    ConstModify(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("'this' outside of a method")]
    ThisOutsideMethod,
    #[error("'super' outside of a method")]
    SuperOutsideMethod,
    #[error("cannot import '{0}'")]
    ImportFailed(String),
    #[error("assertion failed{}", .0.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    AssertionFailed(Option<String>),
    #[error("recursion limit exceeded")]
    StackOverflow,
    #[error("{0}")]
    Other(String),
}

pub type JayResult<T> = Result<T, JayError>;
