//! Error types for the behavior engine crate.

use thiserror::Error;

use crate::ast::ExpressionType;

pub type Result<T> = std::result::Result<T, BehaviorError>;

/// All errors produced while compiling behavior definitions or evaluating
/// nets against an event stream.
///
/// Compile-time variants carry the source line and column of the offending
/// construct. Merge conflicts between tokens are recoverable control flow
/// inside the enablement enumeration and only surface through
/// [`Token::merge`](crate::eval::Token::merge).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError {
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: u32,
        column: u32,
        message: String,
    },
    #[error("expected {expected} expression at {line}:{column} but found {found}")]
    TypeMismatch {
        line: u32,
        column: u32,
        expected: ExpressionType,
        found: ExpressionType,
    },
    #[error("unknown name `{name}` at {line}:{column}")]
    UnknownName {
        name: String,
        line: u32,
        column: u32,
    },
    #[error("duplicate name `{name}` at {line}:{column}")]
    DuplicateName {
        name: String,
        line: u32,
        column: u32,
    },
    #[error("invalid edge from `{from}` to `{to}` at {line}:{column}")]
    InvalidEdge {
        from: String,
        to: String,
        line: u32,
        column: u32,
    },
    #[error("variable `{0}` does not have a value")]
    UndefinedVariable(String),
    #[error("conflicting values for variable `{0}`")]
    ConflictingVariable(String),
    #[error("cannot interpret {0} as an integer")]
    NotAnInteger(String),
    #[error("cannot interpret {0} as a boolean")]
    NotABoolean(String),
    #[error("right hand side of `in` must be a range or a string, found {0}")]
    InvalidInOperand(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BehaviorError {
    fn from(err: std::io::Error) -> Self {
        BehaviorError::Io(err.to_string())
    }
}

impl BehaviorError {
    /// True for errors raised while compiling a behavior definition, as
    /// opposed to errors raised during stream evaluation.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            BehaviorError::Syntax { .. }
                | BehaviorError::TypeMismatch { .. }
                | BehaviorError::UnknownName { .. }
                | BehaviorError::DuplicateName { .. }
                | BehaviorError::InvalidEdge { .. }
        )
    }
}
