//! Error types for building and evaluating expressions.

use thiserror::Error;

use crate::types::Type;

/// Raised while constructing or rescoping an expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// Operands have no common ordered type.
    #[error("{lhs} and {rhs} are incompatible")]
    Incompatible { lhs: String, rhs: String },
    #[error("{0} is not numeric")]
    NotNumeric(String),
    #[error("{0} is not boolean")]
    NotBoolean(String),
    #[error("no field `{name}` visible from `{scope}`")]
    UnknownReference { name: String, scope: String },
    /// A typed expression was built over a node of the wrong type.
    #[error("expected {expected} expression, found {found} in `{expression}`")]
    WrongType {
        expected: &'static str,
        found: Type,
        expression: String,
    },
}

/// Raised while evaluating an expression against a resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unresolved reference `{0}`")]
    Unresolved(String),
    #[error("expected {expected} value, found {found}")]
    TypeMismatch { expected: &'static str, found: Type },
    #[error("cannot compare {lhs} with {rhs}")]
    Incomparable { lhs: Type, rhs: Type },
    #[error("division by zero in `{0}`")]
    DivisionByZero(String),
    #[error("arithmetic overflow in `{0}`")]
    Overflow(String),
    #[error("negative exponent in `{0}`")]
    NegativeExponent(String),
}

/// A query was made on an expression form that cannot answer it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported expression operation: {0}")]
pub struct UnsupportedOperation(pub String);
