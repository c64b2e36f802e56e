//! Query-text parse errors.

use std::fmt;

/// An error raised while parsing a query line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line does not split into `RELATIONS|PREDICATES|SELECTIONS`.
    MissingPart { found: usize },
    /// A numeric field is not an unsigned decimal integer.
    InvalidNumber { token: String },
    /// A predicate token carries no comparison operator.
    InvalidPredicate { token: String },
    /// A column reference is not of the form `binding.column`.
    InvalidColumnRef { token: String },
    /// A column reference names a binding outside the query's FROM list.
    BindingOutOfRange { binding: usize, bindings: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingPart { found } => {
                write!(f, "expected 3 '|'-separated parts, found {found}")
            }
            ParseError::InvalidNumber { token } => {
                write!(f, "invalid number: {token:?}")
            }
            ParseError::InvalidPredicate { token } => {
                write!(f, "predicate {token:?} has no comparison operator")
            }
            ParseError::InvalidColumnRef { token } => {
                write!(f, "column reference {token:?} is not of the form binding.column")
            }
            ParseError::BindingOutOfRange { binding, bindings } => {
                write!(
                    f,
                    "binding {binding} is out of range (query declares {bindings} bindings)"
                )
            }
        }
    }
}

impl std::error::Error for ParseError {}
