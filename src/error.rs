// ABOUTME: Error types for tokenizing, parsing, and evaluation failures

use thiserror::Error;

/// Every fallible interpreter operation reports one of these kinds. The
/// message text is what the user sees after `ERROR: ` at the prompt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed literal, unmatched bracket, unexpected EOF or token.
    #[error("{0}")]
    Syntax(String),

    /// No binding for a name in applicable position.
    #[error("Function, special-form, or macro expected for {0}. Nothing found.")]
    Unbound(String),

    /// Argument of the wrong kind.
    #[error("{0}")]
    Type(String),

    /// Argument count mismatch against a declared arity.
    #[error("Wrong number of arguments to {name}. Expected {expected} but got {got}.")]
    Arity {
        name: String,
        expected: i32,
        got: usize,
    },

    /// Index out of bounds, empty required list, misplaced unquote, and
    /// other value-range failures.
    #[error("{0}")]
    Domain(String),

    /// The cell pool is exhausted. Fatal at the top level.
    #[error("Could not allocate data object: the heap is exhausted")]
    OutOfMemory,
}

impl Error {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Error::Syntax(msg.into())
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Error::Type(msg.into())
    }

    pub fn domain(msg: impl Into<String>) -> Self {
        Error::Domain(msg.into())
    }

    pub fn arity(name: &str, expected: i32, got: usize) -> Self {
        Error::Arity {
            name: name.to_string(),
            expected,
            got,
        }
    }
}
