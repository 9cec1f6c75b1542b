//! Error types for FHIRPath to SQL translation

use crate::dialect::DialectError;
use crate::generator::Arity;
use crate::parser::ParseError;
use thiserror::Error;

/// Result type for translation operations
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Errors surfaced by a translation call
///
/// Translation is all-or-nothing: when any of these is returned no SQL was produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// Unrecognised character in the source text
    #[error("Lexical error at position {position}: unexpected character '{character}'")]
    Lex {
        /// Byte offset of the character
        position: usize,
        /// The offending character
        character: char,
    },

    /// Grammar violation
    #[error("Parse error: {0}")]
    Parse(ParseError),

    /// Call of a function that is not in the function table
    #[error("Unknown function '{name}'")]
    UnknownFunction {
        /// Function name as written
        name: String,
    },

    /// Wrong number of arguments
    #[error("Function '{function}' expects {expected} argument(s), got {got}")]
    ArgumentCount {
        /// Function name
        function: String,
        /// Accepted argument counts
        expected: Arity,
        /// Number of arguments given
        got: usize,
    },

    /// Iteration variable used outside an iteration
    #[error("Context error: {message}")]
    Context {
        /// What was used where
        message: String,
    },

    /// Operator that cannot be applied to the given operands
    #[error("Unsupported operator '{operator}'")]
    UnsupportedOperator {
        /// Operator symbol
        operator: String,
    },

    /// Nesting exceeded the configured depth
    #[error("Expression nesting exceeds the limit of {limit}")]
    RecursionLimit {
        /// Configured maximum depth
        limit: usize,
    },

    /// The dialect lacks a required primitive
    #[error(transparent)]
    DialectCapability(#[from] DialectError),

    /// Argument of the right count but unusable form
    #[error("Invalid argument for '{function}': {message}")]
    InvalidArgument {
        /// Function name
        function: String,
        /// What is wrong with it
        message: String,
    },

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TranslationError {
    /// Create a context error
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }
}

impl From<ParseError> for TranslationError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnexpectedCharacter {
                position,
                character,
            } => Self::Lex {
                position,
                character,
            },
            ParseError::RecursionLimit { limit, .. } => Self::RecursionLimit { limit },
            other => Self::Parse(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_conversion() {
        let lex: TranslationError = ParseError::UnexpectedCharacter {
            position: 3,
            character: '#',
        }
        .into();
        assert_eq!(
            lex,
            TranslationError::Lex {
                position: 3,
                character: '#'
            }
        );

        let depth: TranslationError = ParseError::RecursionLimit {
            limit: 100,
            position: 0,
        }
        .into();
        assert_eq!(depth, TranslationError::RecursionLimit { limit: 100 });

        let grammar: TranslationError = ParseError::UnexpectedToken {
            position: 0,
            expected: "expression".into(),
            found: "')'".into(),
        }
        .into();
        assert!(matches!(grammar, TranslationError::Parse(_)));
    }

    #[test]
    fn test_argument_count_message() {
        let err = TranslationError::ArgumentCount {
            function: "upper".into(),
            expected: Arity::exactly(0),
            got: 1,
        };
        assert_eq!(
            err.to_string(),
            "Function 'upper' expects 0 argument(s), got 1"
        );
    }
}
