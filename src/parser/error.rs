//! Parser error types

use thiserror::Error;

/// Result type for tokenizer and parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while turning source text into an AST
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The tokenizer met a character that starts no token
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter {
        /// Byte offset of the character
        position: usize,
        /// The offending character
        character: char,
    },

    /// Unclosed string literal or block comment
    #[error("Unclosed {construct} starting at position {position}")]
    Unclosed {
        /// What was left open ("string literal", "comment", ...)
        construct: &'static str,
        /// Position where the construct started
        position: usize,
    },

    /// Grammar violation
    #[error("Expected {expected} at position {position}, found {found}")]
    UnexpectedToken {
        /// Byte offset of the offending token
        position: usize,
        /// Description of what the grammar allows here
        expected: String,
        /// Description of the token that was found
        found: String,
    },

    /// Invalid literal value
    #[error("Invalid {literal_type} literal at position {position}: {value}")]
    InvalidLiteral {
        /// Type of literal that failed to parse
        literal_type: &'static str,
        /// The invalid value that was encountered
        value: String,
        /// Position where the invalid literal was found
        position: usize,
    },

    /// Nesting exceeded the configured parser depth
    #[error("Expression nesting exceeds the limit of {limit} at position {position}")]
    RecursionLimit {
        /// Configured maximum depth
        limit: usize,
        /// Position where the limit was hit
        position: usize,
    },
}

impl ParseError {
    /// Byte offset the error refers to
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnexpectedCharacter { position, .. }
            | ParseError::Unclosed { position, .. }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::InvalidLiteral { position, .. }
            | ParseError::RecursionLimit { position, .. } => *position,
        }
    }

    /// True for errors produced by the tokenizer rather than the grammar
    pub fn is_lex_error(&self) -> bool {
        matches!(
            self,
            ParseError::UnexpectedCharacter { .. } | ParseError::Unclosed { .. }
        )
    }
}
