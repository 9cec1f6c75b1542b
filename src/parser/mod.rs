//! FHIRPath expression parser
//!
//! Turns source text into a token stream and the token stream into a single
//! [`ExpressionNode`](crate::ast::ExpressionNode) root.

pub mod error;
pub mod pratt;
pub mod span;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use pratt::{
    DEFAULT_MAX_DEPTH, PrattParser, Precedence, parse, parse_expression,
    parse_expression_with_depth,
};
pub use span::Spanned;
pub use tokenizer::{Token, Tokenizer, tokenize};
