//! Pratt parser for FHIRPath expressions
//!
//! Works over a fully tokenized slice with an explicit cursor:
//! - every grammar alternative is a `Result`-returning function
//! - binary operators are driven by a single precedence table
//! - nesting is bounded by an explicit depth counter

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use super::tokenizer::{Token, tokenize};
use crate::ast::{BinaryOperator, ContextVariable, ExpressionNode, LiteralValue, UnaryOperator};
use smallvec::SmallVec;

/// Default nesting limit for the expression tree, operator and indexer chains included
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Calendar duration keywords accepted as unquoted quantity units
const CALENDAR_UNITS: &[&str] = &[
    "year",
    "years",
    "month",
    "months",
    "week",
    "weeks",
    "day",
    "days",
    "hour",
    "hours",
    "minute",
    "minutes",
    "second",
    "seconds",
    "millisecond",
    "milliseconds",
];

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Lowest precedence - or, xor, implies
    Or = 1,
    /// Logical AND
    And = 2,
    /// Membership operators (in, contains)
    Membership = 3,
    /// Equality operators (=, !=, ~, !~)
    Equality = 4,
    /// Inequality operators (<, >, <=, >=)
    Inequality = 5,
    /// Union operator (|)
    Union = 6,
    /// Additive operators (+, -, &)
    Additive = 7,
    /// Multiplicative operators (*, /, div, mod)
    Multiplicative = 8,
    /// Power operator (^), right associative
    Power = 9,
    /// Unary operators (+, -, not)
    Unary = 10,
    /// Invocation/Indexing (., [])
    Invocation = 11,
}

impl Precedence {
    /// Get the next higher precedence level for left-associative operators
    #[inline(always)]
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Membership,
            Precedence::Membership => Precedence::Equality,
            Precedence::Equality => Precedence::Inequality,
            Precedence::Inequality => Precedence::Union,
            Precedence::Union => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Power,
            Precedence::Power => Precedence::Unary,
            Precedence::Unary => Precedence::Invocation,
            Precedence::Invocation => Precedence::Invocation,
        }
    }

    /// Check if this precedence is right associative
    #[inline(always)]
    pub const fn is_right_associative(self) -> bool {
        matches!(self, Precedence::Power)
    }
}

/// Precedence of a token in infix position
#[inline(always)]
fn get_precedence(token: &Token<'_>) -> Option<Precedence> {
    match token {
        Token::Equal | Token::NotEqual | Token::Equivalent | Token::NotEquivalent => {
            Some(Precedence::Equality)
        }
        Token::Plus | Token::Minus | Token::Ampersand => Some(Precedence::Additive),
        Token::And => Some(Precedence::And),
        Token::Or | Token::Xor | Token::Implies => Some(Precedence::Or),
        Token::Multiply | Token::Divide | Token::Div | Token::Mod => {
            Some(Precedence::Multiplicative)
        }
        Token::Power => Some(Precedence::Power),
        Token::LessThan
        | Token::LessThanOrEqual
        | Token::GreaterThan
        | Token::GreaterThanOrEqual => Some(Precedence::Inequality),
        Token::In | Token::Contains => Some(Precedence::Membership),
        Token::Union => Some(Precedence::Union),
        _ => None,
    }
}

#[inline(always)]
fn token_to_binary_op(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        Token::And => Some(BinaryOperator::And),
        Token::Or => Some(BinaryOperator::Or),
        Token::Equivalent => Some(BinaryOperator::Equivalent),
        Token::NotEquivalent => Some(BinaryOperator::NotEquivalent),
        Token::LessThan => Some(BinaryOperator::LessThan),
        Token::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
        Token::GreaterThan => Some(BinaryOperator::GreaterThan),
        Token::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
        Token::In => Some(BinaryOperator::In),
        Token::Contains => Some(BinaryOperator::Contains),
        Token::Multiply => Some(BinaryOperator::Multiply),
        Token::Divide => Some(BinaryOperator::Divide),
        Token::Div => Some(BinaryOperator::IntegerDivide),
        Token::Mod => Some(BinaryOperator::Modulo),
        Token::Power => Some(BinaryOperator::Power),
        Token::Union => Some(BinaryOperator::Union),
        Token::Ampersand => Some(BinaryOperator::Concatenate),
        Token::Xor => Some(BinaryOperator::Xor),
        Token::Implies => Some(BinaryOperator::Implies),
        _ => None,
    }
}

/// Pratt parser over a token slice
///
/// Precedence levels (highest to lowest):
/// - **Invocation**: `.`, `[]`
/// - **Unary**: `+`, `-`, `not`
/// - **Power**: `^` (right associative)
/// - **Multiplicative**: `*`, `/`, `div`, `mod`
/// - **Additive**: `+`, `-`, `&`
/// - **Union**: `|`
/// - **Inequality**: `<`, `>`, `<=`, `>=`
/// - **Equality**: `=`, `!=`, `~`, `!~`
/// - **Membership**: `in`, `contains`
/// - **And**: `and`
/// - **Or**: `or`, `xor`, `implies`
pub struct PrattParser<'t, 'input> {
    tokens: &'t [Spanned<Token<'input>>],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'t, 'input> PrattParser<'t, 'input> {
    /// Create a parser with the default depth limit
    pub fn new(tokens: &'t [Spanned<Token<'input>>]) -> Self {
        Self::with_max_depth(tokens, DEFAULT_MAX_DEPTH)
    }

    /// Create a parser with a custom depth limit
    pub fn with_max_depth(tokens: &'t [Spanned<Token<'input>>], max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    #[inline(always)]
    fn current(&self) -> &Token<'input> {
        self.tokens
            .get(self.pos)
            .map(|t| &t.value)
            .unwrap_or(&Token::Eof)
    }

    /// Byte offset of the current token
    fn position(&self) -> usize {
        match self.tokens.get(self.pos) {
            Some(token) => token.start,
            None => self.tokens.last().map(|t| t.end).unwrap_or(0),
        }
    }

    #[inline(always)]
    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::UnexpectedToken {
            position: self.position(),
            expected: expected.into(),
            found: self.current().to_string(),
        }
    }

    /// Consume the current token if it has the same kind as `expected`
    fn expect(&mut self, expected: Token<'static>) -> ParseResult<()> {
        if std::mem::discriminant(self.current()) == std::mem::discriminant(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected.to_string()))
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::RecursionLimit {
                limit: self.max_depth,
                position: self.position(),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Parse primary expression (literals, identifiers, parenthesized expressions)
    fn parse_primary(&mut self) -> ParseResult<ExpressionNode> {
        let position = self.position();
        match *self.current() {
            Token::Identifier(name) => {
                self.advance();
                if matches!(self.current(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(ExpressionNode::identifier(name))
                }
            }

            Token::Integer(value) => {
                self.advance();
                match self.parse_quantity_unit() {
                    Some(unit) => Ok(ExpressionNode::literal(LiteralValue::Quantity {
                        value: value.to_string(),
                        unit,
                    })),
                    None => Ok(ExpressionNode::literal(LiteralValue::Integer(value))),
                }
            }

            Token::Decimal(value) => {
                self.advance();
                match self.parse_quantity_unit() {
                    Some(unit) => Ok(ExpressionNode::literal(LiteralValue::Quantity {
                        value: value.to_string(),
                        unit,
                    })),
                    None => Ok(ExpressionNode::literal(LiteralValue::Decimal(
                        value.to_string(),
                    ))),
                }
            }

            Token::String(value) => {
                self.advance();
                let processed = process_string_escapes(value, position)?;
                Ok(ExpressionNode::literal(LiteralValue::String(processed)))
            }

            Token::True => {
                self.advance();
                Ok(ExpressionNode::literal(LiteralValue::Boolean(true)))
            }
            Token::False => {
                self.advance();
                Ok(ExpressionNode::literal(LiteralValue::Boolean(false)))
            }

            Token::Date(value) => {
                self.advance();
                Ok(ExpressionNode::literal(LiteralValue::Date(
                    value.trim_start_matches('@').to_string(),
                )))
            }
            Token::DateTime(value) => {
                self.advance();
                Ok(ExpressionNode::literal(LiteralValue::DateTime(
                    value.trim_start_matches('@').to_string(),
                )))
            }
            Token::Time(value) => {
                self.advance();
                Ok(ExpressionNode::literal(LiteralValue::Time(
                    value.trim_start_matches("@T").to_string(),
                )))
            }

            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression_with_precedence(Precedence::Or)?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }

            Token::LeftBrace => {
                self.advance();
                self.expect(Token::RightBrace)?;
                Ok(ExpressionNode::literal(LiteralValue::Empty))
            }

            Token::DollarThis => {
                self.advance();
                Ok(ExpressionNode::This)
            }
            Token::DollarIndex => {
                self.advance();
                Ok(ExpressionNode::variable(ContextVariable::Index))
            }
            Token::DollarTotal => {
                self.advance();
                Ok(ExpressionNode::variable(ContextVariable::Total))
            }

            Token::Minus => self.parse_unary(UnaryOperator::Negate),
            Token::Plus => self.parse_unary(UnaryOperator::Positive),
            Token::Not => self.parse_unary(UnaryOperator::Not),

            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_unary(&mut self, op: UnaryOperator) -> ParseResult<ExpressionNode> {
        self.advance();
        let operand = self.parse_expression_with_precedence(Precedence::Unary)?;
        Ok(ExpressionNode::unary_op(op, operand))
    }

    /// Unit following a numeric literal: a string or a calendar keyword
    fn parse_quantity_unit(&mut self) -> Option<String> {
        match *self.current() {
            Token::String(unit) => {
                self.advance();
                Some(unit.to_string())
            }
            Token::Identifier(unit) if CALENDAR_UNITS.contains(&unit) => {
                self.advance();
                Some(unit.to_string())
            }
            _ => None,
        }
    }

    /// Parse `name(args...)`; the current token is the opening parenthesis
    fn parse_function_call(&mut self, name: &str) -> ParseResult<ExpressionNode> {
        self.expect(Token::LeftParen)?;

        let mut args: SmallVec<[ExpressionNode; 4]> = SmallVec::new();

        if matches!(self.current(), Token::RightParen) {
            self.advance();
            return Ok(ExpressionNode::function_call(name, args));
        }

        loop {
            args.push(self.parse_expression_with_precedence(Precedence::Or)?);

            match self.current() {
                Token::Comma => self.advance(),
                Token::RightParen => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("',' or ')' in function arguments")),
            }
        }

        Ok(ExpressionNode::function_call(name, args))
    }

    /// Parse postfix navigation and indexing into a flat segment list
    ///
    /// Every indexer nests the tree one level and is counted against the
    /// depth limit; `nested` receives the number of levels added.
    fn parse_postfix(
        &mut self,
        first: ExpressionNode,
        nested: &mut usize,
    ) -> ParseResult<ExpressionNode> {
        let mut segments = vec![first];

        loop {
            match self.current() {
                Token::Dot => {
                    self.advance();
                    let name = self.parse_member_name()?;
                    let segment = if matches!(self.current(), Token::LeftParen) {
                        self.parse_function_call(name)?
                    } else {
                        ExpressionNode::identifier(name)
                    };
                    segments.push(segment);
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression_with_precedence(Precedence::Or)?;
                    self.expect(Token::RightBracket)?;
                    self.enter()?;
                    *nested += 1;
                    // segments always holds at least the primary expression
                    if let Some(target) = segments.pop() {
                        segments.push(ExpressionNode::indexer(target, index));
                    }
                }
                _ => break,
            }
        }

        if segments.len() == 1 {
            Ok(segments.remove(0))
        } else {
            Ok(ExpressionNode::path(segments))
        }
    }

    /// Member name after a dot; keywords such as `not` and `contains` are allowed
    fn parse_member_name(&mut self) -> ParseResult<&'input str> {
        let name = match *self.current() {
            Token::Identifier(name) => name,
            ref token => match token.keyword_text() {
                Some(text) if !matches!(token, Token::True | Token::False) => text,
                _ => return Err(self.unexpected("identifier after '.'")),
            },
        };
        self.advance();
        Ok(name)
    }

    /// Core Pratt parsing loop
    fn parse_expression_with_precedence(
        &mut self,
        min_precedence: Precedence,
    ) -> ParseResult<ExpressionNode> {
        self.enter()?;

        // levels this call adds on top of its own frame
        let mut nested = 0;
        let primary = self.parse_primary()?;
        let mut left = self.parse_postfix(primary, &mut nested)?;

        loop {
            let token = self.current();
            let precedence = match get_precedence(token) {
                Some(prec) if prec >= min_precedence => prec,
                _ => break,
            };
            let op = token_to_binary_op(token).ok_or_else(|| self.unexpected("binary operator"))?;

            self.advance();

            let next_min_precedence = if precedence.is_right_associative() {
                precedence
            } else {
                precedence.next_level()
            };

            let right = self.parse_expression_with_precedence(next_min_precedence)?;
            self.enter()?;
            nested += 1;
            left = ExpressionNode::binary_op(op, left, right);
        }

        self.depth = self.depth.saturating_sub(nested);
        self.leave();
        Ok(left)
    }

    /// Parse complete input; trailing tokens are an error
    pub fn parse(&mut self) -> ParseResult<ExpressionNode> {
        let expr = self.parse_expression_with_precedence(Precedence::Or)?;

        if !matches!(self.current(), Token::Eof) {
            return Err(self.unexpected("end of input"));
        }

        Ok(expr)
    }
}

/// Decode escape sequences in string literals, including `\uXXXX`
fn process_string_escapes(input: &str, position: usize) -> ParseResult<String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars();

    let invalid = |value: String| ParseError::InvalidLiteral {
        literal_type: "string",
        value,
        position,
    };

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('f') => result.push('\u{000C}'),
            Some('\\') => result.push('\\'),
            Some('\'') => result.push('\''),
            Some('"') => result.push('"'),
            Some('`') => result.push('`'),
            Some('/') => result.push('/'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = (hex.len() == 4)
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32)
                    .ok_or_else(|| invalid(format!("\\u{hex}")))?;
                result.push(decoded);
            }
            // Unknown escape sequence - kept literally
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => return Err(invalid("\\".to_string())),
        }
    }

    Ok(result)
}

/// Parse a token stream produced by [`tokenize`] into one AST root
pub fn parse(tokens: &[Spanned<Token<'_>>]) -> ParseResult<ExpressionNode> {
    PrattParser::new(tokens).parse()
}

/// Tokenize and parse an expression with the default depth limit
pub fn parse_expression(input: &str) -> ParseResult<ExpressionNode> {
    parse_expression_with_depth(input, DEFAULT_MAX_DEPTH)
}

/// Tokenize and parse an expression with a custom depth limit
pub fn parse_expression_with_depth(input: &str, max_depth: usize) -> ParseResult<ExpressionNode> {
    let tokens = tokenize(input)?;
    PrattParser::with_max_depth(&tokens, max_depth).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> ExpressionNode {
        ExpressionNode::identifier(name)
    }

    #[test]
    fn test_precedence_ordering() {
        assert!(Precedence::Multiplicative > Precedence::Additive);
        assert!(Precedence::Power > Precedence::Multiplicative);
        assert!(Precedence::Additive > Precedence::Equality);
        assert!(Precedence::Equality > Precedence::And);
        assert!(Precedence::And > Precedence::Or);
        assert_eq!(get_precedence(&Token::Implies), Some(Precedence::Or));
        assert_eq!(get_precedence(&Token::Xor), Some(Precedence::Or));
    }

    #[test]
    fn test_basic_expressions() {
        assert_eq!(parse_expression("Patient").unwrap(), ident("Patient"));

        let result = parse_expression("Patient.name.family").unwrap();
        assert_eq!(
            result,
            ExpressionNode::path(vec![ident("Patient"), ident("name"), ident("family")])
        );

        let result = parse_expression("2 + 3 * 4").unwrap();
        let ExpressionNode::BinaryOp(data) = result else {
            panic!("Expected addition with multiplication on right");
        };
        assert_eq!(data.op, BinaryOperator::Add);
        assert_eq!(data.left, ExpressionNode::literal(LiteralValue::Integer(2)));
        assert!(matches!(
            &data.right,
            ExpressionNode::BinaryOp(inner) if inner.op == BinaryOperator::Multiply
        ));
    }

    #[test]
    fn test_associativity() {
        let result = parse_expression("a implies b implies c").unwrap();
        let ExpressionNode::BinaryOp(data) = result else {
            panic!("Expected left-associative implies");
        };
        assert_eq!(data.op, BinaryOperator::Implies);
        assert!(matches!(
            &data.left,
            ExpressionNode::BinaryOp(inner) if inner.op == BinaryOperator::Implies
        ));
        assert_eq!(data.right, ident("c"));

        let result = parse_expression("a implies b or c").unwrap();
        let ExpressionNode::BinaryOp(data) = result else {
            panic!("Expected or at the root");
        };
        assert_eq!(data.op, BinaryOperator::Or);
        assert!(matches!(
            &data.left,
            ExpressionNode::BinaryOp(inner) if inner.op == BinaryOperator::Implies
        ));

        let result = parse_expression("a - b - c").unwrap();
        let ExpressionNode::BinaryOp(data) = result else {
            panic!("Expected left-associative subtraction");
        };
        assert!(matches!(
            &data.left,
            ExpressionNode::BinaryOp(inner) if inner.op == BinaryOperator::Subtract
        ));
        assert_eq!(data.right, ident("c"));
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(
            parse_expression("exists()").unwrap(),
            ExpressionNode::function_call("exists", vec![])
        );

        let result = parse_expression("Patient.name.where(use = 'official')").unwrap();
        let ExpressionNode::Path { segments } = result else {
            panic!("Expected path");
        };
        assert_eq!(segments.len(), 3);
        assert!(matches!(&segments[2], ExpressionNode::FunctionCall(f) if f.name == "where"));
    }

    #[test]
    fn test_indexer_attaches_to_preceding_segment() {
        assert_eq!(
            parse_expression("name[0]").unwrap(),
            ExpressionNode::indexer(ident("name"), ExpressionNode::literal(LiteralValue::Integer(0)))
        );

        let result = parse_expression("Patient.name[1].given").unwrap();
        assert_eq!(
            result,
            ExpressionNode::path(vec![
                ident("Patient"),
                ExpressionNode::indexer(
                    ident("name"),
                    ExpressionNode::literal(LiteralValue::Integer(1))
                ),
                ident("given"),
            ])
        );
    }

    #[test]
    fn test_keyword_member_names() {
        let result = parse_expression("active.not()").unwrap();
        assert_eq!(
            result,
            ExpressionNode::path(vec![ident("active"), ExpressionNode::function_call("not", vec![])])
        );
        assert!(parse_expression("name.contains('x')").is_ok());
        assert!(parse_expression("name.true").is_err());
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(
            parse_expression("-5").unwrap(),
            ExpressionNode::unary_op(
                UnaryOperator::Negate,
                ExpressionNode::literal(LiteralValue::Integer(5))
            )
        );
        let result = parse_expression("not active and deceased").unwrap();
        let ExpressionNode::BinaryOp(data) = result else {
            panic!("Expected and");
        };
        assert!(matches!(data.left, ExpressionNode::UnaryOp { op: UnaryOperator::Not, .. }));
    }

    #[test]
    fn test_membership_binds_looser_than_equality() {
        let result = parse_expression("a = b in c").unwrap();
        let ExpressionNode::BinaryOp(data) = result else {
            panic!("Expected in");
        };
        assert_eq!(data.op, BinaryOperator::In);
    }

    #[test]
    fn test_quantities_and_empty() {
        assert_eq!(
            parse_expression("5 'mg'").unwrap(),
            ExpressionNode::literal(LiteralValue::Quantity {
                value: "5".into(),
                unit: "mg".into()
            })
        );
        assert_eq!(
            parse_expression("2 days").unwrap(),
            ExpressionNode::literal(LiteralValue::Quantity {
                value: "2".into(),
                unit: "days".into()
            })
        );
        assert_eq!(
            parse_expression("{}").unwrap(),
            ExpressionNode::literal(LiteralValue::Empty)
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            parse_expression(r"'it\'s A'").unwrap(),
            ExpressionNode::literal(LiteralValue::String("it's A".into()))
        );
        assert!(parse_expression(r"'\u00'").is_err());
    }

    #[test]
    fn test_malformed_input_reports_position() {
        let err = parse_expression("name.where(use = )").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { position: 17, .. }));

        let err = parse_expression("name family").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedToken {
                position: 5,
                expected: "end of input".into(),
                found: "identifier 'family'".into(),
            }
        );

        assert!(parse_expression("").is_err());
        assert!(parse_expression("(name").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(150), ")".repeat(150));
        let err = parse_expression(&deep).unwrap_err();
        assert!(matches!(err, ParseError::RecursionLimit { limit: 100, .. }));
        assert!(parse_expression_with_depth(&deep, 200).is_ok());
    }

    #[test]
    fn test_operator_chains_count_towards_depth() {
        let chain = format!("1{}", " + 1".repeat(20_000));
        assert!(matches!(
            parse_expression(&chain).unwrap_err(),
            ParseError::RecursionLimit { limit: 100, .. }
        ));

        let short = format!("1{}", " + 1".repeat(50));
        assert!(parse_expression(&short).is_ok());
    }

    #[test]
    fn test_indexer_chains_count_towards_depth() {
        let chain = format!("name{}", "[0]".repeat(20_000));
        assert!(matches!(
            parse_expression(&chain).unwrap_err(),
            ParseError::RecursionLimit { limit: 100, .. }
        ));
        assert!(parse_expression(&format!("name{}", "[0]".repeat(50))).is_ok());
    }
}
