//! Tokenizer for FHIRPath expressions
//!
//! Produces zero-copy tokens over the source bytes:
//! - string, decimal and temporal literals borrow their text from the input
//! - keywords are resolved through a shared hash table
//! - every token carries its exact byte span, and the stream always ends in [`Token::Eof`]

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::fmt;

/// Token produced by the tokenizer
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    // Literals
    /// Integer literal (e.g., 42, 123)
    Integer(i64),
    /// Decimal literal as string slice, parsed on demand (e.g., 3.14, 0.5)
    Decimal(&'input str),
    /// String literal content between the quotes, escapes still encoded
    String(&'input str),
    /// Date literal including the leading '@' (e.g., @2023-01-01)
    Date(&'input str),
    /// DateTime literal including the leading '@' (e.g., @2023-01-01T12:00:00)
    DateTime(&'input str),
    /// Time literal including the leading '@' (e.g., @T12:00:00)
    Time(&'input str),

    /// Identifier, including backtick-delimited ones (without the backticks)
    Identifier(&'input str),

    // Operators
    /// Addition operator (+)
    Plus,
    /// Subtraction operator (-)
    Minus,
    /// Multiplication operator (*)
    Multiply,
    /// Division operator (/)
    Divide,
    /// Power operator (^)
    Power,
    /// Modulo operator (mod keyword)
    Mod,
    /// Integer division operator (div keyword)
    Div,
    /// Equality operator (=)
    Equal,
    /// Inequality operator (!=)
    NotEqual,
    /// Less than operator (<)
    LessThan,
    /// Less than or equal operator (<=)
    LessThanOrEqual,
    /// Greater than operator (>)
    GreaterThan,
    /// Greater than or equal operator (>=)
    GreaterThanOrEqual,
    /// Equivalence operator (~)
    Equivalent,
    /// Non-equivalence operator (!~)
    NotEquivalent,
    /// Logical AND operator (and keyword)
    And,
    /// Logical OR operator (or keyword)
    Or,
    /// Logical XOR operator (xor keyword)
    Xor,
    /// Logical implication operator (implies keyword)
    Implies,
    /// Logical NOT operator (not keyword)
    Not,
    /// Union operator (|)
    Union,
    /// Membership operator (in keyword)
    In,
    /// Containership operator (contains keyword)
    Contains,
    /// String concatenation operator (&)
    Ampersand,

    // Punctuation
    /// Left parenthesis (
    LeftParen,
    /// Right parenthesis )
    RightParen,
    /// Left square bracket [
    LeftBracket,
    /// Right square bracket ]
    RightBracket,
    /// Left curly brace {
    LeftBrace,
    /// Right curly brace }
    RightBrace,
    /// Dot operator (.) for property access
    Dot,
    /// Comma separator (,)
    Comma,

    // Special variables
    /// $this, the current iteration element
    DollarThis,
    /// $index, the 0-based position of the current iteration element
    DollarIndex,
    /// $total, the size of the collection being iterated
    DollarTotal,
    /// Boolean literal true
    True,
    /// Boolean literal false
    False,

    /// End of input
    Eof,
}

impl<'input> Token<'input> {
    /// Check if this token is a reserved word
    #[inline]
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::True
                | Token::False
                | Token::And
                | Token::Or
                | Token::Xor
                | Token::Implies
                | Token::Not
                | Token::In
                | Token::Contains
                | Token::Div
                | Token::Mod
        )
    }

    /// Get identifier string if this token is an identifier
    #[inline]
    pub fn as_identifier(&self) -> Option<&'input str> {
        match self {
            Token::Identifier(s) => Some(s),
            _ => None,
        }
    }

    /// Keyword spelling usable as a member name after a dot (`.not()`, `.contains('x')`)
    pub fn keyword_text(&self) -> Option<&'static str> {
        KEYWORDS
            .iter()
            .find(|(_, token)| token == self)
            .map(|(text, _)| *text)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.keyword_text() {
            return write!(f, "'{text}'");
        }
        match self {
            Token::Integer(v) => write!(f, "integer {v}"),
            Token::Decimal(s) => write!(f, "decimal {s}"),
            Token::String(s) => write!(f, "string '{s}'"),
            Token::Date(s) | Token::DateTime(s) | Token::Time(s) => write!(f, "{s}"),
            Token::Identifier(s) => write!(f, "identifier '{s}'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Multiply => write!(f, "'*'"),
            Token::Divide => write!(f, "'/'"),
            Token::Power => write!(f, "'^'"),
            Token::Equal => write!(f, "'='"),
            Token::NotEqual => write!(f, "'!='"),
            Token::LessThan => write!(f, "'<'"),
            Token::LessThanOrEqual => write!(f, "'<='"),
            Token::GreaterThan => write!(f, "'>'"),
            Token::GreaterThanOrEqual => write!(f, "'>='"),
            Token::Equivalent => write!(f, "'~'"),
            Token::NotEquivalent => write!(f, "'!~'"),
            Token::Union => write!(f, "'|'"),
            Token::Ampersand => write!(f, "'&'"),
            Token::LeftParen => write!(f, "'('"),
            Token::RightParen => write!(f, "')'"),
            Token::LeftBracket => write!(f, "'['"),
            Token::RightBracket => write!(f, "']'"),
            Token::LeftBrace => write!(f, "'{{'"),
            Token::RightBrace => write!(f, "'}}'"),
            Token::Dot => write!(f, "'.'"),
            Token::Comma => write!(f, "','"),
            Token::DollarThis => write!(f, "'$this'"),
            Token::DollarIndex => write!(f, "'$index'"),
            Token::DollarTotal => write!(f, "'$total'"),
            Token::Eof => write!(f, "end of input"),
            // keywords were handled above
            _ => write!(f, "{self:?}"),
        }
    }
}

/// Reserved words, in lookup order for [`Token::keyword_text`]
const KEYWORDS: [(&str, Token<'static>); 11] = [
    ("true", Token::True),
    ("false", Token::False),
    ("and", Token::And),
    ("or", Token::Or),
    ("xor", Token::Xor),
    ("implies", Token::Implies),
    ("not", Token::Not),
    ("in", Token::In),
    ("contains", Token::Contains),
    ("div", Token::Div),
    ("mod", Token::Mod),
];

/// Shared keyword lookup table
static KEYWORD_TABLE: Lazy<FxHashMap<&'static str, Token<'static>>> =
    Lazy::new(|| KEYWORDS.iter().cloned().collect());

/// Byte-oriented tokenizer over a FHIRPath source string
#[derive(Clone)]
pub struct Tokenizer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
    end: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a new tokenizer
    #[inline]
    pub fn new(input: &'input str) -> Self {
        let bytes = input.as_bytes();
        Self {
            input,
            bytes,
            pos: 0,
            end: bytes.len(),
        }
    }

    /// Get input string slice from byte positions
    #[inline(always)]
    fn slice(&self, start: usize, end: usize) -> &'input str {
        self.input.get(start..end).unwrap_or("")
    }

    #[inline(always)]
    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    #[inline(always)]
    fn is_id_start(ch: u8) -> bool {
        matches!(ch, b'A'..=b'Z' | b'a'..=b'z' | b'_')
    }

    #[inline(always)]
    fn is_id_continue(ch: u8) -> bool {
        matches!(ch, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_')
    }

    /// Character at the current position, for error reporting
    fn current_char(&self) -> char {
        self.input
            .get(self.pos..)
            .and_then(|rest| rest.chars().next())
            .unwrap_or('\0')
    }

    /// Integer or decimal literal; a decimal needs digits after the '.'
    fn parse_number(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        while self.pos < self.end && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }

        let is_decimal = self.peek_byte(0) == Some(b'.')
            && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit());

        if is_decimal {
            self.pos += 1;
            while self.pos < self.end && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
            return Ok(Token::Decimal(self.slice(start, self.pos)));
        }

        let text = self.slice(start, self.pos);
        text.parse::<i64>()
            .map(Token::Integer)
            .map_err(|_| ParseError::InvalidLiteral {
                literal_type: "integer",
                value: text.to_string(),
                position: start,
            })
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.end {
            match self.bytes[self.pos] {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn skip_single_line_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.end && !matches!(self.bytes[self.pos], b'\n' | b'\r') {
            self.pos += 1;
        }
    }

    fn skip_multi_line_comment(&mut self) -> ParseResult<()> {
        let start = self.pos;
        self.pos += 2;
        while self.pos + 1 < self.end {
            if self.bytes[self.pos] == b'*' && self.bytes[self.pos + 1] == b'/' {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(ParseError::Unclosed {
            construct: "comment",
            position: start,
        })
    }

    /// Whitespace and comments between tokens
    fn skip_trivia(&mut self) -> ParseResult<()> {
        loop {
            self.skip_whitespace();
            match (self.peek_byte(0), self.peek_byte(1)) {
                (Some(b'/'), Some(b'/')) => self.skip_single_line_comment(),
                (Some(b'/'), Some(b'*')) => self.skip_multi_line_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn parse_identifier(&mut self) -> &'input str {
        let start = self.pos;
        while self.pos < self.end && Self::is_id_continue(self.bytes[self.pos]) {
            self.pos += 1;
        }
        self.slice(start, self.pos)
    }

    /// Quoted text up to the matching `quote` byte; a backslash protects the next byte
    fn parse_quoted(&mut self, quote: u8, construct: &'static str) -> ParseResult<&'input str> {
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;

        while self.pos < self.end {
            match self.bytes[self.pos] {
                b if b == quote => {
                    let content = self.slice(start, self.pos);
                    self.pos += 1;
                    return Ok(content);
                }
                b'\\' => {
                    self.pos += if self.pos + 1 < self.end { 2 } else { 1 };
                }
                _ => self.pos += 1,
            }
        }

        Err(ParseError::Unclosed {
            construct,
            position: open,
        })
    }

    /// `$this`, `$index` or `$total`
    fn parse_dollar_variable(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        self.pos += 1;
        let name = self.parse_identifier();
        match name {
            "this" => Ok(Token::DollarThis),
            "index" => Ok(Token::DollarIndex),
            "total" => Ok(Token::DollarTotal),
            _ => {
                self.pos = start;
                Err(ParseError::UnexpectedCharacter {
                    position: start,
                    character: '$',
                })
            }
        }
    }

    /// Next token, or `None` once the input is exhausted
    pub fn next_token(&mut self) -> ParseResult<Option<Token<'input>>> {
        self.skip_trivia()?;
        if self.pos >= self.end {
            return Ok(None);
        }

        let token = match self.bytes[self.pos] {
            b'.' => {
                self.pos += 1;
                Token::Dot
            }
            b'(' => {
                self.pos += 1;
                Token::LeftParen
            }
            b')' => {
                self.pos += 1;
                Token::RightParen
            }
            b',' => {
                self.pos += 1;
                Token::Comma
            }
            b'[' => {
                self.pos += 1;
                Token::LeftBracket
            }
            b']' => {
                self.pos += 1;
                Token::RightBracket
            }
            b'{' => {
                self.pos += 1;
                Token::LeftBrace
            }
            b'}' => {
                self.pos += 1;
                Token::RightBrace
            }
            b'=' => {
                self.pos += 1;
                Token::Equal
            }
            b'+' => {
                self.pos += 1;
                Token::Plus
            }
            b'-' => {
                self.pos += 1;
                Token::Minus
            }
            b'*' => {
                self.pos += 1;
                Token::Multiply
            }
            b'/' => {
                self.pos += 1;
                Token::Divide
            }
            b'^' => {
                self.pos += 1;
                Token::Power
            }
            b'|' => {
                self.pos += 1;
                Token::Union
            }
            b'&' => {
                self.pos += 1;
                Token::Ampersand
            }
            b'~' => {
                self.pos += 1;
                Token::Equivalent
            }
            b'<' => {
                if self.peek_byte(1) == Some(b'=') {
                    self.pos += 2;
                    Token::LessThanOrEqual
                } else {
                    self.pos += 1;
                    Token::LessThan
                }
            }
            b'>' => {
                if self.peek_byte(1) == Some(b'=') {
                    self.pos += 2;
                    Token::GreaterThanOrEqual
                } else {
                    self.pos += 1;
                    Token::GreaterThan
                }
            }
            b'!' => match self.peek_byte(1) {
                Some(b'=') => {
                    self.pos += 2;
                    Token::NotEqual
                }
                Some(b'~') => {
                    self.pos += 2;
                    Token::NotEquivalent
                }
                _ => {
                    return Err(ParseError::UnexpectedCharacter {
                        position: self.pos,
                        character: '!',
                    });
                }
            },
            b'$' => self.parse_dollar_variable()?,
            b'0'..=b'9' => self.parse_number()?,
            b'\'' => Token::String(self.parse_quoted(b'\'', "string literal")?),
            b'"' => Token::String(self.parse_quoted(b'"', "string literal")?),
            b'`' => Token::Identifier(self.parse_quoted(b'`', "delimited identifier")?),
            b'@' => self.parse_datetime_literal()?,
            ch if Self::is_id_start(ch) => {
                let ident = self.parse_identifier();
                KEYWORD_TABLE
                    .get(ident)
                    .cloned()
                    .unwrap_or(Token::Identifier(ident))
            }
            _ => {
                return Err(ParseError::UnexpectedCharacter {
                    position: self.pos,
                    character: self.current_char(),
                });
            }
        };

        Ok(Some(token))
    }

    /// Tokenize the whole input with exact spans, appending [`Token::Eof`]
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::with_capacity(32);

        loop {
            self.skip_trivia()?;
            let start = self.pos;
            match self.next_token()? {
                Some(token) => tokens.push(Spanned::new(token, start, self.pos)),
                None => break,
            }
        }

        tokens.push(Spanned::new(Token::Eof, self.end, self.end));
        Ok(tokens)
    }

    /// Date, DateTime or Time literal starting at '@'
    fn parse_datetime_literal(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        self.pos += 1;

        if self.peek_byte(0) == Some(b'T') {
            self.pos += 1;
            if !self.parse_time_part() {
                return Err(ParseError::InvalidLiteral {
                    literal_type: "time",
                    value: self.slice(start, self.pos).to_string(),
                    position: start,
                });
            }
            return Ok(Token::Time(self.slice(start, self.pos)));
        }

        if !self.parse_date_part() {
            return Err(ParseError::InvalidLiteral {
                literal_type: "date",
                value: self.slice(start, self.pos).to_string(),
                position: start,
            });
        }

        if self.peek_byte(0) == Some(b'T') {
            self.pos += 1;
            self.parse_time_part();
            Ok(Token::DateTime(self.slice(start, self.pos)))
        } else {
            Ok(Token::Date(self.slice(start, self.pos)))
        }
    }

    /// YYYY[-MM[-DD]]
    fn parse_date_part(&mut self) -> bool {
        let digits = self.bytes[self.pos..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits != 4 {
            return false;
        }
        self.pos += 4;

        for _ in 0..2 {
            let rest = &self.bytes[self.pos..];
            if rest.len() >= 3 && rest[0] == b'-' && rest[1].is_ascii_digit() && rest[2].is_ascii_digit() {
                self.pos += 3;
            } else {
                break;
            }
        }
        true
    }

    /// HH[:MM[:SS[.fff]]][Z|(+|-)HH:MM]
    fn parse_time_part(&mut self) -> bool {
        let rest = &self.bytes[self.pos..];
        if rest.len() < 2 || !rest[0].is_ascii_digit() || !rest[1].is_ascii_digit() {
            return false;
        }
        self.pos += 2;

        for _ in 0..2 {
            let rest = &self.bytes[self.pos..];
            if rest.len() >= 3 && rest[0] == b':' && rest[1].is_ascii_digit() && rest[2].is_ascii_digit() {
                self.pos += 3;
            } else {
                break;
            }
        }

        if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            while self.pos < self.end && self.bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }

        match self.peek_byte(0) {
            Some(b'Z') => self.pos += 1,
            Some(b'+') | Some(b'-') => {
                let rest = &self.bytes[self.pos + 1..];
                if rest.len() >= 5
                    && rest[0].is_ascii_digit()
                    && rest[1].is_ascii_digit()
                    && rest[2] == b':'
                    && rest[3].is_ascii_digit()
                    && rest[4].is_ascii_digit()
                {
                    self.pos += 6;
                }
            }
            _ => {}
        }
        true
    }

    /// Get current position in input
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if a string is a keyword without tokenizing
    pub fn is_keyword_str(s: &str) -> bool {
        KEYWORD_TABLE.contains_key(s)
    }
}

/// Tokenize a FHIRPath expression; the result always ends with [`Token::Eof`]
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_tokenizer_basic() {
        let mut tokenizer = Tokenizer::new("Patient.name");

        let token1 = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(token1.as_identifier(), Some("Patient"));

        let token2 = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(token2, Token::Dot);

        let token3 = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(token3.as_identifier(), Some("name"));

        assert!(tokenizer.next_token().unwrap().is_none());
    }

    #[test]
    fn test_stream_ends_with_eof() {
        let tokens = tokenize("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, Token::Eof);

        let tokens = tokenize("name").unwrap();
        assert_eq!(tokens.last().unwrap().value, Token::Eof);
        assert_eq!(tokens.last().unwrap().start, 4);
    }

    #[test]
    fn test_spans_are_exact() {
        let source = "  name.where(use = 'official')";
        let tokens = tokenize(source).unwrap();
        assert_eq!(tokens[0].text(source), "name");
        assert_eq!(tokens[0].start, 2);
        assert_eq!(tokens[4].text(source), "use");
        assert_eq!(tokens[6].text(source), "'official'");
    }

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(
            kinds("and or xor implies not true false div mod"),
            vec![
                Token::And,
                Token::Or,
                Token::Xor,
                Token::Implies,
                Token::Not,
                Token::True,
                Token::False,
                Token::Div,
                Token::Mod,
                Token::Eof
            ]
        );
        assert!(Tokenizer::is_keyword_str("implies"));
        assert!(!Tokenizer::is_keyword_str("where"));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= != < <= > >= ~ !~ + - * / ^ | &"),
            vec![
                Token::Equal,
                Token::NotEqual,
                Token::LessThan,
                Token::LessThanOrEqual,
                Token::GreaterThan,
                Token::GreaterThanOrEqual,
                Token::Equivalent,
                Token::NotEquivalent,
                Token::Plus,
                Token::Minus,
                Token::Multiply,
                Token::Divide,
                Token::Power,
                Token::Union,
                Token::Ampersand,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_string_literals() {
        let tokens = kinds("'hello world' \"double\" 'it\\'s'");
        assert_eq!(tokens[0], Token::String("hello world"));
        assert_eq!(tokens[1], Token::String("double"));
        assert_eq!(tokens[2], Token::String("it\\'s"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.14 0 7."),
            vec![
                Token::Integer(42),
                Token::Decimal("3.14"),
                Token::Integer(0),
                Token::Integer(7),
                Token::Dot,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_integer_overflow_is_invalid_literal() {
        let err = tokenize("99999999999999999999").unwrap_err();
        assert!(matches!(err, ParseError::InvalidLiteral { literal_type: "integer", .. }));
    }

    #[test]
    fn test_dollar_variable_recognition() {
        assert_eq!(
            kinds("$this $index $total"),
            vec![
                Token::DollarThis,
                Token::DollarIndex,
                Token::DollarTotal,
                Token::Eof
            ]
        );
        let err = tokenize("$other").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedCharacter {
                position: 0,
                character: '$'
            }
        );
    }

    #[test]
    fn test_unrecognized_character_is_never_skipped() {
        let err = tokenize("name # family").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedCharacter {
                position: 5,
                character: '#'
            }
        );
        assert!(err.is_lex_error());
    }

    #[test]
    fn test_unclosed_string() {
        let err = tokenize("name = 'abc").unwrap_err();
        assert_eq!(
            err,
            ParseError::Unclosed {
                construct: "string literal",
                position: 7
            }
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "name // trailing\n/* block */ .family";
        let tokens = tokenize(source).unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].text(source), ".");
        assert_eq!(tokens[2].text(source), "family");
        assert!(tokenize("/* open").is_err());
    }

    #[test]
    fn test_temporal_literals() {
        assert_eq!(
            kinds("@2020-01-01 @2020-01-01T10:30:00Z @T10:30 @2020"),
            vec![
                Token::Date("@2020-01-01"),
                Token::DateTime("@2020-01-01T10:30:00Z"),
                Token::Time("@T10:30"),
                Token::Date("@2020"),
                Token::Eof
            ]
        );
        assert!(tokenize("@x").is_err());
    }

    #[test]
    fn test_backtick_identifier() {
        assert_eq!(
            kinds("`div`.value"),
            vec![
                Token::Identifier("div"),
                Token::Dot,
                Token::Identifier("value"),
                Token::Eof
            ]
        );
    }
}
