//! Tokenizer and parser behaviour through the public API

use octofhir_fhirpath_sql::ast::{
    BinaryOperator, ContextVariable, ExpressionNode, LiteralValue, UnaryOperator,
};
use octofhir_fhirpath_sql::parser::{ParseError, Token, parse_expression, tokenize};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn ident(name: &str) -> ExpressionNode {
    ExpressionNode::identifier(name)
}

fn int(value: i64) -> ExpressionNode {
    ExpressionNode::literal(LiteralValue::Integer(value))
}

#[test]
fn tokenize_ends_with_eof() {
    let tokens = tokenize("Patient.name[0]").unwrap();
    let kinds: Vec<Token<'_>> = tokens.iter().map(|t| t.value.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            Token::Identifier("Patient"),
            Token::Dot,
            Token::Identifier("name"),
            Token::LeftBracket,
            Token::Integer(0),
            Token::RightBracket,
            Token::Eof,
        ]
    );
    assert_eq!(tokens[2].start, 8);
}

#[test]
fn tokenize_operators_and_variables() {
    let tokens = tokenize("$index <= 2 and $total != 1 | x ~ y !~ z").unwrap();
    let kinds: Vec<Token<'_>> = tokens.into_iter().map(|t| t.value).collect();
    assert!(kinds.contains(&Token::DollarIndex));
    assert!(kinds.contains(&Token::DollarTotal));
    assert!(kinds.contains(&Token::LessThanOrEqual));
    assert!(kinds.contains(&Token::NotEqual));
    assert!(kinds.contains(&Token::Union));
    assert!(kinds.contains(&Token::Equivalent));
    assert!(kinds.contains(&Token::NotEquivalent));
}

#[test]
fn tokenizer_rejects_unknown_characters() {
    assert_eq!(
        tokenize("name # 1").unwrap_err(),
        ParseError::UnexpectedCharacter {
            position: 5,
            character: '#',
        }
    );
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        parse_expression("name // trailing comment").unwrap(),
        ident("name")
    );
    assert_eq!(parse_expression("/* lead */ name").unwrap(), ident("name"));
    assert!(matches!(
        parse_expression("name /* open").unwrap_err(),
        ParseError::Unclosed { .. }
    ));
}

#[test]
fn identifiers_and_paths() {
    assert_eq!(parse_expression("Patient").unwrap(), ident("Patient"));
    assert_eq!(
        parse_expression("Patient.name.family").unwrap(),
        ExpressionNode::path(vec![ident("Patient"), ident("name"), ident("family")])
    );
    assert_eq!(
        parse_expression("`given name`").unwrap(),
        ident("given name")
    );
}

#[test]
fn function_calls_and_indexers() {
    assert_eq!(
        parse_expression("exists()").unwrap(),
        ExpressionNode::function_call("exists", vec![])
    );
    assert_eq!(
        parse_expression("name[0]").unwrap(),
        ExpressionNode::indexer(ident("name"), int(0))
    );
    assert_eq!(
        parse_expression("substring(1, 2)").unwrap(),
        ExpressionNode::function_call("substring", vec![int(1), int(2)])
    );
}

#[test]
fn comparison_with_boolean_literal() {
    assert_eq!(
        parse_expression("active = true").unwrap(),
        ExpressionNode::binary_op(
            BinaryOperator::Equal,
            ident("active"),
            ExpressionNode::literal(LiteralValue::Boolean(true))
        )
    );
}

#[test]
fn context_variables() {
    assert_eq!(
        parse_expression("$index").unwrap(),
        ExpressionNode::variable(ContextVariable::Index)
    );
    assert_eq!(parse_expression("$this").unwrap(), ExpressionNode::This);
}

#[rstest]
#[case("@2020-01-01", LiteralValue::Date("2020-01-01".into()))]
#[case("@2020-01-01T10:00:00Z", LiteralValue::DateTime("2020-01-01T10:00:00Z".into()))]
#[case("@T10:30", LiteralValue::Time("10:30".into()))]
#[case("3.14", LiteralValue::Decimal("3.14".into()))]
#[case("'a\\tb'", LiteralValue::String("a\tb".into()))]
#[case("\"double\"", LiteralValue::String("double".into()))]
#[case("18 'years'", LiteralValue::Quantity { value: "18".into(), unit: "years".into() })]
#[case("{}", LiteralValue::Empty)]
fn literals(#[case] input: &str, #[case] expected: LiteralValue) {
    assert_eq!(parse_expression(input).unwrap(), ExpressionNode::literal(expected));
}

/// Root operator of the parsed expression
fn root_operator(input: &str) -> BinaryOperator {
    match parse_expression(input).unwrap() {
        ExpressionNode::BinaryOp(data) => data.op,
        other => panic!("expected a binary operation, got {other:?}"),
    }
}

#[rstest]
#[case("a or b and c", BinaryOperator::Or)]
#[case("a and b = c", BinaryOperator::And)]
#[case("a = b < c", BinaryOperator::Equal)]
#[case("a < b | c", BinaryOperator::LessThan)]
#[case("a | b + c", BinaryOperator::Union)]
#[case("a + b * c", BinaryOperator::Add)]
#[case("a * b ^ c", BinaryOperator::Multiply)]
#[case("a implies b or c", BinaryOperator::Or)]
#[case("a or b implies c", BinaryOperator::Implies)]
#[case("a and b implies c", BinaryOperator::Implies)]
#[case("a xor b and c", BinaryOperator::Xor)]
#[case("a & b = c", BinaryOperator::Equal)]
#[case("a mod b + c", BinaryOperator::Add)]
#[case("a in b and c", BinaryOperator::And)]
fn precedence(#[case] input: &str, #[case] expected: BinaryOperator) {
    assert_eq!(root_operator(input), expected);
}

#[test]
fn unary_binds_tighter_than_multiplication() {
    assert_eq!(
        parse_expression("-a * b").unwrap(),
        ExpressionNode::binary_op(
            BinaryOperator::Multiply,
            ExpressionNode::unary_op(UnaryOperator::Negate, ident("a")),
            ident("b")
        )
    );
}

#[test]
fn additive_is_left_associative() {
    assert_eq!(
        parse_expression("1 - 2 - 3").unwrap(),
        ExpressionNode::binary_op(
            BinaryOperator::Subtract,
            ExpressionNode::binary_op(BinaryOperator::Subtract, int(1), int(2)),
            int(3)
        )
    );
}

#[rstest]
#[case("name.")]
#[case("name.where(")]
#[case("(1 + 2")]
#[case("name[0")]
#[case("1 +")]
#[case("'unterminated")]
#[case("and")]
fn malformed_input_is_an_error(#[case] input: &str) {
    assert!(parse_expression(input).is_err(), "{input} should not parse");
}

#[rstest]
#[case(format!("1{}", " + 1".repeat(20_000)))]
#[case(format!("name{}", "[0]".repeat(20_000)))]
#[case(format!("a{}", " or b".repeat(20_000)))]
fn long_chains_hit_the_depth_limit(#[case] input: String) {
    assert!(matches!(
        parse_expression(&input).unwrap_err(),
        ParseError::RecursionLimit { limit: 100, .. }
    ));
}

#[test]
fn display_round_trips_structure() {
    let ast = parse_expression("Patient.name.where(use = 'official').given.first()").unwrap();
    assert_eq!(parse_expression(&ast.to_string()).unwrap(), ast);
}
