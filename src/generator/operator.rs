//! Binary and unary operators

use super::SqlGenerator;
use super::fragment::{ExtractionContext, Fragment, Shape, ValueKind};
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator, Visitor};
use crate::dialect::{DateOperation, MathFunction, SqlType, StringFunction};
use crate::error::{TranslationError, TranslationResult};

/// Value domain both sides of a comparison are brought into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparand {
    Text,
    Numeric,
    Boolean,
    Temporal(SqlType),
    Json,
}

/// Canonical interval unit and the type the base value is cast to
fn calendar_unit(unit: &str) -> Option<(&'static str, SqlType)> {
    Some(match unit {
        "year" | "years" | "a" => ("year", SqlType::Date),
        "month" | "months" | "mo" => ("month", SqlType::Date),
        "week" | "weeks" | "wk" => ("week", SqlType::Date),
        "day" | "days" | "d" => ("day", SqlType::Date),
        "hour" | "hours" | "h" => ("hour", SqlType::DateTime),
        "minute" | "minutes" | "min" => ("minute", SqlType::DateTime),
        "second" | "seconds" | "s" => ("second", SqlType::DateTime),
        "millisecond" | "milliseconds" | "ms" => ("millisecond", SqlType::DateTime),
        _ => return None,
    })
}

fn unsupported(op: impl std::fmt::Display, operand: &Fragment) -> TranslationError {
    TranslationError::UnsupportedOperator {
        operator: format!("{op} on {}", operand.kind),
    }
}

impl SqlGenerator<'_> {
    /// How the operands of `op` are extracted
    pub fn extraction_context(
        &self,
        op: BinaryOperator,
        left: (&ExpressionNode, &Fragment),
        right: (&ExpressionNode, &Fragment),
    ) -> ExtractionContext {
        let textual = |(node, fragment): (&ExpressionNode, &Fragment)| {
            node.is_string_literal() || fragment.kind == ValueKind::Text
        };
        match op {
            BinaryOperator::Concatenate => ExtractionContext::TextDisplay,
            BinaryOperator::Union | BinaryOperator::In | BinaryOperator::Contains => {
                ExtractionContext::CollectionOperation
            }
            _ if op.is_comparison() && (textual(left) || textual(right)) => {
                ExtractionContext::TextComparison
            }
            _ if op.is_comparison()
                && left.1.is_collection()
                && right.1.is_collection() =>
            {
                ExtractionContext::FilteredSingle
            }
            _ => ExtractionContext::ObjectOperation,
        }
    }

    pub(crate) fn binary_op(
        &mut self,
        op: BinaryOperator,
        left_node: &ExpressionNode,
        right_node: &ExpressionNode,
    ) -> TranslationResult<Fragment> {
        let left = self.visit_expression(left_node)?;
        let right = self.visit_expression(right_node)?;
        let context = self.extraction_context(op, (left_node, &left), (right_node, &right));

        match op {
            BinaryOperator::Add | BinaryOperator::Subtract => {
                if let Some(fragment) = self.date_arithmetic(op, &left, right_node, &right)? {
                    return Ok(fragment);
                }
                if op == BinaryOperator::Add
                    && (self.is_string_operand(left_node, &left)
                        || self.is_string_operand(right_node, &right))
                {
                    let parts = [self.text(&left)?, self.text(&right)?];
                    let sql = self.dialect().concat(&parts)?;
                    return Ok(Fragment::derived(sql, Shape::Scalar, ValueKind::Text, &[&left, &right]));
                }
                self.arithmetic(op, (left_node, &left), (right_node, &right))
            }
            _ if op.is_arithmetic() => self.arithmetic(op, (left_node, &left), (right_node, &right)),
            _ if op.is_comparison() => self.comparison(op, context, &left, &right),
            _ if op.is_logical() => self.logical(op, (left_node, &left), (right_node, &right)),
            BinaryOperator::Concatenate => {
                let parts = [
                    self.materialize(&left, context)?,
                    self.materialize(&right, context)?,
                ];
                let sql = self.dialect().concat(&parts)?;
                Ok(Fragment::derived(sql, Shape::Scalar, ValueKind::Text, &[&left, &right]))
            }
            BinaryOperator::Union => {
                let sql = self.dialect().union(
                    &self.materialize(&left, context)?,
                    &self.materialize(&right, context)?,
                )?;
                Ok(Fragment::derived(sql, Shape::Collection, ValueKind::Json, &[&left, &right]))
            }
            BinaryOperator::In => self.membership(&right, &left),
            BinaryOperator::Contains => self.membership(&left, &right),
            _ => Err(TranslationError::UnsupportedOperator {
                operator: op.symbol().to_string(),
            }),
        }
    }

    /// Text value, or JSON named by a field or function from the string vocabulary
    ///
    /// Numbers, booleans and temporal values never concatenate, whatever
    /// field the path passed through before the function producing them.
    fn is_string_operand(&self, node: &ExpressionNode, fragment: &Fragment) -> bool {
        let fields = &self.config().fields;
        match fragment.kind {
            ValueKind::Text => true,
            ValueKind::Json => {
                node.is_string_literal()
                    || node.trailing_name().is_some_and(|n| fields.is_string_valued(n))
                    || fragment
                        .field
                        .as_deref()
                        .is_some_and(|f| fields.is_string_valued(f))
            }
            ValueKind::Numeric | ValueKind::Boolean | ValueKind::Temporal(_) => false,
        }
    }

    /// `date + 1 year`, `today() - 18 years`
    fn date_arithmetic(
        &self,
        op: BinaryOperator,
        left: &Fragment,
        right_node: &ExpressionNode,
        right: &Fragment,
    ) -> TranslationResult<Option<Fragment>> {
        let Some(LiteralValue::Quantity { value, unit }) = right_node.as_literal() else {
            return Ok(None);
        };
        let Some((unit, default_type)) = calendar_unit(unit) else {
            return Ok(None);
        };
        if left.kind == ValueKind::Numeric {
            return Ok(None);
        }
        let (base, base_type) = match left.kind {
            ValueKind::Temporal(t) => (left.sql.clone(), t),
            _ => (self.cast(left, default_type)?, default_type),
        };
        let direction = if op == BinaryOperator::Add {
            DateOperation::Add
        } else {
            DateOperation::Subtract
        };
        let sql = self
            .dialect()
            .date_arithmetic(&base, direction, value, unit)?;
        Ok(Some(Fragment::derived(
            sql,
            Shape::Scalar,
            ValueKind::Temporal(base_type),
            &[left, right],
        )))
    }

    fn arithmetic(
        &self,
        op: BinaryOperator,
        (left_node, left): (&ExpressionNode, &Fragment),
        (right_node, right): (&ExpressionNode, &Fragment),
    ) -> TranslationResult<Fragment> {
        for operand in [left, right] {
            if matches!(operand.kind, ValueKind::Temporal(_) | ValueKind::Boolean) {
                return Err(unsupported(op, operand));
            }
        }
        let sql = match op {
            BinaryOperator::Divide => format!(
                "({} / NULLIF({}, 0))",
                self.decimal_operand(left_node, left)?,
                self.numeric(right)?
            ),
            BinaryOperator::IntegerDivide => {
                let quotient = format!(
                    "({} / NULLIF({}, 0))",
                    self.integer_operand(left_node, left)?,
                    self.integer_operand(right_node, right)?
                );
                self.dialect().math(MathFunction::Truncate, &[quotient])?
            }
            BinaryOperator::Modulo => format!(
                "MOD({}, NULLIF({}, 0))",
                self.integer_operand(left_node, left)?,
                self.integer_operand(right_node, right)?
            ),
            BinaryOperator::Power => self
                .dialect()
                .power(&self.numeric(left)?, &self.numeric(right)?)?,
            _ => format!(
                "({} {} {})",
                self.numeric(left)?,
                op.symbol(),
                self.numeric(right)?
            ),
        };
        Ok(Fragment::derived(sql, Shape::Scalar, ValueKind::Numeric, &[left, right]))
    }

    /// Dividend of `/`, always non-integer so division never truncates
    fn decimal_operand(&self, node: &ExpressionNode, fragment: &Fragment) -> TranslationResult<String> {
        match node.as_literal() {
            Some(LiteralValue::Integer(value)) => Ok(format!("{value}.0")),
            Some(LiteralValue::Decimal(value)) => Ok(value.clone()),
            _ if fragment.kind == ValueKind::Numeric => {
                Ok(self.dialect().safe_cast(&fragment.sql, SqlType::Decimal)?)
            }
            _ => self.numeric(fragment),
        }
    }

    /// Operand of `div` and `mod`
    fn integer_operand(&self, node: &ExpressionNode, fragment: &Fragment) -> TranslationResult<String> {
        match node.as_literal() {
            Some(LiteralValue::Integer(value)) => Ok(value.to_string()),
            Some(LiteralValue::Decimal(value)) => {
                Ok(self.dialect().math(MathFunction::Truncate, &[value.clone()])?)
            }
            _ if fragment.kind == ValueKind::Numeric => Ok(self
                .dialect()
                .math(MathFunction::Truncate, &[fragment.sql.clone()])?),
            _ => self.cast(fragment, SqlType::Integer),
        }
    }

    fn comparison(
        &self,
        op: BinaryOperator,
        context: ExtractionContext,
        left: &Fragment,
        right: &Fragment,
    ) -> TranslationResult<Fragment> {
        let comparand = if context == ExtractionContext::TextComparison {
            Comparand::Text
        } else {
            match (left.kind, right.kind) {
                (ValueKind::Numeric, _) | (_, ValueKind::Numeric) => Comparand::Numeric,
                (ValueKind::Boolean, _) | (_, ValueKind::Boolean) => Comparand::Boolean,
                (ValueKind::Temporal(t), _) | (_, ValueKind::Temporal(t)) => Comparand::Temporal(t),
                _ => Comparand::Json,
            }
        };
        let l = self.comparand(left, comparand)?;
        let r = self.comparand(right, comparand)?;

        let sql = match op {
            BinaryOperator::Equivalent => self.equivalence(&l, &r, comparand)?,
            BinaryOperator::NotEquivalent => format!("(NOT {})", self.equivalence(&l, &r, comparand)?),
            _ => {
                let symbol = op.sql_comparison().ok_or_else(|| TranslationError::UnsupportedOperator {
                    operator: op.symbol().to_string(),
                })?;
                format!("({l} {symbol} {r})")
            }
        };
        Ok(Fragment::derived(sql, Shape::Boolean, ValueKind::Boolean, &[left, right]))
    }

    fn comparand(&self, fragment: &Fragment, comparand: Comparand) -> TranslationResult<String> {
        match comparand {
            Comparand::Text => self.materialize(fragment, ExtractionContext::TextComparison),
            Comparand::Numeric => self.numeric(fragment),
            Comparand::Boolean => self.boolean_value(fragment),
            Comparand::Temporal(t) => self.cast(fragment, t),
            Comparand::Json => self.materialize(fragment, ExtractionContext::FilteredSingle),
        }
    }

    /// `~`: case and surrounding whitespace are ignored for text; two empties are equivalent
    fn equivalence(&self, left: &str, right: &str, comparand: Comparand) -> TranslationResult<String> {
        if comparand == Comparand::Text {
            let normalize = |value: &str| -> TranslationResult<String> {
                let trimmed = self.dialect().string_function(StringFunction::Trim, value, &[])?;
                let lowered = self
                    .dialect()
                    .string_function(StringFunction::Lower, &trimmed, &[])?;
                Ok(format!("COALESCE({lowered}, '')"))
            };
            Ok(format!("({} = {})", normalize(left)?, normalize(right)?))
        } else {
            Ok(format!(
                "COALESCE(({left} = {right}), ({left} IS NULL AND {right} IS NULL))"
            ))
        }
    }

    fn logical(
        &self,
        op: BinaryOperator,
        (left_node, left): (&ExpressionNode, &Fragment),
        (right_node, right): (&ExpressionNode, &Fragment),
    ) -> TranslationResult<Fragment> {
        let a = self.logical_operand(left_node, left)?;
        let b = self.logical_operand(right_node, right)?;
        let sql = match op {
            BinaryOperator::And => format!("({a} AND {b})"),
            BinaryOperator::Or => format!("({a} OR {b})"),
            BinaryOperator::Xor => format!("(({a} AND NOT {b}) OR (NOT {a} AND {b}))"),
            BinaryOperator::Implies => format!("(NOT {a} OR {b})"),
            _ => {
                return Err(TranslationError::UnsupportedOperator {
                    operator: op.symbol().to_string(),
                });
            }
        };
        Ok(Fragment::derived(sql, Shape::Boolean, ValueKind::Boolean, &[left, right]))
    }

    /// Known boolean fields, also at the end of a nested path, are converted to SQL booleans
    fn logical_operand(&self, node: &ExpressionNode, fragment: &Fragment) -> TranslationResult<String> {
        let boolean_path = node
            .final_identifier()
            .is_some_and(|f| self.config().fields.is_boolean_field(f));
        if fragment.is_json() && boolean_path {
            Ok(self.dialect().to_boolean(&fragment.sql)?)
        } else {
            self.condition(fragment)
        }
    }

    fn membership(&self, collection: &Fragment, item: &Fragment) -> TranslationResult<Fragment> {
        let collection_sql = self.materialize(collection, ExtractionContext::CollectionOperation)?;
        let item_sql = self.materialize(item, ExtractionContext::FilteredSingle)?;
        let sql = self.dialect().contains(&collection_sql, &item_sql)?;
        Ok(Fragment::derived(sql, Shape::Boolean, ValueKind::Boolean, &[collection, item]))
    }

    pub(crate) fn unary_op(
        &mut self,
        op: UnaryOperator,
        operand_node: &ExpressionNode,
    ) -> TranslationResult<Fragment> {
        let operand = self.visit_expression(operand_node)?;
        match op {
            UnaryOperator::Not => {
                let sql = format!("(NOT {})", self.logical_operand(operand_node, &operand)?);
                Ok(Fragment::derived(sql, Shape::Boolean, ValueKind::Boolean, &[&operand]))
            }
            UnaryOperator::Negate | UnaryOperator::Positive => {
                if matches!(operand.kind, ValueKind::Temporal(_) | ValueKind::Boolean) {
                    return Err(unsupported(op, &operand));
                }
                let value = self.numeric(&operand)?;
                let sql = if op == UnaryOperator::Negate {
                    format!("(-{value})")
                } else {
                    value
                };
                Ok(Fragment::derived(sql, Shape::Scalar, ValueKind::Numeric, &[&operand]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TranslatorConfig;
    use crate::dialect::MockDialect;
    use crate::error::{TranslationError, TranslationResult};
    use crate::generator::{Clause, Fragment, Shape, SqlGenerator, ValueKind};
    use crate::parser::parse_expression;
    use pretty_assertions::assert_eq;

    fn generate(expr: &str) -> TranslationResult<Fragment> {
        let dialect = MockDialect::new();
        let config = TranslatorConfig::default();
        let ast = parse_expression(expr)?;
        let mut generator = SqlGenerator::new(&dialect, &config, Some("Patient"), Clause::Where)?;
        generator.generate(&ast)
    }

    #[test]
    fn test_numeric_addition() {
        let fragment = generate("1 + 2").unwrap();
        assert_eq!(fragment.sql, "(1 + 2)");
        assert_eq!(fragment.kind, ValueKind::Numeric);
    }

    #[test]
    fn test_string_concatenation() {
        let fragment = generate("'Hello' + name.family").unwrap();
        assert!(fragment.sql.starts_with("('Hello' || "));
        assert_eq!(fragment.kind, ValueKind::Text);

        let field_only = generate("name.family + name.given.first()").unwrap();
        assert!(field_only.sql.contains(" || "));
    }

    #[test]
    fn test_numeric_functions_add() {
        for expr in [
            "name.count() + 1",
            "gender.length() + 1",
            "name.family.first().length() + 1",
            "gender.indexOf('a') + 1",
        ] {
            let fragment = generate(expr).unwrap();
            assert_eq!(fragment.kind, ValueKind::Numeric, "{expr}");
            assert!(!fragment.sql.contains("||"), "{expr}");
            assert!(fragment.sql.ends_with(" + 1)"), "{expr}");
        }

        let text = generate("gender.upper() + 'x'").unwrap();
        assert_eq!(text.kind, ValueKind::Text);
        assert!(text.sql.contains(" || "));
    }

    #[test]
    fn test_arithmetic_casts_fields() {
        let fragment = generate("multipleBirthInteger * 2").unwrap();
        assert!(fragment.sql.contains("::numeric"));
        assert!(fragment.sql.ends_with(" * 2)"));
    }

    #[test]
    fn test_division_guards_zero() {
        assert_eq!(generate("5 / 0").unwrap().sql, "(5.0 / NULLIF(0, 0))");
        assert_eq!(generate("7 mod 0").unwrap().sql, "MOD(7, NULLIF(0, 0))");
        assert_eq!(generate("7 div 2").unwrap().sql, "trunc((7 / NULLIF(2, 0)))");
    }

    #[test]
    fn test_text_comparison() {
        let fragment = generate("gender = 'male'").unwrap();
        assert_eq!(fragment.sql, "((r.resource ->> 'gender') = 'male')");
        assert_eq!(fragment.shape, Shape::Boolean);
    }

    #[test]
    fn test_boolean_comparison_converts_field() {
        let fragment = generate("active = true").unwrap();
        assert!(fragment.sql.starts_with("((SELECT CASE WHEN jsonb_typeof(b.v) = 'boolean'"));
        assert!(fragment.sql.ends_with(" = true)"));
    }

    #[test]
    fn test_logical_operators() {
        let xor = generate("active xor (gender = 'male')").unwrap();
        assert!(xor.sql.contains(" AND NOT "));
        assert!(xor.sql.contains("(NOT "));

        let implies = generate("active implies (gender = 'male')").unwrap();
        assert!(implies.sql.starts_with("(NOT "));
        assert!(implies.sql.contains(" OR "));
    }

    #[test]
    fn test_equivalence_ignores_case() {
        let fragment = generate("name.family ~ 'smith'").unwrap();
        assert!(fragment.sql.contains("COALESCE(lower(trim('smith')), '')"));
    }

    #[test]
    fn test_date_arithmetic() {
        let fragment = generate("birthDate + 18 years").unwrap();
        assert!(fragment.sql.contains("INTERVAL '1 year'"));
        assert!(fragment.sql.contains("::date"));
    }

    #[test]
    fn test_union_and_membership() {
        let union = generate("name.given | name.family").unwrap();
        assert!(union.sql.contains("UNION SELECT value"));
        assert_eq!(union.shape, Shape::Collection);

        let membership = generate("'John' in name.given").unwrap();
        assert!(membership.sql.contains("@> jsonb_build_array(to_jsonb(('John')::text))"));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(generate("-5").unwrap().sql, "(-5)");
        assert!(generate("not active").unwrap().sql.starts_with("(NOT (SELECT CASE"));
        assert!(matches!(
            generate("-true"),
            Err(TranslationError::UnsupportedOperator { .. })
        ));
    }
}
