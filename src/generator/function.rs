//! Function calls

use super::SqlGenerator;
use super::fragment::{ExtractionContext, Fragment, Shape, ValueKind};
use super::literal::quote_literal;
use super::scope::{INDEX_COLUMN, IterationFrame, TOTAL_COLUMN};
use super::signature::{self, FunctionCategory};
use crate::ast::{ExpressionNode, IterationVariableUsage, LiteralValue, Visitor, is_type_name};
use crate::dialect::{
    AggregateFunction, JsonPath, MathFunction, SqlType, StringFunction, TemporalKind,
};
use crate::error::{TranslationError, TranslationResult};

/// Rows of an iteration, ready to be placed in a FROM clause
struct Iteration {
    from: String,
    frame: IterationFrame,
}

/// JSON type reported for values of a FHIRPath primitive type
fn json_type_of(type_name: &str) -> Option<&'static str> {
    Some(match type_name {
        "string" | "code" | "id" | "uri" | "url" | "canonical" | "oid" | "uuid" | "markdown"
        | "base64Binary" | "date" | "dateTime" | "instant" | "time" => "string",
        "integer" | "decimal" | "positiveInt" | "unsignedInt" | "integer64" => "number",
        "boolean" => "boolean",
        _ => return None,
    })
}

/// `boolean`, `FHIR.boolean`, `System.String` or `'Quantity'`
fn type_name_argument(function: &str, arg: &ExpressionNode) -> TranslationResult<String> {
    match arg {
        ExpressionNode::Identifier(name) => Ok(name.clone()),
        ExpressionNode::Literal(LiteralValue::String(name)) => Ok(name.clone()),
        ExpressionNode::Path { segments } if segments.iter().all(|s| s.as_identifier().is_some()) => {
            Ok(arg.to_string())
        }
        _ => Err(TranslationError::invalid_argument(function, "expected a type name")),
    }
}

impl SqlGenerator<'_> {
    pub(crate) fn function_call(
        &mut self,
        name: &str,
        args: &[ExpressionNode],
    ) -> TranslationResult<Fragment> {
        let signature = signature::resolve(name, args.len())?;
        let input = self.scopes.focus().clone();
        log::trace!("function {name} with {} argument(s)", args.len());

        match signature.category {
            FunctionCategory::Iteration => self.iteration_function(name, &input, args),
            FunctionCategory::Collection => self.collection_function(name, &input, args),
            FunctionCategory::String => self.string_function(name, &input, args),
            FunctionCategory::Conversion => self.conversion_function(name, &input),
            FunctionCategory::Math => self.math_function(name, &input, args),
            FunctionCategory::Aggregate => self.aggregate_function(name, &input, args),
            FunctionCategory::Utility => self.utility_function(name, &input, args),
        }
    }

    // Iteration

    /// Enumerate the elements of `input`, projecting `$index`/`$total` when `usage` needs them
    fn iteration(
        &mut self,
        input: &Fragment,
        usage: IterationVariableUsage,
    ) -> TranslationResult<Iteration> {
        let alias = self.fresh_alias();
        let collection = self.materialize(input, ExtractionContext::CollectionOperation)?;
        let elements = self.dialect().iterate_elements(&collection, &alias)?;

        let mut frame = IterationFrame {
            alias: alias.clone(),
            index: None,
            total: None,
        };
        if !usage.index && !usage.total {
            return Ok(Iteration {
                from: elements,
                frame,
            });
        }

        let mut columns = vec![frame.this_sql(), frame.ordinal_sql()];
        if usage.index {
            columns.push(format!(
                "ROW_NUMBER() OVER (ORDER BY {}) - 1 AS {INDEX_COLUMN}",
                frame.ordinal_sql()
            ));
            frame.index = Some(format!("{alias}.{INDEX_COLUMN}"));
        }
        if usage.total {
            columns.push(format!("COUNT(*) OVER () AS {TOTAL_COLUMN}"));
            frame.total = Some(format!("{alias}.{TOTAL_COLUMN}"));
        }
        Ok(Iteration {
            from: format!("(SELECT {} FROM {elements}) AS {alias}", columns.join(", ")),
            frame,
        })
    }

    /// Generate `criteria` once per element of `input`
    fn iterate(
        &mut self,
        input: &Fragment,
        criteria: &ExpressionNode,
    ) -> TranslationResult<(Iteration, Fragment)> {
        let iteration = self.iteration(input, IterationVariableUsage::of(criteria))?;
        let frame = iteration.frame.clone();
        let body = self.with_iteration(frame, |g| g.visit_expression(criteria))?;
        Ok((iteration, body))
    }

    /// Elements of `input` satisfying `predicate`, in their original order
    fn filter_elements(
        &mut self,
        input: &Fragment,
        predicate: impl FnOnce(&Self, &str) -> TranslationResult<String>,
    ) -> TranslationResult<Fragment> {
        let iteration = self.iteration(input, IterationVariableUsage::default())?;
        let value = iteration.frame.this_sql();
        let condition = predicate(self, &value)?;
        let aggregate = self
            .dialect()
            .aggregate_array(&value, &iteration.frame.ordinal_sql())?;
        let sql = format!("(SELECT {aggregate} FROM {} WHERE {condition})", iteration.from);
        Ok(self.collection_result(sql, input))
    }

    /// Collection keeping the navigation facts of `input`
    fn collection_result(&self, sql: String, input: &Fragment) -> Fragment {
        let mut fragment = Fragment::derived(sql, Shape::Collection, ValueKind::Json, &[input]);
        fragment.source_path = input.source_path.clone();
        fragment.field = input.field.clone();
        fragment
    }

    fn iteration_function(
        &mut self,
        name: &str,
        input: &Fragment,
        args: &[ExpressionNode],
    ) -> TranslationResult<Fragment> {
        let Some(criteria) = args.first() else {
            // exists() without criteria
            let sql = self
                .dialect()
                .exists(&self.materialize(input, ExtractionContext::CollectionOperation)?)?;
            return Ok(Fragment::derived(sql, Shape::Boolean, ValueKind::Boolean, &[input]));
        };

        let (iteration, body) = self.iterate(input, criteria)?;
        let Iteration { from, frame } = iteration;
        match name {
            "where" => {
                let condition = self.condition(&body)?;
                let aggregate = self
                    .dialect()
                    .aggregate_array(&frame.this_sql(), &frame.ordinal_sql())?;
                let sql = format!("(SELECT {aggregate} FROM {from} WHERE {condition})");
                Ok(self.collection_result(sql, input))
            }
            "select" => {
                let projection = self.fresh_alias();
                let value = self.json(&body)?;
                let aggregate = self.dialect().aggregate_array(
                    &format!("{projection}.v"),
                    &format!("{projection}.o"),
                )?;
                let mut sql = format!(
                    "(SELECT {aggregate} FROM (SELECT {value} AS v, {} AS o FROM {from}) AS {projection} \
                     WHERE {projection}.v IS NOT NULL)",
                    frame.ordinal_sql()
                );
                if body.is_collection() {
                    sql = self.dialect().flatten(&sql)?;
                }
                let mut fragment = Fragment::derived(sql, Shape::Collection, ValueKind::Json, &[input]);
                fragment.field = body.field.clone();
                fragment.source_path = match (&input.source_path, &body.source_path) {
                    (Some(outer), Some(inner)) => Some(JsonPath::from_fields(
                        outer.segments().iter().chain(inner.segments()).cloned(),
                    )),
                    _ => None,
                };
                Ok(fragment)
            }
            "all" => {
                let condition = self.condition(&body)?;
                let sql = format!(
                    "(NOT EXISTS (SELECT 1 FROM {from} WHERE COALESCE({condition}, false) = false))"
                );
                Ok(Fragment::derived(sql, Shape::Boolean, ValueKind::Boolean, &[input]))
            }
            _ => {
                let condition = self.condition(&body)?;
                let sql = format!("(EXISTS (SELECT 1 FROM {from} WHERE {condition}))");
                Ok(Fragment::derived(sql, Shape::Boolean, ValueKind::Boolean, &[input]))
            }
        }
    }

    // Collections

    fn collection_function(
        &mut self,
        name: &str,
        input: &Fragment,
        args: &[ExpressionNode],
    ) -> TranslationResult<Fragment> {
        let dialect = self.dialect();
        let collection = self.materialize(input, ExtractionContext::CollectionOperation)?;
        let boolean = |sql: String| Fragment::derived(sql, Shape::Boolean, ValueKind::Boolean, &[input]);

        let fragment = match name {
            "empty" => boolean(dialect.empty(&collection)?),
            "count" => Fragment::derived(
                dialect.count(&collection)?,
                Shape::Scalar,
                ValueKind::Numeric,
                &[input],
            ),
            "first" | "last" | "single" => {
                let sql = match name {
                    "first" => dialect.extract_array_element(&collection, "0")?,
                    "last" => {
                        let last = format!("{} - 1", dialect.count(&collection)?);
                        dialect.extract_array_element(&collection, &last)?
                    }
                    _ => format!(
                        "(CASE WHEN {} = 1 THEN {} END)",
                        dialect.count(&collection)?,
                        dialect.extract_array_element(&collection, "0")?
                    ),
                };
                let mut fragment = Fragment::derived(sql, Shape::Scalar, ValueKind::Json, &[input]);
                fragment.source_path = input.source_path.clone();
                fragment.field = input.field.clone();
                fragment
            }
            "tail" => self.collection_result(dialect.slice(&collection, "1", None)?, input),
            "skip" | "take" => {
                let count = self.argument(&args[0])?;
                let count_sql = self.numeric(&count)?;
                let sql = if name == "skip" {
                    dialect.slice(&collection, &count_sql, None)?
                } else {
                    dialect.slice(&collection, "0", Some(&count_sql))?
                };
                let mut fragment = self.collection_result(sql, input);
                fragment.absorb(&count);
                fragment
            }
            "distinct" => self.collection_result(dialect.distinct(&collection)?, input),
            "isDistinct" => {
                let distinct = dialect.distinct(&collection)?;
                boolean(format!(
                    "({} = {})",
                    dialect.count(&distinct)?,
                    dialect.count(&collection)?
                ))
            }
            "union" | "combine" => {
                let other = self.argument(&args[0])?;
                let other_sql = self.materialize(&other, ExtractionContext::CollectionOperation)?;
                let sql = if name == "union" {
                    dialect.union(&collection, &other_sql)?
                } else {
                    dialect.combine(&collection, &other_sql)?
                };
                Fragment::derived(sql, Shape::Collection, ValueKind::Json, &[input, &other])
            }
            "allTrue" | "anyTrue" | "allFalse" | "anyFalse" => {
                let iteration = self.iteration(input, IterationVariableUsage::default())?;
                let value = dialect.to_boolean(&iteration.frame.this_sql())?;
                let from = iteration.from;
                boolean(match name {
                    "allTrue" => format!(
                        "(NOT EXISTS (SELECT 1 FROM {from} WHERE COALESCE({value}, false) = false))"
                    ),
                    "anyTrue" => format!("(EXISTS (SELECT 1 FROM {from} WHERE {value} = true))"),
                    "allFalse" => format!(
                        "(NOT EXISTS (SELECT 1 FROM {from} WHERE COALESCE({value}, true) = true))"
                    ),
                    _ => format!("(EXISTS (SELECT 1 FROM {from} WHERE {value} = false))"),
                })
            }
            "join" => {
                let (separator, inputs) = match args.first() {
                    Some(arg) => {
                        let separator = self.argument(arg)?;
                        (self.text(&separator)?, vec![input.clone(), separator])
                    }
                    None => ("''".to_string(), vec![input.clone()]),
                };
                let refs: Vec<&Fragment> = inputs.iter().collect();
                Fragment::derived(
                    dialect.join(&collection, &separator)?,
                    Shape::Scalar,
                    ValueKind::Text,
                    &refs,
                )
            }
            "ofType" => self.of_type(input, &args[0])?,
            "hasValue" => {
                let value = self.materialize(input, ExtractionContext::FilteredSingle)?;
                boolean(format!(
                    "COALESCE({} IN ('string', 'number', 'boolean'), false)",
                    dialect.type_of(&value)?
                ))
            }
            _ => boolean(format!("(NOT {})", self.condition(input)?)),
        };
        Ok(fragment)
    }

    /// `ofType(T)`: the concrete field of a choice element, otherwise a type filter
    fn of_type(&mut self, input: &Fragment, arg: &ExpressionNode) -> TranslationResult<Fragment> {
        let type_name = type_name_argument("ofType", arg)?;
        if let Some(site) = input.choice.as_deref() {
            return self.choice_variant(site, &type_name);
        }

        let simple = type_name
            .rsplit('.')
            .next()
            .unwrap_or(type_name.as_str())
            .to_string();
        let resource_type_field = JsonPath::from_fields([self.config().resource_type_field.as_str()]);
        self.filter_elements(input, |g, value| {
            let dialect = g.dialect();
            let json_type = dialect.type_of(value)?;
            match json_type_of(&simple) {
                Some(expected) => Ok(format!("{json_type} = {}", quote_literal(expected))),
                None if is_type_name(&simple) => {
                    let resource_type = dialect.extract_text(value, &resource_type_field)?;
                    Ok(format!(
                        "{json_type} = 'object' AND COALESCE({resource_type} = {}, true)",
                        quote_literal(&simple)
                    ))
                }
                None => Err(TranslationError::invalid_argument(
                    "ofType",
                    format!("unknown type '{type_name}'"),
                )),
            }
        })
    }

    // Strings

    fn string_function(
        &mut self,
        name: &str,
        input: &Fragment,
        args: &[ExpressionNode],
    ) -> TranslationResult<Fragment> {
        let target = self.text(input)?;
        let mut fragments = vec![input.clone()];
        for arg in args {
            fragments.push(self.argument(arg)?);
        }
        let (function, kind, shape) = match name {
            "startsWith" => (StringFunction::StartsWith, ValueKind::Boolean, Shape::Boolean),
            "endsWith" => (StringFunction::EndsWith, ValueKind::Boolean, Shape::Boolean),
            "contains" => (StringFunction::Contains, ValueKind::Boolean, Shape::Boolean),
            "replace" => (StringFunction::Replace, ValueKind::Text, Shape::Scalar),
            "substring" => (StringFunction::Substring, ValueKind::Text, Shape::Scalar),
            "indexOf" => (StringFunction::IndexOf, ValueKind::Numeric, Shape::Scalar),
            "upper" => (StringFunction::Upper, ValueKind::Text, Shape::Scalar),
            "lower" => (StringFunction::Lower, ValueKind::Text, Shape::Scalar),
            "length" => (StringFunction::Length, ValueKind::Numeric, Shape::Scalar),
            "trim" => (StringFunction::Trim, ValueKind::Text, Shape::Scalar),
            _ => {
                // matches
                let pattern = self.text(&fragments[1])?;
                let sql = self.dialect().regex_match(&target, &pattern)?;
                let refs: Vec<&Fragment> = fragments.iter().collect();
                return Ok(Fragment::derived(sql, Shape::Boolean, ValueKind::Boolean, &refs));
            }
        };

        let arg_sql = fragments[1..]
            .iter()
            .map(|arg| match function {
                StringFunction::Substring => self.numeric(arg),
                _ => self.text(arg),
            })
            .collect::<TranslationResult<Vec<_>>>()?;
        let sql = self.dialect().string_function(function, &target, &arg_sql)?;
        let refs: Vec<&Fragment> = fragments.iter().collect();
        Ok(Fragment::derived(sql, shape, kind, &refs))
    }

    fn conversion_function(&mut self, name: &str, input: &Fragment) -> TranslationResult<Fragment> {
        let (sql, kind) = match name {
            "toString" => (self.text(input)?, ValueKind::Text),
            "toInteger" => (self.cast(input, SqlType::Integer)?, ValueKind::Numeric),
            "toDecimal" => (self.cast(input, SqlType::Decimal)?, ValueKind::Numeric),
            _ => (self.cast(input, SqlType::Boolean)?, ValueKind::Boolean),
        };
        Ok(Fragment::derived(sql, Shape::Scalar, kind, &[input]))
    }

    // Numbers

    fn math_function(
        &mut self,
        name: &str,
        input: &Fragment,
        args: &[ExpressionNode],
    ) -> TranslationResult<Fragment> {
        let mut fragments = vec![input.clone()];
        for arg in args {
            fragments.push(self.argument(arg)?);
        }
        let values = fragments
            .iter()
            .map(|f| self.numeric(f))
            .collect::<TranslationResult<Vec<_>>>()?;

        let function = match name {
            "abs" => MathFunction::Abs,
            "ceiling" => MathFunction::Ceiling,
            "floor" => MathFunction::Floor,
            "round" => MathFunction::Round,
            "truncate" => MathFunction::Truncate,
            "sqrt" => MathFunction::Sqrt,
            "ln" => MathFunction::Ln,
            "log" => MathFunction::Log,
            "exp" => MathFunction::Exp,
            _ => {
                // power
                let sql = self.dialect().power(&values[0], &values[1])?;
                let refs: Vec<&Fragment> = fragments.iter().collect();
                return Ok(Fragment::derived(sql, Shape::Scalar, ValueKind::Numeric, &refs));
            }
        };
        let sql = self.dialect().math(function, &values)?;
        let refs: Vec<&Fragment> = fragments.iter().collect();
        Ok(Fragment::derived(sql, Shape::Scalar, ValueKind::Numeric, &refs))
    }

    fn aggregate_function(
        &mut self,
        name: &str,
        input: &Fragment,
        args: &[ExpressionNode],
    ) -> TranslationResult<Fragment> {
        let collection = self.materialize(input, ExtractionContext::CollectionOperation)?;
        let function = match name {
            "sum" => AggregateFunction::Sum,
            "min" => AggregateFunction::Min,
            "max" => AggregateFunction::Max,
            "avg" => AggregateFunction::Avg,
            "median" => AggregateFunction::Median,
            "stdDev" => AggregateFunction::StdDev,
            "variance" => AggregateFunction::Variance,
            _ => {
                // percentile
                let fraction = self.argument(&args[0])?;
                let sql = self
                    .dialect()
                    .percentile(&collection, &self.numeric(&fraction)?)?;
                return Ok(Fragment::derived(
                    sql,
                    Shape::Scalar,
                    ValueKind::Numeric,
                    &[input, &fraction],
                ));
            }
        };
        let sql = self.dialect().aggregate(function, &collection)?;
        Ok(Fragment::derived(sql, Shape::Scalar, ValueKind::Numeric, &[input]))
    }

    // Utility

    fn utility_function(
        &mut self,
        name: &str,
        input: &Fragment,
        args: &[ExpressionNode],
    ) -> TranslationResult<Fragment> {
        match name {
            "iif" => self.iif(args),
            "extension" => {
                let url = self.argument(&args[0])?;
                let url_sql = self.text(&url)?;
                let extensions = self.navigate(input, "extension")?;
                let url_path = JsonPath::from_fields(["url"]);
                let mut fragment = self.filter_elements(&extensions, |g, value| {
                    Ok(format!(
                        "{} = {url_sql}",
                        g.dialect().extract_text(value, &url_path)?
                    ))
                })?;
                fragment.absorb(&url);
                Ok(fragment)
            }
            "getResourceKey" => {
                let sql = if input.resource_root {
                    super::row_key_column(self.config())
                } else {
                    let id = self.navigate(input, "id")?;
                    self.text(&id)?
                };
                Ok(Fragment::derived(sql, Shape::Scalar, ValueKind::Text, &[input]))
            }
            "getReferenceKey" => {
                let resource_type = args
                    .first()
                    .map(|arg| type_name_argument("getReferenceKey", arg))
                    .transpose()?;
                let reference = self.navigate(input, "reference")?;
                let reference_sql = self.text(&reference)?;
                let sql = self
                    .dialect()
                    .reference_key(&reference_sql, resource_type.as_deref())?;
                Ok(Fragment::derived(sql, Shape::Scalar, ValueKind::Text, &[&reference]))
            }
            "today" => Ok(Fragment::new(
                self.dialect().current_temporal(TemporalKind::Date)?,
                Shape::Scalar,
                ValueKind::Temporal(SqlType::Date),
            )),
            _ => Ok(Fragment::new(
                self.dialect().current_temporal(TemporalKind::DateTime)?,
                Shape::Scalar,
                ValueKind::Temporal(SqlType::DateTime),
            )),
        }
    }

    /// `iif(criterion, true-result [, otherwise-result])`
    fn iif(&mut self, args: &[ExpressionNode]) -> TranslationResult<Fragment> {
        let criterion = self.argument(&args[0])?;
        let then = self.argument(&args[1])?;
        let otherwise = args.get(2).map(|arg| self.argument(arg)).transpose()?;

        let condition = self.condition(&criterion)?;
        let same_kind = otherwise.as_ref().is_none_or(|o| o.kind == then.kind);
        let value = |g: &Self, f: &Fragment| {
            if same_kind { Ok(f.sql.clone()) } else { g.json(f) }
        };
        let kind = if same_kind { then.kind } else { ValueKind::Json };
        let shape = match &otherwise {
            Some(o) if o.shape != then.shape => Shape::Collection,
            _ => then.shape,
        };

        let sql = match &otherwise {
            Some(o) => format!(
                "(CASE WHEN {condition} THEN {} ELSE {} END)",
                value(self, &then)?,
                value(self, o)?
            ),
            None => format!("(CASE WHEN {condition} THEN {} END)", value(self, &then)?),
        };
        let mut inputs = vec![&criterion, &then];
        inputs.extend(otherwise.as_ref());
        Ok(Fragment::derived(sql, shape, kind, &inputs))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TranslatorConfig;
    use crate::dialect::MockDialect;
    use crate::error::{TranslationError, TranslationResult};
    use crate::generator::{Arity, Clause, Fragment, Shape, SqlGenerator, ValueKind};
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
    fn test_where_filters_in_element_order() {
        let fragment = generate("name.where(use = 'official')").unwrap();
        assert!(fragment.sql.starts_with("(SELECT jsonb_agg(it_1.value ORDER BY it_1.ordinal)"));
        assert!(fragment.sql.contains("WITH ORDINALITY AS it_1(value, ordinal)"));
        assert!(fragment.sql.contains("WHERE ((it_1.value ->> 'use') = 'official'))"));
        assert_eq!(fragment.shape, Shape::Collection);
    }

    #[test]
    fn test_window_columns_only_when_referenced() {
        let plain = generate("name.where(use = 'official')").unwrap();
        assert!(!plain.sql.contains("ROW_NUMBER()"));

        let indexed = generate("name.where($index < 2)").unwrap();
        assert!(indexed.sql.contains("ROW_NUMBER() OVER (ORDER BY it_1.ordinal) - 1 AS idx"));
        assert!(indexed.sql.contains("(it_1.idx < 2)"));
        assert!(!indexed.sql.contains("COUNT(*) OVER ()"));

        let total = generate("name.select($total)").unwrap();
        assert!(total.sql.contains("COUNT(*) OVER () AS total"));
    }

    #[test]
    fn test_nested_iterations_bind_own_variables() {
        let fragment = generate("name.where(given.where($index = 0).exists())").unwrap();
        assert!(fragment.sql.contains("ORDER BY it_2.ordinal) - 1 AS idx"));
        assert!(!fragment.sql.contains("ORDER BY it_1.ordinal) - 1 AS idx"));
    }

    #[test]
    fn test_all_and_exists() {
        let all = generate("telecom.all(system = 'phone')").unwrap();
        assert!(all.sql.starts_with("(NOT EXISTS (SELECT 1 FROM jsonb_array_elements"));
        assert!(all.sql.contains("COALESCE(((it_1.value ->> 'system') = 'phone'), false) = false"));

        let exists = generate("telecom.exists(system = 'phone')").unwrap();
        assert!(exists.sql.starts_with("(EXISTS (SELECT 1 FROM"));

        let bare = generate("telecom.exists()").unwrap();
        assert!(bare.sql.starts_with("(jsonb_array_length("));
        assert_eq!(bare.kind, ValueKind::Boolean);
    }

    #[test]
    fn test_first_keeps_field() {
        let fragment = generate("name.family.first()").unwrap();
        assert_eq!(fragment.shape, Shape::Scalar);
        assert_eq!(fragment.field.as_deref(), Some("family"));
        assert!(fragment.sql.ends_with("-> (0)::int)"));
    }

    #[test]
    fn test_string_functions() {
        let upper = generate("name.family.first().upper()").unwrap();
        assert!(upper.sql.starts_with("upper("));
        assert_eq!(upper.kind, ValueKind::Text);

        let starts = generate("gender.startsWith('ma')").unwrap();
        assert_eq!(starts.sql, "starts_with((r.resource ->> 'gender'), 'ma')");

        let substring = generate("gender.substring(1, 2)").unwrap();
        assert_eq!(substring.sql, "substr((r.resource ->> 'gender'), (1) + 1, 2)");
    }

    #[test]
    fn test_math_and_aggregates() {
        let round = generate("multipleBirthInteger.round(2)").unwrap();
        assert!(round.sql.starts_with("round(("));
        assert!(round.sql.ends_with("::numeric, (2)::int)"));

        let sum = generate("contact.count().sum()").unwrap();
        assert!(sum.sql.starts_with("(SELECT sum("));
    }

    #[test]
    fn test_iif() {
        let fragment = generate("iif(active, 'yes', 'no')").unwrap();
        assert!(fragment.sql.starts_with("(CASE WHEN (SELECT CASE"));
        assert!(fragment.sql.ends_with("THEN 'yes' ELSE 'no' END)"));
        assert_eq!(fragment.kind, ValueKind::Text);
    }

    #[test]
    fn test_of_type_filters_elements() {
        let fragment = generate("telecom.value.ofType(string)").unwrap();
        assert!(fragment.sql.contains("jsonb_typeof(it_1.value) = 'string'"));
    }

    #[test]
    fn test_reference_key() {
        let fragment = generate("generalPractitioner.getReferenceKey(Practitioner)").unwrap();
        assert!(fragment.sql.starts_with("(CASE WHEN split_part("));
        assert!(fragment.sql.contains("= 'Practitioner'"));
    }

    #[test]
    fn test_resource_key_and_now() {
        assert_eq!(generate("getResourceKey()").unwrap().sql, "r.id");
        assert_eq!(generate("today()").unwrap().sql, "CURRENT_DATE");
    }

    #[test]
    fn test_argument_validation() {
        assert_eq!(
            generate("gender.upper('x')"),
            Err(TranslationError::ArgumentCount {
                function: "upper".into(),
                expected: Arity::exactly(0),
                got: 1,
            })
        );
        assert!(matches!(
            generate("name.frobnicate()"),
            Err(TranslationError::UnknownFunction { name }) if name == "frobnicate"
        ));
        assert!(matches!(
            generate("name.ofType(1 + 1)"),
            Err(TranslationError::InvalidArgument { .. })
        ));
    }
}
