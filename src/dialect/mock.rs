//! Deterministic PostgreSQL/JSONB flavoured dialect
//!
//! Used by the test suite, the documentation examples and the benchmarks.
//! Every collection primitive first normalises its input with an "as array"
//! wrapper, so scalars behave as one-element collections and absent values
//! as empty ones. Inputs are bound once through a derived table, keeping the
//! generated text linear in the nesting depth.

use super::{
    AggregateFunction, DateOperation, Dialect, DialectError, DialectResult, JsonPath,
    MathFunction, SqlType, StringFunction, TemporalKind,
};
use rustc_hash::FxHashSet;

/// PostgreSQL-style dialect over `jsonb` columns
#[derive(Debug, Clone, Default)]
pub struct MockDialect {
    unsupported: FxHashSet<String>,
}

impl MockDialect {
    /// Dialect supporting every primitive
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a primitive as unsupported, e.g. `"percentile"` or `"regex_match"`
    pub fn without(mut self, primitive: impl Into<String>) -> Self {
        self.unsupported.insert(primitive.into());
        self
    }

    fn check(&self, primitive: &str) -> DialectResult<()> {
        if self.unsupported.contains(primitive) {
            Err(DialectError::unsupported(self.name(), primitive))
        } else {
            Ok(())
        }
    }

    fn quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn path_literal(path: &JsonPath) -> String {
        let fields: Vec<String> = path
            .segments()
            .iter()
            .map(|s| s.replace('\'', "''"))
            .collect();
        format!("'{{{}}}'", fields.join(","))
    }

    /// Scalars become one-element arrays, NULL and JSON null become empty arrays
    fn as_array(collection: &str) -> String {
        format!(
            "(SELECT CASE WHEN a.v IS NULL OR jsonb_typeof(a.v) = 'null' THEN '[]'::jsonb \
             WHEN jsonb_typeof(a.v) = 'array' THEN a.v ELSE jsonb_build_array(a.v) END \
             FROM (SELECT {collection} AS v) AS a)"
        )
    }

    fn numeric_element(alias: &str) -> String {
        format!("({alias}.value #>> '{{}}')::numeric")
    }
}

impl Dialect for MockDialect {
    fn name(&self) -> &str {
        "mock"
    }

    fn extract_object(&self, base: &str, path: &JsonPath) -> DialectResult<String> {
        self.check("extract_object")?;
        Ok(match path.depth() {
            0 => base.to_string(),
            1 => format!("({base} -> {})", Self::quote(&path.segments()[0])),
            _ => format!("({base} #> {})", Self::path_literal(path)),
        })
    }

    fn extract_text(&self, base: &str, path: &JsonPath) -> DialectResult<String> {
        self.check("extract_text")?;
        Ok(match path.depth() {
            1 => format!("({base} ->> {})", Self::quote(&path.segments()[0])),
            _ => format!("({base} #>> {})", Self::path_literal(path)),
        })
    }

    fn extract_array_element(&self, base: &str, index: &str) -> DialectResult<String> {
        self.check("extract_array_element")?;
        Ok(format!("({} -> ({index})::int)", Self::as_array(base)))
    }

    fn extract_nested_array_path(
        &self,
        base: &str,
        current_path: &JsonPath,
        next_field: &str,
        _resolved_path: &JsonPath,
    ) -> DialectResult<String> {
        self.check("extract_nested_array_path")?;
        let parent = self.extract_object(base, current_path)?;
        let field = Self::quote(next_field);
        Ok(format!(
            "(SELECT CASE \
             WHEN jsonb_typeof(p.v) = 'array' AND jsonb_array_length(p.v) = 1 THEN p.v -> 0 -> {field} \
             WHEN jsonb_typeof(p.v) = 'array' THEN \
             (SELECT jsonb_agg(f.value ORDER BY e.ordinal, f.ordinal) \
             FROM jsonb_array_elements(p.v) WITH ORDINALITY AS e(value, ordinal) \
             CROSS JOIN LATERAL jsonb_array_elements(CASE WHEN jsonb_typeof(e.value -> {field}) = 'array' \
             THEN e.value -> {field} ELSE jsonb_build_array(e.value -> {field}) END) \
             WITH ORDINALITY AS f(value, ordinal) \
             WHERE f.value IS NOT NULL AND jsonb_typeof(f.value) <> 'null') \
             ELSE p.v -> {field} END \
             FROM (SELECT {parent} AS v) AS p)"
        ))
    }

    fn iterate_elements(&self, collection: &str, alias: &str) -> DialectResult<String> {
        self.check("iterate_elements")?;
        Ok(format!(
            "jsonb_array_elements({}) WITH ORDINALITY AS {alias}(value, ordinal)",
            Self::as_array(collection)
        ))
    }

    fn aggregate_array(&self, value: &str, order_by: &str) -> DialectResult<String> {
        self.check("aggregate_array")?;
        Ok(format!("jsonb_agg({value} ORDER BY {order_by})"))
    }

    fn to_json(&self, expr: &str) -> DialectResult<String> {
        self.check("to_json")?;
        Ok(format!("to_jsonb({expr})"))
    }

    fn union(&self, left: &str, right: &str) -> DialectResult<String> {
        self.check("union")?;
        Ok(format!(
            "(SELECT jsonb_agg(u.value) FROM (\
             SELECT value FROM jsonb_array_elements({}) \
             UNION SELECT value FROM jsonb_array_elements({})) AS u)",
            Self::as_array(left),
            Self::as_array(right)
        ))
    }

    fn combine(&self, left: &str, right: &str) -> DialectResult<String> {
        self.check("combine")?;
        Ok(format!(
            "(SELECT jsonb_agg(c.value ORDER BY c.side, c.ordinal) FROM (\
             SELECT 1 AS side, value, ordinal FROM jsonb_array_elements({}) WITH ORDINALITY AS cl(value, ordinal) \
             UNION ALL SELECT 2 AS side, value, ordinal FROM jsonb_array_elements({}) WITH ORDINALITY AS cr(value, ordinal)) AS c)",
            Self::as_array(left),
            Self::as_array(right)
        ))
    }

    fn contains(&self, collection: &str, item: &str) -> DialectResult<String> {
        self.check("contains")?;
        Ok(format!(
            "({} @> jsonb_build_array({item}))",
            Self::as_array(collection)
        ))
    }

    fn distinct(&self, collection: &str) -> DialectResult<String> {
        self.check("distinct")?;
        Ok(format!(
            "(SELECT jsonb_agg(d.value ORDER BY d.first_ordinal) FROM (\
             SELECT value, min(ordinal) AS first_ordinal \
             FROM jsonb_array_elements({}) WITH ORDINALITY AS x(value, ordinal) GROUP BY value) AS d)",
            Self::as_array(collection)
        ))
    }

    fn count(&self, collection: &str) -> DialectResult<String> {
        self.check("count")?;
        Ok(format!("jsonb_array_length({})", Self::as_array(collection)))
    }

    fn exists(&self, collection: &str) -> DialectResult<String> {
        self.check("exists")?;
        Ok(format!("(jsonb_array_length({}) > 0)", Self::as_array(collection)))
    }

    fn empty(&self, collection: &str) -> DialectResult<String> {
        self.check("empty")?;
        Ok(format!("(jsonb_array_length({}) = 0)", Self::as_array(collection)))
    }

    fn slice(&self, collection: &str, start: &str, length: Option<&str>) -> DialectResult<String> {
        self.check("slice")?;
        let upper = length
            .map(|len| format!(" AND s.ordinal <= ({start}) + ({len})"))
            .unwrap_or_default();
        Ok(format!(
            "(SELECT jsonb_agg(s.value ORDER BY s.ordinal) \
             FROM jsonb_array_elements({}) WITH ORDINALITY AS s(value, ordinal) \
             WHERE s.ordinal > ({start}){upper})",
            Self::as_array(collection)
        ))
    }

    fn join(&self, collection: &str, separator: &str) -> DialectResult<String> {
        self.check("join")?;
        Ok(format!(
            "(SELECT string_agg(j.value, {separator} ORDER BY j.ordinal) \
             FROM jsonb_array_elements_text({}) WITH ORDINALITY AS j(value, ordinal))",
            Self::as_array(collection)
        ))
    }

    fn flatten(&self, collection: &str) -> DialectResult<String> {
        self.check("flatten")?;
        Ok(format!(
            "(SELECT jsonb_agg(f.value ORDER BY o.ordinal, f.ordinal) \
             FROM jsonb_array_elements({}) WITH ORDINALITY AS o(value, ordinal) \
             CROSS JOIN LATERAL jsonb_array_elements(CASE WHEN jsonb_typeof(o.value) = 'array' \
             THEN o.value ELSE jsonb_build_array(o.value) END) WITH ORDINALITY AS f(value, ordinal))",
            Self::as_array(collection)
        ))
    }

    fn power(&self, base: &str, exponent: &str) -> DialectResult<String> {
        self.check("power")?;
        Ok(format!("power({base}, {exponent})"))
    }

    fn math(&self, function: MathFunction, args: &[String]) -> DialectResult<String> {
        self.check(function.name())?;
        let arg = |i: usize| {
            args.get(i)
                .cloned()
                .ok_or_else(|| DialectError::unsupported(self.name(), function.name()))
        };
        let x = arg(0)?;
        Ok(match function {
            MathFunction::Abs => format!("abs({x})"),
            MathFunction::Ceiling => format!("ceil({x})"),
            MathFunction::Floor => format!("floor({x})"),
            MathFunction::Round => match args.get(1) {
                Some(precision) => format!("round(({x})::numeric, ({precision})::int)"),
                None => format!("round(({x})::numeric)"),
            },
            MathFunction::Truncate => format!("trunc({x})"),
            MathFunction::Sqrt => format!("(CASE WHEN {x} < 0 THEN NULL ELSE sqrt({x}) END)"),
            MathFunction::Ln => format!("(CASE WHEN {x} <= 0 THEN NULL ELSE ln({x}) END)"),
            MathFunction::Log => {
                let base = arg(1)?;
                format!("(CASE WHEN {x} <= 0 OR {base} <= 0 THEN NULL ELSE log({base}, {x}) END)")
            }
            MathFunction::Exp => format!("exp({x})"),
        })
    }

    fn aggregate(&self, function: AggregateFunction, collection: &str) -> DialectResult<String> {
        self.check(function.name())?;
        let value = Self::numeric_element("g");
        let aggregate = match function {
            AggregateFunction::Sum => format!("sum({value})"),
            AggregateFunction::Min => format!("min({value})"),
            AggregateFunction::Max => format!("max({value})"),
            AggregateFunction::Avg => format!("avg({value})"),
            AggregateFunction::Median => {
                format!("percentile_cont(0.5) WITHIN GROUP (ORDER BY {value})")
            }
            AggregateFunction::StdDev => format!("stddev_samp({value})"),
            AggregateFunction::Variance => format!("var_samp({value})"),
        };
        Ok(format!(
            "(SELECT {aggregate} FROM jsonb_array_elements({}) AS g(value))",
            Self::as_array(collection)
        ))
    }

    fn percentile(&self, collection: &str, fraction: &str) -> DialectResult<String> {
        self.check("percentile")?;
        Ok(format!(
            "(SELECT percentile_cont({fraction}) WITHIN GROUP (ORDER BY {}) \
             FROM jsonb_array_elements({}) AS g(value))",
            Self::numeric_element("g"),
            Self::as_array(collection)
        ))
    }

    fn date_arithmetic(
        &self,
        base: &str,
        op: DateOperation,
        amount: &str,
        unit: &str,
    ) -> DialectResult<String> {
        self.check("date_arithmetic")?;
        let sign = match op {
            DateOperation::Add => "+",
            DateOperation::Subtract => "-",
        };
        let unit = unit.trim_end_matches('s');
        Ok(format!(
            "({base} {sign} ({amount}) * INTERVAL {})",
            Self::quote(&format!("1 {unit}"))
        ))
    }

    fn current_temporal(&self, kind: TemporalKind) -> DialectResult<String> {
        self.check("current_temporal")?;
        Ok(match kind {
            TemporalKind::Date => "CURRENT_DATE".to_string(),
            TemporalKind::DateTime => "CURRENT_TIMESTAMP".to_string(),
        })
    }

    fn safe_cast(&self, expr: &str, target: SqlType) -> DialectResult<String> {
        self.check("safe_cast")?;
        let guarded = |pattern: &str, sql_type: &str| {
            format!(
                "(SELECT CASE WHEN c.v ~ '{pattern}' THEN c.v::{sql_type} END \
                 FROM (SELECT ({expr})::text AS v) AS c)"
            )
        };
        Ok(match target {
            SqlType::Integer => guarded("^[+-]?[0-9]+$", "bigint"),
            SqlType::Decimal => guarded("^[+-]?([0-9]+(\\.[0-9]*)?|\\.[0-9]+)$", "numeric"),
            SqlType::Date => guarded("^[0-9]{4}(-[0-9]{2}(-[0-9]{2})?)?$", "date"),
            SqlType::DateTime => guarded("^[0-9]{4}-[0-9]{2}-[0-9]{2}T", "timestamptz"),
            SqlType::Time => guarded("^[0-9]{2}(:[0-9]{2}(:[0-9]{2}(\\.[0-9]+)?)?)?$", "time"),
            SqlType::Boolean => format!(
                "(CASE lower(({expr})::text) WHEN 'true' THEN true WHEN 'false' THEN false END)"
            ),
            SqlType::Text => format!("({expr})::text"),
            SqlType::Json => format!("to_jsonb({expr})"),
        })
    }

    fn type_of(&self, expr: &str) -> DialectResult<String> {
        self.check("type_of")?;
        Ok(format!("jsonb_typeof({expr})"))
    }

    fn to_boolean(&self, expr: &str) -> DialectResult<String> {
        self.check("to_boolean")?;
        Ok(format!(
            "(SELECT CASE WHEN jsonb_typeof(b.v) = 'boolean' THEN (b.v)::boolean \
             WHEN jsonb_typeof(b.v) = 'array' AND jsonb_array_length(b.v) = 1 \
             AND jsonb_typeof(b.v -> 0) = 'boolean' THEN (b.v -> 0)::boolean END \
             FROM (SELECT {expr} AS v) AS b)"
        ))
    }

    fn concat(&self, parts: &[String]) -> DialectResult<String> {
        self.check("concat")?;
        Ok(format!("({})", parts.join(" || ")))
    }

    fn string_function(
        &self,
        function: StringFunction,
        target: &str,
        args: &[String],
    ) -> DialectResult<String> {
        self.check(function.name())?;
        let arg = |i: usize| {
            args.get(i)
                .cloned()
                .ok_or_else(|| DialectError::unsupported(self.name(), function.name()))
        };
        Ok(match function {
            StringFunction::StartsWith => format!("starts_with({target}, {})", arg(0)?),
            StringFunction::EndsWith => {
                let suffix = arg(0)?;
                format!("(right({target}, length({suffix})) = {suffix})")
            }
            StringFunction::Contains => format!("(strpos({target}, {}) > 0)", arg(0)?),
            StringFunction::Replace => format!("replace({target}, {}, {})", arg(0)?, arg(1)?),
            StringFunction::Substring => match args.get(1) {
                Some(length) => format!("substr({target}, ({}) + 1, {length})", arg(0)?),
                None => format!("substr({target}, ({}) + 1)", arg(0)?),
            },
            StringFunction::IndexOf => format!("(strpos({target}, {}) - 1)", arg(0)?),
            StringFunction::Upper => format!("upper({target})"),
            StringFunction::Lower => format!("lower({target})"),
            StringFunction::Length => format!("length({target})"),
            StringFunction::Trim => format!("trim({target})"),
        })
    }

    fn regex_match(&self, target: &str, pattern: &str) -> DialectResult<String> {
        self.check("regex_match")?;
        Ok(format!("({target} ~ {pattern})"))
    }

    fn reference_key(&self, reference: &str, resource_type: Option<&str>) -> DialectResult<String> {
        self.check("reference_key")?;
        Ok(match resource_type {
            Some(ty) => format!(
                "(CASE WHEN split_part({reference}, '/', 1) = {} THEN split_part({reference}, '/', 2) END)",
                Self::quote(ty)
            ),
            None => format!("split_part({reference}, '/', 2)"),
        })
    }
}
