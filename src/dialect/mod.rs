//! SQL dialect abstraction
//!
//! The generator never writes backend-specific SQL itself. JSON navigation,
//! collection handling, casts and function-like primitives are all requested
//! from a [`Dialect`]. Portable constructs (`CASE`, `COALESCE`, `NULLIF`,
//! `EXISTS`, boolean connectives, arithmetic operators, window functions)
//! are emitted directly.
//!
//! Every method is mandatory. A backend that cannot express a primitive
//! returns [`DialectError`] instead of degrading silently.

pub mod mock;

pub use mock::MockDialect;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// A dialect lacks a primitive the translation needs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dialect '{dialect}' does not support {primitive}")]
pub struct DialectError {
    /// Dialect name
    pub dialect: String,
    /// Name of the missing primitive
    pub primitive: String,
}

impl DialectError {
    /// Create a new unsupported-primitive error
    pub fn unsupported(dialect: impl Into<String>, primitive: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            primitive: primitive.into(),
        }
    }
}

/// Result type for dialect primitives
pub type DialectResult<T> = Result<T, DialectError>;

/// Field path inside a JSON document, rooted at `$`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JsonPath {
    segments: SmallVec<[String; 4]>,
}

impl JsonPath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Path from a list of field names
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// This path extended by one field
    pub fn child(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    /// Whether this is the document root
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Field names from the root
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last field name
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Number of fields
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Fields joined with dots, without the `$` root (`name.given`)
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

/// Target types for [`Dialect::safe_cast`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// Whole numbers
    Integer,
    /// Arbitrary precision numbers
    Decimal,
    /// Character data
    Text,
    /// SQL boolean
    Boolean,
    /// Calendar date
    Date,
    /// Timestamp
    DateTime,
    /// Time of day
    Time,
    /// JSON value
    Json,
}

/// Scalar math primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    /// Absolute value
    Abs,
    /// Smallest integer not less than the argument
    Ceiling,
    /// Largest integer not greater than the argument
    Floor,
    /// Round to an optional precision
    Round,
    /// Drop the fractional part
    Truncate,
    /// Square root, empty for negative input
    Sqrt,
    /// Natural logarithm, empty for non-positive input
    Ln,
    /// Logarithm with an explicit base
    Log,
    /// e raised to the argument
    Exp,
}

impl MathFunction {
    /// Primitive name used in capability errors
    pub fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Ceiling => "ceiling",
            Self::Floor => "floor",
            Self::Round => "round",
            Self::Truncate => "truncate",
            Self::Sqrt => "sqrt",
            Self::Ln => "ln",
            Self::Log => "log",
            Self::Exp => "exp",
        }
    }
}

/// Aggregates over the elements of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    /// Sum of elements
    Sum,
    /// Smallest element
    Min,
    /// Largest element
    Max,
    /// Arithmetic mean
    Avg,
    /// Median
    Median,
    /// Sample standard deviation
    StdDev,
    /// Sample variance
    Variance,
}

impl AggregateFunction {
    /// Primitive name used in capability errors
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
            Self::Median => "median",
            Self::StdDev => "stdDev",
            Self::Variance => "variance",
        }
    }
}

/// String primitives with FHIRPath semantics (0-based positions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFunction {
    /// Prefix test
    StartsWith,
    /// Suffix test
    EndsWith,
    /// Substring test
    Contains,
    /// Replace every occurrence
    Replace,
    /// Substring from a 0-based start with optional length
    Substring,
    /// 0-based position of the first occurrence, -1 when absent
    IndexOf,
    /// Upper case
    Upper,
    /// Lower case
    Lower,
    /// Number of characters
    Length,
    /// Strip surrounding whitespace
    Trim,
}

impl StringFunction {
    /// Primitive name used in capability errors
    pub fn name(self) -> &'static str {
        match self {
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Contains => "contains",
            Self::Replace => "replace",
            Self::Substring => "substring",
            Self::IndexOf => "indexOf",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Length => "length",
            Self::Trim => "trim",
        }
    }
}

/// Direction of date arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateOperation {
    /// Move forward in time
    Add,
    /// Move backward in time
    Subtract,
}

/// Kind of "current time" value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    /// Today's date
    Date,
    /// Current timestamp
    DateTime,
}

/// Backend-specific SQL primitives
///
/// Implementations must be deterministic and free of side effects: the same
/// arguments always yield the same SQL text. A single instance is shared
/// read-only by every translation.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Dialect name, used in error messages
    fn name(&self) -> &str;

    // Path extraction

    /// JSON value at `path` below `base`
    fn extract_object(&self, base: &str, path: &JsonPath) -> DialectResult<String>;

    /// Text value at `path` below `base`; the root path unwraps a JSON scalar
    fn extract_text(&self, base: &str, path: &JsonPath) -> DialectResult<String>;

    /// Element at a 0-based index; a scalar behaves as a one-element array
    fn extract_array_element(&self, base: &str, index: &str) -> DialectResult<String>;

    /// Extract `next_field` from the value at `current_path` below `base`
    ///
    /// When that value is an array with exactly one element the field of that
    /// element is returned directly. For longer arrays the field is taken from
    /// every element and the results are flattened, in element order, into a
    /// new array. Otherwise the field is read from the object itself.
    /// `resolved_path` is `current_path` followed by `next_field`.
    fn extract_nested_array_path(
        &self,
        base: &str,
        current_path: &JsonPath,
        next_field: &str,
        resolved_path: &JsonPath,
    ) -> DialectResult<String>;

    // Iteration

    /// FROM-clause item enumerating the elements of `collection` as
    /// `alias.value` (JSON) and `alias.ordinal` (1-based); a scalar is one element
    fn iterate_elements(&self, collection: &str, alias: &str) -> DialectResult<String>;

    /// Aggregate rows into a JSON array ordered by `order_by`; no rows yields NULL
    fn aggregate_array(&self, value: &str, order_by: &str) -> DialectResult<String>;

    /// Convert a SQL scalar to JSON
    fn to_json(&self, expr: &str) -> DialectResult<String>;

    // Collections

    /// Union of two collections without duplicates
    fn union(&self, left: &str, right: &str) -> DialectResult<String>;

    /// Concatenation of two collections keeping duplicates
    fn combine(&self, left: &str, right: &str) -> DialectResult<String>;

    /// Whether `collection` holds the JSON value `item`
    fn contains(&self, collection: &str, item: &str) -> DialectResult<String>;

    /// Collection without duplicates
    fn distinct(&self, collection: &str) -> DialectResult<String>;

    /// Number of elements; absent counts as zero
    fn count(&self, collection: &str) -> DialectResult<String>;

    /// Whether the collection has any element
    fn exists(&self, collection: &str) -> DialectResult<String>;

    /// Whether the collection has no element
    fn empty(&self, collection: &str) -> DialectResult<String>;

    /// Elements after skipping `start`, limited to `length` when given
    fn slice(&self, collection: &str, start: &str, length: Option<&str>) -> DialectResult<String>;

    /// Text of all elements joined with `separator`
    fn join(&self, collection: &str, separator: &str) -> DialectResult<String>;

    /// Nested arrays spliced into one array
    fn flatten(&self, collection: &str) -> DialectResult<String>;

    // Arithmetic and aggregates

    /// `base` raised to `exponent`
    fn power(&self, base: &str, exponent: &str) -> DialectResult<String>;

    /// Scalar math function
    fn math(&self, function: MathFunction, args: &[String]) -> DialectResult<String>;

    /// Aggregate over the numeric elements of a collection
    fn aggregate(&self, function: AggregateFunction, collection: &str) -> DialectResult<String>;

    /// Continuous percentile of the numeric elements
    fn percentile(&self, collection: &str, fraction: &str) -> DialectResult<String>;

    /// Shift a date by `amount` calendar `unit`s
    fn date_arithmetic(
        &self,
        base: &str,
        op: DateOperation,
        amount: &str,
        unit: &str,
    ) -> DialectResult<String>;

    /// Current date or timestamp
    fn current_temporal(&self, kind: TemporalKind) -> DialectResult<String>;

    // Types

    /// Cast that yields NULL instead of failing on malformed input
    fn safe_cast(&self, expr: &str, target: SqlType) -> DialectResult<String>;

    /// JSON type name of a value (`object`, `array`, `string`, `number`, `boolean`, `null`)
    fn type_of(&self, expr: &str) -> DialectResult<String>;

    /// SQL boolean from a JSON boolean
    fn to_boolean(&self, expr: &str) -> DialectResult<String>;

    // Strings

    /// NULL-propagating concatenation of text values
    fn concat(&self, parts: &[String]) -> DialectResult<String>;

    /// String function applied to `target`
    fn string_function(
        &self,
        function: StringFunction,
        target: &str,
        args: &[String],
    ) -> DialectResult<String>;

    /// Regular expression test
    fn regex_match(&self, target: &str, pattern: &str) -> DialectResult<String>;

    /// Resource id from a reference string, optionally restricted to one resource type
    fn reference_key(&self, reference: &str, resource_type: Option<&str>) -> DialectResult<String>;
}
