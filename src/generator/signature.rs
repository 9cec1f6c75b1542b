//! Function signatures for argument count validation

use crate::error::{TranslationError, TranslationResult};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accepted number of arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arity {
    /// Minimum number of arguments
    pub min: usize,
    /// Maximum number of arguments (None for variadic)
    pub max: Option<usize>,
}

impl Arity {
    /// Exactly `n` arguments
    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// Between `min` and `max` arguments, inclusive
    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// `min` or more arguments
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    /// Whether `count` arguments are accepted
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{max}", self.min),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Function families, used to route code generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCategory {
    /// Arguments evaluated once per input element
    Iteration,
    /// Collection shaping and testing
    Collection,
    /// Text manipulation
    String,
    /// Type conversion
    Conversion,
    /// Scalar math
    Math,
    /// Aggregates over a collection
    Aggregate,
    /// Everything else
    Utility,
}

/// A supported function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Function name
    pub name: &'static str,
    /// Accepted argument counts
    pub arity: Arity,
    /// Function family
    pub category: FunctionCategory,
}

const fn sig(name: &'static str, arity: Arity, category: FunctionCategory) -> FunctionSignature {
    FunctionSignature {
        name,
        arity,
        category,
    }
}

use FunctionCategory as C;

const NONE: Arity = Arity::exactly(0);
const ONE: Arity = Arity::exactly(1);
const OPTIONAL: Arity = Arity::range(0, 1);

const SIGNATURES: &[FunctionSignature] = &[
    sig("where", ONE, C::Iteration),
    sig("select", ONE, C::Iteration),
    sig("all", ONE, C::Iteration),
    sig("exists", OPTIONAL, C::Iteration),
    sig("empty", NONE, C::Collection),
    sig("count", NONE, C::Collection),
    sig("first", NONE, C::Collection),
    sig("last", NONE, C::Collection),
    sig("single", NONE, C::Collection),
    sig("tail", NONE, C::Collection),
    sig("skip", ONE, C::Collection),
    sig("take", ONE, C::Collection),
    sig("distinct", NONE, C::Collection),
    sig("isDistinct", NONE, C::Collection),
    sig("union", ONE, C::Collection),
    sig("combine", ONE, C::Collection),
    sig("allTrue", NONE, C::Collection),
    sig("anyTrue", NONE, C::Collection),
    sig("allFalse", NONE, C::Collection),
    sig("anyFalse", NONE, C::Collection),
    sig("join", OPTIONAL, C::Collection),
    sig("ofType", ONE, C::Collection),
    sig("hasValue", NONE, C::Collection),
    sig("not", NONE, C::Collection),
    sig("startsWith", ONE, C::String),
    sig("endsWith", ONE, C::String),
    sig("contains", ONE, C::String),
    sig("matches", ONE, C::String),
    sig("replace", Arity::exactly(2), C::String),
    sig("substring", Arity::range(1, 2), C::String),
    sig("indexOf", ONE, C::String),
    sig("upper", NONE, C::String),
    sig("lower", NONE, C::String),
    sig("length", NONE, C::String),
    sig("trim", NONE, C::String),
    sig("toString", NONE, C::Conversion),
    sig("toInteger", NONE, C::Conversion),
    sig("toDecimal", NONE, C::Conversion),
    sig("toBoolean", NONE, C::Conversion),
    sig("abs", NONE, C::Math),
    sig("ceiling", NONE, C::Math),
    sig("floor", NONE, C::Math),
    sig("round", OPTIONAL, C::Math),
    sig("truncate", NONE, C::Math),
    sig("sqrt", NONE, C::Math),
    sig("ln", NONE, C::Math),
    sig("log", ONE, C::Math),
    sig("exp", NONE, C::Math),
    sig("power", ONE, C::Math),
    sig("sum", NONE, C::Aggregate),
    sig("min", NONE, C::Aggregate),
    sig("max", NONE, C::Aggregate),
    sig("avg", NONE, C::Aggregate),
    sig("median", NONE, C::Aggregate),
    sig("stdDev", NONE, C::Aggregate),
    sig("variance", NONE, C::Aggregate),
    sig("percentile", ONE, C::Aggregate),
    sig("iif", Arity::range(2, 3), C::Utility),
    sig("extension", ONE, C::Utility),
    sig("getResourceKey", NONE, C::Utility),
    sig("getReferenceKey", OPTIONAL, C::Utility),
    sig("today", NONE, C::Utility),
    sig("now", NONE, C::Utility),
];

static SIGNATURE_TABLE: Lazy<FxHashMap<&'static str, &'static FunctionSignature>> =
    Lazy::new(|| SIGNATURES.iter().map(|s| (s.name, s)).collect());

/// Signature of a supported function
pub fn lookup(name: &str) -> Option<&'static FunctionSignature> {
    SIGNATURE_TABLE.get(name).copied()
}

/// Resolve a function and validate its argument count
pub fn resolve(name: &str, arg_count: usize) -> TranslationResult<&'static FunctionSignature> {
    let signature = lookup(name).ok_or_else(|| TranslationError::UnknownFunction {
        name: name.to_string(),
    })?;
    if !signature.arity.accepts(arg_count) {
        return Err(TranslationError::ArgumentCount {
            function: name.to_string(),
            expected: signature.arity,
            got: arg_count,
        });
    }
    Ok(signature)
}

/// Names of all supported functions
pub fn function_names() -> impl Iterator<Item = &'static str> {
    SIGNATURES.iter().map(|s| s.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::exactly(0).to_string(), "0");
        assert_eq!(Arity::range(0, 1).to_string(), "0..1");
        assert_eq!(Arity::range(2, 3).to_string(), "2..3");
        assert_eq!(Arity::at_least(1).to_string(), "at least 1");
    }

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::range(1, 2).accepts(2));
        assert!(!Arity::range(1, 2).accepts(0));
        assert!(Arity::at_least(1).accepts(7));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("where", 1).unwrap().category, FunctionCategory::Iteration);
        assert!(matches!(
            resolve("frobnicate", 0),
            Err(TranslationError::UnknownFunction { name }) if name == "frobnicate"
        ));
        assert_eq!(
            resolve("upper", 1),
            Err(TranslationError::ArgumentCount {
                function: "upper".to_string(),
                expected: Arity::exactly(0),
                got: 1,
            })
        );
    }

    #[test]
    fn test_table_has_no_duplicates() {
        assert_eq!(SIGNATURE_TABLE.len(), SIGNATURES.len());
        assert!(function_names().any(|n| n == "getReferenceKey"));
    }
}
