//! Typed intermediate representation carried alongside generated SQL

use crate::config::ChoiceType;
use crate::dialect::{JsonPath, SqlType};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// How a fragment combines with the next path segment or operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    /// At most one value
    Scalar,
    /// Any number of values
    Collection,
    /// A SQL predicate
    Boolean,
}

/// SQL type of the fragment's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A JSON value taken from the document
    Json,
    /// SQL text
    Text,
    /// SQL number
    Numeric,
    /// SQL boolean
    Boolean,
    /// SQL date, timestamp or time
    Temporal(SqlType),
}

impl ValueKind {
    /// Name used in logs and in [`Translation`](crate::Translation) metadata
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Temporal(SqlType::Date) => "date",
            Self::Temporal(SqlType::Time) => "time",
            Self::Temporal(_) => "dateTime",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a path extraction should yield JSON or text
///
/// Derived from the surrounding operator and the literal operand types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionContext {
    /// Keep the JSON value
    ObjectOperation,
    /// Text compared against text; absent stays NULL
    TextComparison,
    /// Text for display or concatenation; absent becomes the empty string
    TextDisplay,
    /// The first element of a collection
    FilteredSingle,
    /// A whole collection handed to a collection primitive
    CollectionOperation,
}

/// Physical origin of a fragment that is a plain extraction
///
/// When present, the fragment's SQL is `extract_object(base, path)`, so the
/// same value can be re-extracted as text or extended without nesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// SQL expression holding the JSON document
    pub base: String,
    /// Path below `base`
    pub path: JsonPath,
}

/// A choice element awaiting resolution by `ofType`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSite {
    /// Document the variants live in
    pub base: String,
    /// The declared choice element
    pub choice: ChoiceType,
}

/// Generated SQL plus the facts later stages need about it
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// SQL expression text
    pub sql: String,
    /// Shape of the value
    pub shape: Shape,
    /// SQL type of the value
    pub kind: ValueKind,
    /// Field path from the resource root, when the fragment is a navigation
    pub source_path: Option<JsonPath>,
    /// Set while the fragment is a plain extraction
    pub anchor: Option<Anchor>,
    /// Last field navigated
    pub field: Option<String>,
    /// Set for choice elements that `ofType` can resolve
    pub choice: Option<Box<ChoiceSite>>,
    /// Whether this is the resource document itself
    pub resource_root: bool,
    /// Number of array-flattening extractions below this fragment
    pub array_nesting: usize,
    /// References the element alias of an enclosing iteration
    pub iteration_scoped: bool,
    /// Names of hoisted CTEs this fragment reads
    pub ctes: SmallVec<[String; 2]>,
}

impl Fragment {
    /// A computed value
    pub fn new(sql: impl Into<String>, shape: Shape, kind: ValueKind) -> Self {
        Self {
            sql: sql.into(),
            shape,
            kind,
            source_path: None,
            anchor: None,
            field: None,
            choice: None,
            resource_root: false,
            array_nesting: 0,
            iteration_scoped: false,
            ctes: SmallVec::new(),
        }
    }

    /// The row's JSON document
    pub fn resource_root(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            source_path: Some(JsonPath::root()),
            anchor: Some(Anchor {
                base: base.clone(),
                path: JsonPath::root(),
            }),
            resource_root: true,
            ..Self::new(base, Shape::Scalar, ValueKind::Json)
        }
    }

    /// The current element of an iteration
    pub fn element(value_sql: impl Into<String>) -> Self {
        let sql = value_sql.into();
        Self {
            source_path: Some(JsonPath::root()),
            anchor: Some(Anchor {
                base: sql.clone(),
                path: JsonPath::root(),
            }),
            iteration_scoped: true,
            ..Self::new(sql, Shape::Scalar, ValueKind::Json)
        }
    }

    /// SQL boolean predicate
    pub fn predicate(sql: impl Into<String>) -> Self {
        Self::new(sql, Shape::Boolean, ValueKind::Boolean)
    }

    /// SQL NULL standing for the empty collection
    pub fn empty() -> Self {
        Self::new("NULL", Shape::Collection, ValueKind::Json)
    }

    /// New value computed from `inputs`, inheriting their scope and CTE facts
    pub fn derived(
        sql: impl Into<String>,
        shape: Shape,
        kind: ValueKind,
        inputs: &[&Fragment],
    ) -> Self {
        let mut fragment = Self::new(sql, shape, kind);
        for input in inputs {
            fragment.absorb(input);
        }
        fragment
    }

    /// Take over the scope and CTE facts of another fragment
    pub fn absorb(&mut self, other: &Fragment) {
        self.iteration_scoped |= other.iteration_scoped;
        self.array_nesting = self.array_nesting.max(other.array_nesting);
        for cte in &other.ctes {
            if !self.ctes.contains(cte) {
                self.ctes.push(cte.clone());
            }
        }
    }

    /// Whether this value can hold several elements
    pub fn is_collection(&self) -> bool {
        self.shape == Shape::Collection
    }

    /// Whether this value is JSON
    pub fn is_json(&self) -> bool {
        self.kind == ValueKind::Json
    }

    /// Field path joined with dots, when the fragment is a navigation
    pub fn dotted_path(&self) -> Option<String> {
        self.source_path
            .as_ref()
            .filter(|p| !p.is_root())
            .map(JsonPath::dotted)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_root() {
        let root = Fragment::resource_root("r.resource");
        assert!(root.resource_root);
        assert_eq!(root.sql, "r.resource");
        assert_eq!(root.anchor.as_ref().unwrap().path, JsonPath::root());
        assert_eq!(root.dotted_path(), None);
    }

    #[test]
    fn test_derived_inherits_facts() {
        let mut hoisted = Fragment::new("x", Shape::Collection, ValueKind::Json);
        hoisted.ctes.push("cte_1".into());
        hoisted.array_nesting = 2;
        let element = Fragment::element("it_1.value");

        let combined = Fragment::derived("y", Shape::Scalar, ValueKind::Text, &[&hoisted, &element]);
        assert!(combined.iteration_scoped);
        assert_eq!(combined.array_nesting, 2);
        assert_eq!(combined.ctes.as_slice(), ["cte_1".to_string()]);
        assert!(combined.anchor.is_none());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ValueKind::Temporal(SqlType::DateTime).to_string(), "dateTime");
        assert_eq!(ValueKind::Numeric.to_string(), "numeric");
    }
}
