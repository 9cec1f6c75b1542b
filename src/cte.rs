//! Common table expression hoisting
//!
//! Array navigation below the first level produces correlated subqueries
//! that grow with every further step. Outside WHERE clauses the
//! [`CteBuilder`] moves such fragments into named CTEs keyed by the row's
//! primary key and replaces them with a lookup. WHERE predicates always stay
//! inline so the backend can use them as plain boolean conditions.

use crate::config::TranslatorConfig;
use crate::generator::{Clause, Fragment};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::fmt;

/// Column of a hoisted CTE holding the row key
pub const ROW_KEY_COLUMN: &str = "row_key";

/// Column of a hoisted CTE holding the hoisted value
pub const VALUE_COLUMN: &str = "value";

/// Named subqueries of one translation, in registration order
///
/// Names come from a sequence owned by the registry, so two registries fed
/// the same fragments produce the same names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CteRegistry {
    prefix: String,
    definitions: IndexMap<String, String>,
    by_body: FxHashMap<String, String>,
    sequence: usize,
}

impl CteRegistry {
    /// Empty registry naming its entries `{prefix}_1`, `{prefix}_2`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Register a subquery and return its name
    ///
    /// A body registered before keeps its first name.
    pub fn register(&mut self, body: impl Into<String>) -> String {
        let body = body.into();
        if let Some(name) = self.by_body.get(&body) {
            return name.clone();
        }
        self.sequence += 1;
        let name = format!("{}_{}", self.prefix, self.sequence);
        self.by_body.insert(body.clone(), name.clone());
        self.definitions.insert(name.clone(), body);
        name
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Body of a registered CTE
    pub fn get(&self, name: &str) -> Option<&str> {
        self.definitions.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// `(name, body)` pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.definitions
            .iter()
            .map(|(name, body)| (name.as_str(), body.as_str()))
    }

    /// Name to body mapping in registration order
    pub fn definitions(&self) -> &IndexMap<String, String> {
        &self.definitions
    }

    /// `WITH a AS (...), b AS (...)`, or `None` when nothing was hoisted
    pub fn with_clause(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let entries: Vec<String> = self
            .iter()
            .map(|(name, body)| format!("{name} AS ({body})"))
            .collect();
        Some(format!("WITH {}", entries.join(", ")))
    }
}

/// What triggered a hoist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoistReason {
    /// Fragment appears outside a WHERE clause
    OutsideWhere,
    /// Array navigation nests too deep
    Nesting,
    /// Fragment text is too long
    Length,
    /// Fragment holds too many subqueries
    Subqueries,
    /// The same path is referenced more than once
    Repeated,
}

impl fmt::Display for HoistReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OutsideWhere => "outside WHERE",
            Self::Nesting => "nesting depth",
            Self::Length => "fragment length",
            Self::Subqueries => "subquery count",
            Self::Repeated => "repeated path",
        })
    }
}

/// Outcome of [`CteBuilder::decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CteDecision {
    Inline,
    Hoist(HoistReason),
}

/// Decides per fragment whether to inline it or hoist it into a CTE
#[derive(Debug)]
pub struct CteBuilder<'a> {
    config: &'a TranslatorConfig,
    row_filter: Option<String>,
    registry: CteRegistry,
}

impl<'a> CteBuilder<'a> {
    /// Builder for one translation; `row_filter` restricts the rows each CTE scans
    pub fn new(config: &'a TranslatorConfig, row_filter: Option<String>) -> Self {
        Self {
            config,
            row_filter,
            registry: CteRegistry::new(config.cte.name_prefix.clone()),
        }
    }

    pub fn registry(&self) -> &CteRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> CteRegistry {
        self.registry
    }

    /// Inline or hoist `fragment`, generated for `clause` and whose path occurs `references` times
    pub fn decide(&self, fragment: &Fragment, clause: Clause, references: usize) -> CteDecision {
        let settings = &self.config.cte;
        if clause == Clause::Where || !settings.enabled {
            return CteDecision::Inline;
        }
        // the element alias only exists inside the enclosing iteration
        if fragment.iteration_scoped {
            return CteDecision::Inline;
        }
        if let Some(missing) = fragment.ctes.iter().find(|name| !self.registry.contains(name)) {
            log::debug!("keeping fragment inline: it depends on undefined CTE {missing}");
            return CteDecision::Inline;
        }

        let subqueries = fragment.sql.matches("SELECT").count();
        let reason = if settings.hoist_outside_where {
            Some(HoistReason::OutsideWhere)
        } else if fragment.array_nesting > settings.max_inline_nesting {
            Some(HoistReason::Nesting)
        } else if fragment.sql.len() > settings.max_inline_length {
            Some(HoistReason::Length)
        } else if subqueries > settings.max_inline_subqueries {
            Some(HoistReason::Subqueries)
        } else if references > 1 {
            Some(HoistReason::Repeated)
        } else {
            None
        };
        reason.map_or(CteDecision::Inline, CteDecision::Hoist)
    }

    /// Apply [`decide`](Self::decide), returning the fragment to use in place of `fragment`
    pub fn process(&mut self, fragment: Fragment, clause: Clause, references: usize) -> Fragment {
        let CteDecision::Hoist(reason) = self.decide(&fragment, clause, references) else {
            return fragment;
        };

        let config = self.config;
        let key = format!("{}.{}", config.table_alias, config.id_column);
        let filter = self
            .row_filter
            .as_ref()
            .map(|filter| format!(" WHERE {filter}"))
            .unwrap_or_default();
        let body = format!(
            "SELECT {key} AS {ROW_KEY_COLUMN}, {} AS {VALUE_COLUMN} FROM {} AS {}{filter}",
            fragment.sql, config.table, config.table_alias
        );
        let name = self.registry.register(body);
        log::debug!("hoisted {} into {name} ({reason})", fragment.dotted_path().unwrap_or_default());

        let mut ctes = fragment.ctes.clone();
        if !ctes.contains(&name) {
            ctes.push(name.clone());
        }
        Fragment {
            sql: format!(
                "(SELECT {name}.{VALUE_COLUMN} FROM {name} WHERE {name}.{ROW_KEY_COLUMN} = {key})"
            ),
            anchor: None,
            choice: None,
            ctes,
            ..fragment
        }
    }
}
