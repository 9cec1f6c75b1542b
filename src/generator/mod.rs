//! SQL generation from FHIRPath expressions
//!
//! [`SqlGenerator`] walks the AST with the [`Visitor`] trait and produces one
//! [`Fragment`] per node. Literal, path, operator and function handling live
//! in their own modules as `impl` blocks on the generator; JSON access and
//! other backend-specific SQL always goes through the [`Dialect`].

mod function;
mod literal;
mod operator;
mod path;

pub mod fragment;
pub mod scope;
pub mod signature;

pub use fragment::{Anchor, ChoiceSite, ExtractionContext, Fragment, Shape, ValueKind};
pub use literal::quote_literal;
pub use scope::{IterationFrame, ScopeStack};
pub use signature::{Arity, FunctionCategory, FunctionSignature};

use crate::ast::{
    BinaryOperator, ContextVariable, ExpressionNode, LiteralValue, PathReferenceCounter,
    UnaryOperator, Visitor, walk_expression,
};
use crate::config::TranslatorConfig;
use crate::cte::{CteBuilder, CteRegistry};
use crate::dialect::{Dialect, JsonPath, SqlType};
use crate::error::{TranslationError, TranslationResult};

/// Part of the final query a fragment is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clause {
    /// SELECT list; array navigation may be hoisted into CTEs
    Select,
    /// WHERE predicate; everything stays inline
    Where,
}

/// Generates SQL for one translation call
///
/// Owns every piece of mutable state a translation needs (scope stack, alias
/// sequence, CTE registry), so separate calls never share anything but the
/// dialect and the configuration.
pub struct SqlGenerator<'a> {
    dialect: &'a dyn Dialect,
    config: &'a TranslatorConfig,
    resource_type: Option<String>,
    clause: Clause,
    scopes: ScopeStack,
    ctes: CteBuilder<'a>,
    references: PathReferenceCounter,
    alias_sequence: usize,
    depth: usize,
}

impl<'a> SqlGenerator<'a> {
    /// Create a generator for rows of `resource_type` (all rows when `None`)
    pub fn new(
        dialect: &'a dyn Dialect,
        config: &'a TranslatorConfig,
        resource_type: Option<&str>,
        clause: Clause,
    ) -> TranslationResult<Self> {
        let root = Fragment::resource_root(document_column(config));
        let row_filter = resource_type
            .map(|ty| resource_type_filter(dialect, config, ty))
            .transpose()?;
        Ok(Self {
            dialect,
            config,
            resource_type: resource_type.map(str::to_string),
            clause,
            scopes: ScopeStack::new(root),
            ctes: CteBuilder::new(config, row_filter),
            references: PathReferenceCounter::default(),
            alias_sequence: 0,
            depth: 0,
        })
    }

    /// Generate the fragment of a whole expression
    pub fn generate(&mut self, expr: &ExpressionNode) -> TranslationResult<Fragment> {
        self.references = PathReferenceCounter::of(expr);
        self.visit_expression(expr)
    }

    /// Hoisted CTEs, in registration order
    pub fn ctes(&self) -> &CteRegistry {
        self.ctes.registry()
    }

    /// Consume the generator, keeping its CTE registry
    pub fn into_ctes(self) -> CteRegistry {
        self.ctes.into_registry()
    }

    pub(crate) fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    pub(crate) fn config(&self) -> &'a TranslatorConfig {
        self.config
    }

    pub(crate) fn fresh_alias(&mut self) -> String {
        self.alias_sequence += 1;
        format!("it_{}", self.alias_sequence)
    }

    /// Run `f` with `focus` as the current path focus
    pub(crate) fn with_segment<T>(
        &mut self,
        focus: Fragment,
        f: impl FnOnce(&mut Self) -> TranslationResult<T>,
    ) -> TranslationResult<T> {
        self.scopes.push_segment(focus);
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Run `f` against the enclosing scope focus, as function arguments are
    pub(crate) fn with_argument_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> TranslationResult<T>,
    ) -> TranslationResult<T> {
        self.scopes.push_argument_scope();
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Run `f` with the elements bound by `frame` as `$this`
    pub(crate) fn with_iteration<T>(
        &mut self,
        frame: IterationFrame,
        f: impl FnOnce(&mut Self) -> TranslationResult<T>,
    ) -> TranslationResult<T> {
        self.scopes.push_iteration(frame);
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Generate an argument against the enclosing scope focus
    pub(crate) fn argument(&mut self, arg: &ExpressionNode) -> TranslationResult<Fragment> {
        self.with_argument_scope(|g| g.visit_expression(arg))
    }

    // Value coercions

    /// SQL for `fragment` in the given extraction context
    pub fn materialize(
        &self,
        fragment: &Fragment,
        context: ExtractionContext,
    ) -> TranslationResult<String> {
        match context {
            ExtractionContext::ObjectOperation | ExtractionContext::CollectionOperation => {
                self.json(fragment)
            }
            ExtractionContext::FilteredSingle => self.single(fragment),
            ExtractionContext::TextComparison => self.text(fragment),
            ExtractionContext::TextDisplay => Ok(format!("COALESCE({}, '')", self.text(fragment)?)),
        }
    }

    /// JSON value of the fragment
    pub(crate) fn json(&self, fragment: &Fragment) -> TranslationResult<String> {
        match fragment.kind {
            ValueKind::Json => Ok(fragment.sql.clone()),
            // string literals carry no SQL type of their own
            ValueKind::Text => {
                let text = self.dialect.safe_cast(&fragment.sql, SqlType::Text)?;
                Ok(self.dialect.to_json(&text)?)
            }
            _ => Ok(self.dialect.to_json(&fragment.sql)?),
        }
    }

    /// JSON value of the first element for collections, the value itself otherwise
    pub(crate) fn single(&self, fragment: &Fragment) -> TranslationResult<String> {
        if fragment.is_json() && fragment.is_collection() {
            Ok(self.dialect.extract_array_element(&fragment.sql, "0")?)
        } else {
            self.json(fragment)
        }
    }

    /// Text of a single value
    pub(crate) fn text(&self, fragment: &Fragment) -> TranslationResult<String> {
        match fragment.kind {
            ValueKind::Text => Ok(fragment.sql.clone()),
            ValueKind::Json if fragment.is_collection() => {
                let first = self.dialect.extract_array_element(&fragment.sql, "0")?;
                Ok(self.dialect.extract_text(&first, &JsonPath::root())?)
            }
            ValueKind::Json => match &fragment.anchor {
                Some(anchor) if !anchor.path.is_root() => {
                    Ok(self.dialect.extract_text(&anchor.base, &anchor.path)?)
                }
                _ => Ok(self.dialect.extract_text(&fragment.sql, &JsonPath::root())?),
            },
            _ => Ok(self.dialect.safe_cast(&fragment.sql, SqlType::Text)?),
        }
    }

    /// Number; non-numeric values go through a safe cast
    pub(crate) fn numeric(&self, fragment: &Fragment) -> TranslationResult<String> {
        match fragment.kind {
            ValueKind::Numeric => Ok(fragment.sql.clone()),
            ValueKind::Json => Ok(self.dialect.safe_cast(&self.text(fragment)?, SqlType::Decimal)?),
            _ => Ok(self.dialect.safe_cast(&fragment.sql, SqlType::Decimal)?),
        }
    }

    /// Value cast to a SQL type, yielding NULL when malformed
    pub(crate) fn cast(&self, fragment: &Fragment, target: SqlType) -> TranslationResult<String> {
        match (fragment.kind, target) {
            (ValueKind::Numeric, SqlType::Decimal) | (ValueKind::Text, SqlType::Text) => {
                Ok(fragment.sql.clone())
            }
            (ValueKind::Temporal(t), _) if t == target => Ok(fragment.sql.clone()),
            (ValueKind::Boolean, SqlType::Boolean) => Ok(fragment.sql.clone()),
            (ValueKind::Json, _) => Ok(self.dialect.safe_cast(&self.text(fragment)?, target)?),
            _ => Ok(self.dialect.safe_cast(&fragment.sql, target)?),
        }
    }

    /// SQL boolean holding the value itself
    pub(crate) fn boolean_value(&self, fragment: &Fragment) -> TranslationResult<String> {
        match fragment.kind {
            ValueKind::Boolean => Ok(fragment.sql.clone()),
            ValueKind::Json => Ok(self.dialect.to_boolean(&fragment.sql)?),
            _ => Ok(self.dialect.safe_cast(&fragment.sql, SqlType::Boolean)?),
        }
    }

    /// SQL predicate for the fragment used as a condition
    ///
    /// Known boolean fields are converted; other JSON values test for existence.
    pub(crate) fn condition(&self, fragment: &Fragment) -> TranslationResult<String> {
        match fragment.kind {
            ValueKind::Boolean => Ok(fragment.sql.clone()),
            ValueKind::Json if self.is_boolean_field(fragment) => {
                Ok(self.dialect.to_boolean(&fragment.sql)?)
            }
            ValueKind::Json => Ok(self.dialect.exists(&fragment.sql)?),
            _ => Ok(format!("({} IS NOT NULL)", fragment.sql)),
        }
    }

    pub(crate) fn is_boolean_field(&self, fragment: &Fragment) -> bool {
        fragment.is_json()
            && fragment
                .field
                .as_deref()
                .is_some_and(|f| self.config.fields.is_boolean_field(f))
    }

    fn enter(&mut self) -> TranslationResult<()> {
        self.depth += 1;
        if self.depth > self.config.max_generation_depth {
            self.depth -= 1;
            return Err(TranslationError::RecursionLimit {
                limit: self.config.max_generation_depth,
            });
        }
        Ok(())
    }
}

impl Visitor for SqlGenerator<'_> {
    type Result = TranslationResult<Fragment>;

    fn visit_expression(&mut self, expr: &ExpressionNode) -> Self::Result {
        self.enter()?;
        log::trace!("generating {expr} at depth {}", self.depth);
        let result = walk_expression(self, expr);
        self.depth -= 1;
        result
    }

    fn visit_identifier(&mut self, name: &str) -> Self::Result {
        if self.scopes.len() == 1 && self.is_resource_type(name) {
            return Ok(self.scopes.focus().clone());
        }
        let focus = self.scopes.focus().clone();
        self.navigate(&focus, name)
    }

    fn visit_literal(&mut self, literal: &LiteralValue) -> Self::Result {
        self.literal(literal)
    }

    fn visit_path(&mut self, segments: &[ExpressionNode]) -> Self::Result {
        self.path(segments)
    }

    fn visit_indexer(&mut self, expression: &ExpressionNode, index: &ExpressionNode) -> Self::Result {
        self.indexer(expression, index)
    }

    fn visit_function_call(&mut self, name: &str, args: &[ExpressionNode]) -> Self::Result {
        self.function_call(name, args)
    }

    fn visit_binary_op(
        &mut self,
        op: BinaryOperator,
        left: &ExpressionNode,
        right: &ExpressionNode,
    ) -> Self::Result {
        self.binary_op(op, left, right)
    }

    fn visit_unary_op(&mut self, op: UnaryOperator, operand: &ExpressionNode) -> Self::Result {
        self.unary_op(op, operand)
    }

    fn visit_variable(&mut self, variable: ContextVariable) -> Self::Result {
        self.iteration_variable(variable)
    }

    fn visit_this(&mut self) -> Self::Result {
        match self.scopes.iteration() {
            Some(frame) => Ok(Fragment::element(frame.this_sql())),
            None => Err(TranslationError::context(
                "$this is only available inside where(), select(), all() or exists()",
            )),
        }
    }
}

/// `alias.column` holding the JSON document
pub fn document_column(config: &TranslatorConfig) -> String {
    format!("{}.{}", config.table_alias, config.json_column)
}

/// `alias.column` holding the row key
pub fn row_key_column(config: &TranslatorConfig) -> String {
    format!("{}.{}", config.table_alias, config.id_column)
}

/// Predicate restricting rows to one resource type
pub fn resource_type_filter(
    dialect: &dyn Dialect,
    config: &TranslatorConfig,
    resource_type: &str,
) -> TranslationResult<String> {
    let field = dialect.extract_text(
        &document_column(config),
        &JsonPath::from_fields([config.resource_type_field.as_str()]),
    )?;
    Ok(format!("{field} = {}", quote_literal(resource_type)))
}
