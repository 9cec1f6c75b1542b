//! Translation façade: parse, generate, hoist, assemble

use crate::ast::{ExpressionNode, is_type_name};
use crate::config::TranslatorConfig;
use crate::dialect::Dialect;
use crate::error::{TranslationError, TranslationResult};
use crate::generator::{
    Clause, Shape, SqlGenerator, ValueKind, document_column, resource_type_filter, row_key_column,
};
use crate::parser::parse_expression_with_depth;
use indexmap::IndexMap;
use std::sync::Arc;

/// Kind of SQL produced for an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum QueryKind {
    /// One result column per row
    Select,
    /// Rows for which the expression holds
    Filter,
    /// The bare expression, for embedding in a larger query
    Expression,
}

impl QueryKind {
    fn clause(self) -> Clause {
        match self {
            Self::Select => Clause::Select,
            Self::Filter | Self::Expression => Clause::Where,
        }
    }
}

/// Result of a translation
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    /// Generated SQL
    pub sql: String,
    /// The FHIRPath expression as written
    pub expression: String,
    /// Shape of the expression value
    pub shape: Shape,
    /// SQL type of the expression value
    pub kind: ValueKind,
    /// Resource type rows were restricted to
    pub resource_type: Option<String>,
    /// Hoisted CTEs in the order they appear in the `WITH` prologue
    pub ctes: IndexMap<String, String>,
}

/// Compiles FHIRPath expressions to SQL for one dialect and configuration
///
/// Cheap to clone and safe to share between threads; every call builds its
/// own generator state.
#[derive(Debug, Clone)]
pub struct Translator {
    dialect: Arc<dyn Dialect>,
    config: Arc<TranslatorConfig>,
}

impl Translator {
    /// Create a translator, validating `config`
    pub fn new(dialect: impl Dialect + 'static, config: TranslatorConfig) -> TranslationResult<Self> {
        Self::with_shared(Arc::new(dialect), config)
    }

    /// Create a translator over an already shared dialect
    pub fn with_shared(dialect: Arc<dyn Dialect>, config: TranslatorConfig) -> TranslationResult<Self> {
        config.validate()?;
        Ok(Self {
            dialect,
            config: Arc::new(config),
        })
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// `SELECT key, <expression> AS result` over the resource table
    ///
    /// Array navigation may be hoisted into a `WITH` prologue.
    pub fn translate(
        &self,
        expression: &str,
        resource_type: Option<&str>,
    ) -> TranslationResult<Translation> {
        run(self.dialect(), &self.config, expression, resource_type, QueryKind::Select)
    }

    /// `SELECT key, document` for the rows the expression holds for
    pub fn translate_filter(
        &self,
        expression: &str,
        resource_type: Option<&str>,
    ) -> TranslationResult<Translation> {
        run(self.dialect(), &self.config, expression, resource_type, QueryKind::Filter)
    }

    /// The expression alone, correlated to the resource table alias
    pub fn translate_expression(
        &self,
        expression: &str,
        resource_type: Option<&str>,
    ) -> TranslationResult<Translation> {
        run(self.dialect(), &self.config, expression, resource_type, QueryKind::Expression)
    }
}

/// Translate `expression` to a SELECT query with the default configuration
///
/// ```
/// use octofhir_fhirpath_sql::{MockDialect, translate};
///
/// let sql = translate("Patient.gender", &MockDialect::new(), None).unwrap();
/// assert_eq!(
///     sql,
///     "SELECT r.id, (r.resource -> 'gender') AS result FROM fhir_resources AS r \
///      WHERE (r.resource ->> 'resourceType') = 'Patient'"
/// );
/// ```
pub fn translate(
    expression: &str,
    dialect: &dyn Dialect,
    resource_type: Option<&str>,
) -> TranslationResult<String> {
    let config = TranslatorConfig::default();
    run(dialect, &config, expression, resource_type, QueryKind::Select).map(|t| t.sql)
}

fn run(
    dialect: &dyn Dialect,
    config: &TranslatorConfig,
    expression: &str,
    resource_type: Option<&str>,
    kind: QueryKind,
) -> TranslationResult<Translation> {
    log::debug!("translating {expression:?} ({kind:?}, resource type {resource_type:?})");
    let ast = parse_expression_with_depth(expression, config.max_parse_depth)?;
    let resource_type = effective_resource_type(&ast, resource_type)?;

    let mut generator =
        SqlGenerator::new(dialect, config, resource_type.as_deref(), kind.clause())?;
    let fragment = generator.generate(&ast)?;
    let condition = match kind {
        QueryKind::Filter => Some(generator.condition(&fragment)?),
        _ => None,
    };
    let ctes = generator.into_ctes();

    let row_filter = resource_type
        .as_deref()
        .map(|ty| resource_type_filter(dialect, config, ty))
        .transpose()?;
    let from = format!("FROM {} AS {}", config.table, config.table_alias);
    let key = row_key_column(config);

    let sql = match kind {
        QueryKind::Expression => fragment.sql.clone(),
        QueryKind::Select => {
            let mut sql = String::new();
            if let Some(with) = ctes.with_clause() {
                sql.push_str(&with);
                sql.push(' ');
            }
            sql.push_str(&format!("SELECT {key}, {} AS result {from}", fragment.sql));
            if let Some(filter) = &row_filter {
                sql.push_str(&format!(" WHERE {filter}"));
            }
            sql
        }
        QueryKind::Filter => {
            let condition = condition.unwrap_or_default();
            let predicate = match &row_filter {
                Some(filter) => format!("{filter} AND {condition}"),
                None => condition,
            };
            format!(
                "SELECT {key}, {} {from} WHERE {predicate}",
                document_column(config)
            )
        }
    };

    log::debug!("translated {expression:?} into {} bytes of SQL", sql.len());
    Ok(Translation {
        sql,
        expression: expression.to_string(),
        shape: fragment.shape,
        kind: fragment.kind,
        resource_type,
        ctes: ctes.definitions().clone(),
    })
}

/// Resource type named by the expression's leading identifier, checked against the caller's
fn effective_resource_type(
    ast: &ExpressionNode,
    requested: Option<&str>,
) -> TranslationResult<Option<String>> {
    match (leading_type(ast), requested) {
        (Some(leading), Some(requested)) if leading != requested => {
            Err(TranslationError::context(format!(
                "expression starts with {leading} but rows are restricted to {requested}"
            )))
        }
        (leading, requested) => Ok(requested.or(leading).map(str::to_string)),
    }
}

fn leading_type(node: &ExpressionNode) -> Option<&str> {
    match node {
        ExpressionNode::Identifier(name) if is_type_name(name) => Some(name.as_str()),
        ExpressionNode::Path { segments } => segments.first().and_then(leading_type),
        ExpressionNode::Indexer { expression, .. } => leading_type(expression),
        ExpressionNode::BinaryOp(data) => leading_type(&data.left),
        ExpressionNode::UnaryOp { operand, .. } => leading_type(operand),
        _ => None,
    }
}
