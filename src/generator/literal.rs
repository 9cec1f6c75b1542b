//! Literals and iteration variables

use super::SqlGenerator;
use super::fragment::{Fragment, Shape, ValueKind};
use crate::ast::{ContextVariable, LiteralValue};
use crate::dialect::SqlType;
use crate::error::{TranslationError, TranslationResult};

/// Quote text as a SQL string literal, doubling embedded quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl SqlGenerator<'_> {
    pub(crate) fn literal(&self, literal: &LiteralValue) -> TranslationResult<Fragment> {
        let fragment = match literal {
            LiteralValue::Boolean(value) => Fragment::new(value.to_string(), Shape::Scalar, ValueKind::Boolean),
            LiteralValue::Integer(value) => Fragment::new(value.to_string(), Shape::Scalar, ValueKind::Numeric),
            LiteralValue::Decimal(value) => Fragment::new(value.clone(), Shape::Scalar, ValueKind::Numeric),
            LiteralValue::String(value) => Fragment::new(quote_literal(value), Shape::Scalar, ValueKind::Text),
            LiteralValue::Date(value) => self.temporal_literal(value, SqlType::Date)?,
            LiteralValue::DateTime(value) => self.temporal_literal(value, SqlType::DateTime)?,
            LiteralValue::Time(value) => self.temporal_literal(value, SqlType::Time)?,
            // the unit only matters to date arithmetic, which reads it from the AST
            LiteralValue::Quantity { value, .. } => {
                Fragment::new(value.clone(), Shape::Scalar, ValueKind::Numeric)
            }
            LiteralValue::Empty => Fragment::empty(),
        };
        Ok(fragment)
    }

    fn temporal_literal(&self, value: &str, target: SqlType) -> TranslationResult<Fragment> {
        let sql = self.dialect().safe_cast(&quote_literal(value), target)?;
        Ok(Fragment::new(sql, Shape::Scalar, ValueKind::Temporal(target)))
    }

    /// `$index` and `$total` of the innermost iteration
    pub(crate) fn iteration_variable(&self, variable: ContextVariable) -> TranslationResult<Fragment> {
        let frame = self.scopes.iteration().ok_or_else(|| {
            TranslationError::context(format!(
                "${} is only available inside where(), select(), all() or exists()",
                variable.name()
            ))
        })?;
        let column = match variable {
            ContextVariable::Index => frame.index.as_ref(),
            ContextVariable::Total => frame.total.as_ref(),
        };
        // iterations project the window columns their criteria refer to
        let sql = column.cloned().ok_or_else(|| {
            TranslationError::context(format!(
                "${} is not bound by the enclosing iteration",
                variable.name()
            ))
        })?;
        let mut fragment = Fragment::new(sql, Shape::Scalar, ValueKind::Numeric);
        fragment.iteration_scoped = true;
        Ok(fragment)
    }
}
