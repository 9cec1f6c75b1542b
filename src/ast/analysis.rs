//! Read-only analyses over parsed expressions

use super::expression::{ContextVariable, ExpressionNode, LiteralValue};
use super::operator::{BinaryOperator, UnaryOperator};
use super::visitor::Visitor;
use rustc_hash::FxHashMap;

/// Functions whose arguments are evaluated once per element of the input collection
pub const ITERATION_FUNCTIONS: &[&str] = &["where", "select", "all", "exists"];

/// Which iteration variables an iteration criteria refers to directly
///
/// Arguments of nested iteration functions are skipped because they bind
/// their own `$index` and `$total`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IterationVariableUsage {
    /// `$index` appears
    pub index: bool,
    /// `$total` appears
    pub total: bool,
}

impl IterationVariableUsage {
    /// Scan an iteration criteria
    pub fn of(criteria: &ExpressionNode) -> Self {
        let mut usage = Self::default();
        usage.visit_expression(criteria);
        usage
    }
}

impl Visitor for IterationVariableUsage {
    type Result = ();

    fn visit_identifier(&mut self, _name: &str) {}

    fn visit_literal(&mut self, _literal: &LiteralValue) {}

    fn visit_path(&mut self, segments: &[ExpressionNode]) {
        for segment in segments {
            self.visit_expression(segment);
        }
    }

    fn visit_indexer(&mut self, expression: &ExpressionNode, index: &ExpressionNode) {
        self.visit_expression(expression);
        self.visit_expression(index);
    }

    fn visit_function_call(&mut self, name: &str, args: &[ExpressionNode]) {
        if ITERATION_FUNCTIONS.contains(&name) {
            return;
        }
        for arg in args {
            self.visit_expression(arg);
        }
    }

    fn visit_binary_op(&mut self, _op: BinaryOperator, left: &ExpressionNode, right: &ExpressionNode) {
        self.visit_expression(left);
        self.visit_expression(right);
    }

    fn visit_unary_op(&mut self, _op: UnaryOperator, operand: &ExpressionNode) {
        self.visit_expression(operand);
    }

    fn visit_variable(&mut self, variable: ContextVariable) {
        match variable {
            ContextVariable::Index => self.index = true,
            ContextVariable::Total => self.total = true,
        }
    }

    fn visit_this(&mut self) {}
}

/// Counts how often each dotted field path is navigated in an expression
///
/// For `name.given.first() | name.family` the counts are
/// `name: 2`, `name.given: 1`, `name.family: 1`. A leading resource type
/// segment is not part of the key.
#[derive(Debug, Default, Clone)]
pub struct PathReferenceCounter {
    counts: FxHashMap<String, usize>,
}

impl PathReferenceCounter {
    /// Count the paths of a whole expression
    pub fn of(expr: &ExpressionNode) -> Self {
        let mut counter = Self::default();
        counter.visit_expression(expr);
        counter
    }

    /// Number of navigations of a dotted path such as `name.given`
    pub fn count(&self, dotted: &str) -> usize {
        self.counts.get(dotted).copied().unwrap_or(0)
    }

    fn record_prefixes(&mut self, segments: &[ExpressionNode]) {
        let mut prefix = String::new();
        for (i, segment) in segments.iter().enumerate() {
            let name = match segment {
                ExpressionNode::Identifier(name) => name.as_str(),
                ExpressionNode::Indexer { expression, .. } => match expression.as_identifier() {
                    Some(name) => name,
                    None => break,
                },
                _ => break,
            };
            if i == 0 && is_type_name(name) {
                continue;
            }
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(name);
            *self.counts.entry(prefix.clone()).or_insert(0) += 1;
        }
    }
}

impl Visitor for PathReferenceCounter {
    type Result = ();

    fn visit_identifier(&mut self, name: &str) {
        if !is_type_name(name) {
            *self.counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    fn visit_literal(&mut self, _literal: &LiteralValue) {}

    fn visit_path(&mut self, segments: &[ExpressionNode]) {
        self.record_prefixes(segments);
        for segment in segments {
            match segment {
                ExpressionNode::Identifier(_) => {}
                ExpressionNode::Indexer { index, .. } => self.visit_expression(index),
                other => self.visit_expression(other),
            }
        }
    }

    fn visit_indexer(&mut self, expression: &ExpressionNode, index: &ExpressionNode) {
        self.visit_expression(expression);
        self.visit_expression(index);
    }

    fn visit_function_call(&mut self, _name: &str, args: &[ExpressionNode]) {
        for arg in args {
            self.visit_expression(arg);
        }
    }

    fn visit_binary_op(&mut self, _op: BinaryOperator, left: &ExpressionNode, right: &ExpressionNode) {
        self.visit_expression(left);
        self.visit_expression(right);
    }

    fn visit_unary_op(&mut self, _op: UnaryOperator, operand: &ExpressionNode) {
        self.visit_expression(operand);
    }

    fn visit_variable(&mut self, _variable: ContextVariable) {}

    fn visit_this(&mut self) {}
}

/// Capitalised identifiers name resource types rather than fields
pub fn is_type_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Height of the expression tree
pub fn expression_depth(expr: &ExpressionNode) -> usize {
    1 + expr
        .children()
        .into_iter()
        .map(expression_depth)
        .max()
        .unwrap_or(0)
}
