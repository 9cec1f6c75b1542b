// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Visitor pattern for AST traversal
//!
//! Every node kind has a required method, so implementors are forced to
//! handle new variants when the node set grows.

use super::expression::{ContextVariable, ExpressionNode, LiteralValue};
use super::operator::{BinaryOperator, UnaryOperator};

/// Trait for visiting AST nodes
pub trait Visitor: Sized {
    /// The result type of visiting a node
    type Result;

    /// Visit an expression node
    fn visit_expression(&mut self, expr: &ExpressionNode) -> Self::Result {
        walk_expression(self, expr)
    }

    /// Visit an identifier
    fn visit_identifier(&mut self, name: &str) -> Self::Result;

    /// Visit a literal expression
    fn visit_literal(&mut self, literal: &LiteralValue) -> Self::Result;

    /// Visit a dotted path
    fn visit_path(&mut self, segments: &[ExpressionNode]) -> Self::Result;

    /// Visit an index access
    fn visit_indexer(&mut self, expression: &ExpressionNode, index: &ExpressionNode)
    -> Self::Result;

    /// Visit a function call
    fn visit_function_call(&mut self, name: &str, args: &[ExpressionNode]) -> Self::Result;

    /// Visit a binary operation
    fn visit_binary_op(
        &mut self,
        op: BinaryOperator,
        left: &ExpressionNode,
        right: &ExpressionNode,
    ) -> Self::Result;

    /// Visit a unary operation
    fn visit_unary_op(&mut self, op: UnaryOperator, operand: &ExpressionNode) -> Self::Result;

    /// Visit `$index` or `$total`
    fn visit_variable(&mut self, variable: ContextVariable) -> Self::Result;

    /// Visit `$this`
    fn visit_this(&mut self) -> Self::Result;
}

/// Default implementation of walking an expression tree
pub fn walk_expression<V: Visitor>(visitor: &mut V, expr: &ExpressionNode) -> V::Result {
    match expr {
        ExpressionNode::Identifier(name) => visitor.visit_identifier(name),
        ExpressionNode::Literal(lit) => visitor.visit_literal(lit),
        ExpressionNode::Path { segments } => visitor.visit_path(segments),
        ExpressionNode::Indexer { expression, index } => visitor.visit_indexer(expression, index),
        ExpressionNode::FunctionCall(data) => visitor.visit_function_call(&data.name, &data.args),
        ExpressionNode::BinaryOp(data) => visitor.visit_binary_op(data.op, &data.left, &data.right),
        ExpressionNode::UnaryOp { op, operand } => visitor.visit_unary_op(*op, operand),
        ExpressionNode::Variable(variable) => visitor.visit_variable(*variable),
        ExpressionNode::This => visitor.visit_this(),
    }
}
