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

//! Expression AST node definitions

use super::operator::{BinaryOperator, UnaryOperator};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// AST representation of FHIRPath expressions
///
/// The set of variants is closed: every consumer matches it exhaustively,
/// so adding a node kind fails to compile until each visitor handles it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionNode {
    /// Identifier (field or resource type name)
    Identifier(String),

    /// Literal value (string, number, boolean, etc.)
    Literal(LiteralValue),

    /// Dotted navigation; each segment is evaluated against the result of the previous one.
    /// An empty path denotes the row's root JSON column.
    Path {
        /// Ordered segments
        segments: Vec<ExpressionNode>,
    },

    /// Index access (`collection[index]`) attached to the preceding segment
    Indexer {
        /// Indexed expression
        expression: Box<ExpressionNode>,
        /// Index expression
        index: Box<ExpressionNode>,
    },

    /// Function call with name and arguments (boxed for size optimization)
    FunctionCall(Box<FunctionCallData>),

    /// Binary operation (arithmetic, comparison, logical) (boxed for size optimization)
    BinaryOp(Box<BinaryOpData>),

    /// Unary operation (negation, not)
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
    },

    /// `$index` or `$total`
    Variable(ContextVariable),

    /// `$this`
    This,
}

/// Iteration variables other than `$this`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextVariable {
    /// 0-based position of the current element
    Index,
    /// Number of elements in the iterated collection
    Total,
}

impl ContextVariable {
    /// Variable name without the `$`
    pub fn name(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Total => "total",
        }
    }
}

/// Binary operation data (separate struct to optimize enum size)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: ExpressionNode,
    /// Right operand
    pub right: ExpressionNode,
}

/// Function call data (separate struct to optimize enum size)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionCallData {
    /// Function name
    pub name: String,
    /// Function arguments (SmallVec for common case of 0-4 args)
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// Literal values in FHIRPath
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralValue {
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Decimal literal (stored as string to preserve precision)
    Decimal(String),
    /// String literal, escapes already decoded
    String(String),
    /// Date literal without the leading '@' (YYYY-MM-DD)
    Date(String),
    /// DateTime literal without the leading '@' (ISO 8601)
    DateTime(String),
    /// Time literal without the leading '@T' (HH:MM:SS)
    Time(String),
    /// Quantity literal
    Quantity {
        /// Numeric value
        value: String,
        /// Unit
        unit: String,
    },
    /// Empty collection `{}`
    Empty,
}

impl LiteralValue {
    /// Integer or decimal
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Decimal(_))
    }

    /// Date, DateTime or Time
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date(_) | Self::DateTime(_) | Self::Time(_))
    }
}

impl ExpressionNode {
    /// Create a literal expression
    pub fn literal(value: LiteralValue) -> Self {
        Self::Literal(value)
    }

    /// Create an identifier expression
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// Create a path from ordered segments
    pub fn path(segments: Vec<ExpressionNode>) -> Self {
        Self::Path { segments }
    }

    /// Create an index access expression
    pub fn indexer(expression: ExpressionNode, index: ExpressionNode) -> Self {
        Self::Indexer {
            expression: Box::new(expression),
            index: Box::new(index),
        }
    }

    /// Create a function call expression
    pub fn function_call(
        name: impl Into<String>,
        args: impl Into<SmallVec<[ExpressionNode; 4]>>,
    ) -> Self {
        Self::FunctionCall(Box::new(FunctionCallData {
            name: name.into(),
            args: args.into(),
        }))
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        Self::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a `$index`/`$total` reference
    pub fn variable(variable: ContextVariable) -> Self {
        Self::Variable(variable)
    }

    /// Get the literal value if this is a literal expression
    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Get the identifier name if this is an identifier expression
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Self::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Check if this is a string literal
    pub fn is_string_literal(&self) -> bool {
        matches!(self, Self::Literal(LiteralValue::String(_)))
    }

    /// Name of the last field or function along this expression
    ///
    /// `name.given.first()` yields `first`, `name[0]` yields `name`.
    pub fn trailing_name(&self) -> Option<&str> {
        match self {
            Self::Identifier(name) => Some(name),
            Self::FunctionCall(data) => Some(&data.name),
            Self::Indexer { expression, .. } => expression.trailing_name(),
            Self::Path { segments } => segments.last().and_then(|s| s.trailing_name()),
            _ => None,
        }
    }

    /// Last field identifier along this expression, skipping trailing function calls
    ///
    /// `telecom.where(system = 'phone').value` yields `value`,
    /// `name.family.first()` yields `family`.
    pub fn final_identifier(&self) -> Option<&str> {
        match self {
            Self::Identifier(name) => Some(name),
            Self::Indexer { expression, .. } => expression.final_identifier(),
            Self::Path { segments } => segments.iter().rev().find_map(|s| s.final_identifier()),
            _ => None,
        }
    }

    /// Direct children in evaluation order
    pub fn children(&self) -> SmallVec<[&ExpressionNode; 4]> {
        match self {
            Self::Identifier(_) | Self::Literal(_) | Self::Variable(_) | Self::This => {
                SmallVec::new()
            }
            Self::Path { segments } => segments.iter().collect(),
            Self::Indexer { expression, index } => {
                SmallVec::from_slice(&[expression.as_ref(), index.as_ref()])
            }
            Self::FunctionCall(data) => data.args.iter().collect(),
            Self::BinaryOp(data) => SmallVec::from_slice(&[&data.left, &data.right]),
            Self::UnaryOp { operand, .. } => SmallVec::from_slice(&[operand.as_ref()]),
        }
    }
}

fn write_segment(f: &mut fmt::Formatter<'_>, node: &ExpressionNode) -> fmt::Result {
    match node {
        ExpressionNode::BinaryOp(_) | ExpressionNode::UnaryOp { .. } => write!(f, "({node})"),
        _ => write!(f, "{node}"),
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(name) => write!(f, "{name}"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Path { segments } => {
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write_segment(f, segment)?;
                }
                Ok(())
            }
            Self::Indexer { expression, index } => {
                write_segment(f, expression)?;
                write!(f, "[{index}]")
            }
            Self::FunctionCall(data) => {
                write!(f, "{}(", data.name)?;
                for (i, arg) in data.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::BinaryOp(data) => {
                write_segment(f, &data.left)?;
                write!(f, " {} ", data.op)?;
                write_segment(f, &data.right)
            }
            Self::UnaryOp { op, operand } => match op {
                UnaryOperator::Not => {
                    write!(f, "not ")?;
                    write_segment(f, operand)
                }
                _ => {
                    write!(f, "{op}")?;
                    write_segment(f, operand)
                }
            },
            Self::Variable(variable) => write!(f, "${}", variable.name()),
            Self::This => write!(f, "$this"),
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Date(d) | Self::DateTime(d) => write!(f, "@{d}"),
            Self::Time(t) => write!(f, "@T{t}"),
            Self::Quantity { value, unit } => write!(f, "{value} '{unit}'"),
            Self::Empty => write!(f, "{{}}"),
        }
    }
}
