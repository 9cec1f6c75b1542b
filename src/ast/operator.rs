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

//! Operator definitions for FHIRPath expressions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators in FHIRPath expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Arithmetic operators
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Subtract,
    /// Multiplication (*)
    Multiply,
    /// Division (/)
    Divide,
    /// Modulo (mod)
    Modulo,
    /// Integer division (div)
    IntegerDivide,
    /// Exponentiation (^)
    Power,

    // Comparison operators
    /// Equality (=)
    Equal,
    /// Inequality (!=)
    NotEqual,
    /// Equivalence (~)
    Equivalent,
    /// Non-equivalence (!~)
    NotEquivalent,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,

    // Logical operators
    /// Logical AND (and)
    And,
    /// Logical OR (or)
    Or,
    /// Logical XOR (xor)
    Xor,
    /// Implication (implies)
    Implies,

    // String operators
    /// String concatenation (&)
    Concatenate,

    // Collection operators
    /// Collection union (|)
    Union,
    /// Collection membership (in)
    In,
    /// Collection containment (contains)
    Contains,
}

/// Unary operators in FHIRPath expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Arithmetic negation (-)
    Negate,
    /// Logical negation (not)
    Not,
    /// Positive sign (+)
    Positive,
}

impl BinaryOperator {
    /// Check if this operator is arithmetic
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Subtract
                | Self::Multiply
                | Self::Divide
                | Self::Modulo
                | Self::IntegerDivide
                | Self::Power
        )
    }

    /// Check if this operator is a comparison (equality or ordering)
    pub fn is_comparison(self) -> bool {
        self.is_equality() || self.is_ordering()
    }

    /// `=`, `!=`, `~`, `!~`
    pub fn is_equality(self) -> bool {
        matches!(
            self,
            Self::Equal | Self::NotEqual | Self::Equivalent | Self::NotEquivalent
        )
    }

    /// `<`, `<=`, `>`, `>=`
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::LessThan | Self::LessThanOrEqual | Self::GreaterThan | Self::GreaterThanOrEqual
        )
    }

    /// Check if this operator is logical
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor | Self::Implies)
    }

    /// Check if this operator works on whole collections
    pub fn is_collection_operator(self) -> bool {
        matches!(self, Self::Union | Self::In | Self::Contains)
    }

    /// Get the symbol representation of this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "mod",
            Self::IntegerDivide => "div",
            Self::Power => "^",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Equivalent => "~",
            Self::NotEquivalent => "!~",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Implies => "implies",
            Self::Concatenate => "&",
            Self::Union => "|",
            Self::In => "in",
            Self::Contains => "contains",
        }
    }

    /// The SQL comparison operator for `=`, `!=` and the ordering operators
    pub fn sql_comparison(&self) -> Option<&'static str> {
        match self {
            Self::Equal => Some("="),
            Self::NotEqual => Some("<>"),
            Self::LessThan => Some("<"),
            Self::LessThanOrEqual => Some("<="),
            Self::GreaterThan => Some(">"),
            Self::GreaterThanOrEqual => Some(">="),
            _ => None,
        }
    }
}

impl UnaryOperator {
    /// Get the symbol representation of this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "not",
            Self::Positive => "+",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_classification() {
        assert!(BinaryOperator::IntegerDivide.is_arithmetic());
        assert!(BinaryOperator::Equivalent.is_comparison());
        assert!(!BinaryOperator::Equivalent.is_ordering());
        assert!(BinaryOperator::Implies.is_logical());
        assert!(BinaryOperator::Union.is_collection_operator());
    }

    #[test]
    fn test_sql_comparison_symbols() {
        assert_eq!(BinaryOperator::NotEqual.sql_comparison(), Some("<>"));
        assert_eq!(BinaryOperator::Equivalent.sql_comparison(), None);
        assert_eq!(BinaryOperator::Modulo.to_string(), "mod");
        assert_eq!(UnaryOperator::Not.to_string(), "not");
    }
}
