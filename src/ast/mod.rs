//! Abstract Syntax Tree (AST) definitions for FHIRPath expressions
//!
//! Nodes are created only by the parser, form a strict tree and are never
//! mutated after construction.

mod analysis;
mod expression;
mod operator;
mod visitor;

pub use analysis::*;
pub use expression::*;
pub use operator::*;
pub use visitor::*;
