//! Rule AST boundary for rulegate
//!
//! Rule expressions are parsed and evaluated by the decision engine. The
//! advisor only needs to walk the tree and read named string constants from
//! aggregation and filter nodes, so this module carries the node shape and
//! nothing about evaluation.
//!
//! # Node shape
//!
//! - `name`: function tag (`Aggregator`, `Filter`, `List`, `And`, ...)
//! - `constant`: leaf value for constant nodes
//! - `children`: positional arguments
//! - `named_children`: keyword arguments (`tableName`, `fieldName`, ...)

mod node;

pub use node::{FilterOperator, Function, Node, FIELD_NAME, FILTERS, OPERATOR, TABLE_NAME, VALUE};
