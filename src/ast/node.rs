//! AST node representation
//!
//! Nodes deserialize from the engine's JSON form:
//!
//! ```json
//! {"name": "Aggregator",
//!  "named_children": {"tableName": {"constant": "transactions"}, ...}}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named child holding the table an aggregator or filter reads
pub const TABLE_NAME: &str = "tableName";
/// Named child holding the aggregated or filtered field
pub const FIELD_NAME: &str = "fieldName";
/// Named child holding the aggregator's filter list
pub const FILTERS: &str = "filters";
/// Named child holding a filter's comparison operator
pub const OPERATOR: &str = "operator";
/// Named child holding a filter's compared value
pub const VALUE: &str = "value";

/// Function tag of an AST node
///
/// Only `Aggregator`, `Filter` and `List` carry meaning for index advice.
/// Other tags are walked through without inspection; tags this crate does
/// not know are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Function {
    /// Constant leaf
    #[default]
    Undefined,
    And,
    Or,
    Not,
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    List,
    Payload,
    DatabaseAccess,
    /// Historical aggregation over a table
    Aggregator,
    /// Filter attached to an aggregator
    Filter,
    /// Any tag not listed above
    Other(String),
}

impl Function {
    /// Returns the wire name of the function
    pub fn as_str(&self) -> &str {
        match self {
            Function::Undefined => "Undefined",
            Function::And => "And",
            Function::Or => "Or",
            Function::Not => "Not",
            Function::Equal => "=",
            Function::NotEqual => "!=",
            Function::Greater => ">",
            Function::GreaterOrEqual => ">=",
            Function::Less => "<",
            Function::LessOrEqual => "<=",
            Function::Add => "+",
            Function::Subtract => "-",
            Function::Multiply => "*",
            Function::Divide => "/",
            Function::List => "List",
            Function::Payload => "Payload",
            Function::DatabaseAccess => "DatabaseAccess",
            Function::Aggregator => "Aggregator",
            Function::Filter => "Filter",
            Function::Other(name) => name,
        }
    }
}

impl From<String> for Function {
    fn from(name: String) -> Self {
        match name.as_str() {
            "" | "Undefined" => Function::Undefined,
            "And" => Function::And,
            "Or" => Function::Or,
            "Not" => Function::Not,
            "=" => Function::Equal,
            "!=" => Function::NotEqual,
            ">" => Function::Greater,
            ">=" => Function::GreaterOrEqual,
            "<" => Function::Less,
            "<=" => Function::LessOrEqual,
            "+" => Function::Add,
            "-" => Function::Subtract,
            "*" => Function::Multiply,
            "/" => Function::Divide,
            "List" => Function::List,
            "Payload" => Function::Payload,
            "DatabaseAccess" => Function::DatabaseAccess,
            "Aggregator" => Function::Aggregator,
            "Filter" => Function::Filter,
            _ => Function::Other(name),
        }
    }
}

impl From<Function> for String {
    fn from(function: Function) -> Self {
        function.as_str().to_string()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparison operator carried by a `Filter` node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    IsInList,
    IsNotInList,
    StringContains,
    StringNotContains,
    StringStartsWith,
    StringEndsWith,
    IsEmpty,
    IsNotEmpty,
    ContainsAnyOf,
    ContainsNoneOf,
    FuzzyMatch,
    FuzzyMatchAnyOf,
}

impl FilterOperator {
    /// Parses an operator from its wire name, `None` if unrecognized
    pub fn parse(s: &str) -> Option<Self> {
        let op = match s {
            "=" => FilterOperator::Equal,
            "!=" => FilterOperator::NotEqual,
            ">" => FilterOperator::Greater,
            ">=" => FilterOperator::GreaterOrEqual,
            "<" => FilterOperator::Less,
            "<=" => FilterOperator::LessOrEqual,
            "IsInList" => FilterOperator::IsInList,
            "IsNotInList" => FilterOperator::IsNotInList,
            "StringContains" => FilterOperator::StringContains,
            "StringNotContains" => FilterOperator::StringNotContains,
            "StringStartsWith" => FilterOperator::StringStartsWith,
            "StringEndsWith" => FilterOperator::StringEndsWith,
            "IsEmpty" => FilterOperator::IsEmpty,
            "IsNotEmpty" => FilterOperator::IsNotEmpty,
            "ContainsAnyOf" => FilterOperator::ContainsAnyOf,
            "ContainsNoneOf" => FilterOperator::ContainsNoneOf,
            "FuzzyMatch" => FilterOperator::FuzzyMatch,
            "FuzzyMatchAnyOf" => FilterOperator::FuzzyMatchAnyOf,
            _ => return None,
        };
        Some(op)
    }

    /// Returns the wire name of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "=",
            FilterOperator::NotEqual => "!=",
            FilterOperator::Greater => ">",
            FilterOperator::GreaterOrEqual => ">=",
            FilterOperator::Less => "<",
            FilterOperator::LessOrEqual => "<=",
            FilterOperator::IsInList => "IsInList",
            FilterOperator::IsNotInList => "IsNotInList",
            FilterOperator::StringContains => "StringContains",
            FilterOperator::StringNotContains => "StringNotContains",
            FilterOperator::StringStartsWith => "StringStartsWith",
            FilterOperator::StringEndsWith => "StringEndsWith",
            FilterOperator::IsEmpty => "IsEmpty",
            FilterOperator::IsNotEmpty => "IsNotEmpty",
            FilterOperator::ContainsAnyOf => "ContainsAnyOf",
            FilterOperator::ContainsNoneOf => "ContainsNoneOf",
            FilterOperator::FuzzyMatch => "FuzzyMatch",
            FilterOperator::FuzzyMatchAnyOf => "FuzzyMatchAnyOf",
        }
    }

    /// Returns true for `=`
    pub fn is_equality(&self) -> bool {
        matches!(self, FilterOperator::Equal)
    }

    /// Returns true for `>`, `>=`, `<`, `<=`
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            FilterOperator::Greater
                | FilterOperator::GreaterOrEqual
                | FilterOperator::Less
                | FilterOperator::LessOrEqual
        )
    }
}

/// A rule AST node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    /// Function tag
    #[serde(rename = "name", default)]
    pub function: Function,
    /// Constant value (leaf nodes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<Value>,
    /// Positional children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// Named children, kept in key order
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub named_children: BTreeMap<String, Node>,
}

impl Node {
    /// Creates a constant leaf
    pub fn constant(value: impl Into<Value>) -> Self {
        Self {
            constant: Some(value.into()),
            ..Default::default()
        }
    }

    /// Creates a function node with positional children
    pub fn call(function: Function, children: Vec<Node>) -> Self {
        Self {
            function,
            children,
            ..Default::default()
        }
    }

    /// Adds a named child
    pub fn with_named(mut self, name: impl Into<String>, child: Node) -> Self {
        self.named_children.insert(name.into(), child);
        self
    }

    /// Creates an `Aggregator` node over `table.field` with the given filters
    pub fn aggregator(table: &str, field: &str, filters: Vec<Node>) -> Self {
        Node::call(Function::Aggregator, Vec::new())
            .with_named(TABLE_NAME, Node::constant(table))
            .with_named(FIELD_NAME, Node::constant(field))
            .with_named(FILTERS, Node::call(Function::List, filters))
    }

    /// Creates a `Filter` node comparing `table.field` against `value`
    pub fn filter(table: &str, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        Node::call(Function::Filter, Vec::new())
            .with_named(TABLE_NAME, Node::constant(table))
            .with_named(FIELD_NAME, Node::constant(field))
            .with_named(OPERATOR, Node::constant(operator))
            .with_named(VALUE, Node::constant(value))
    }

    /// Returns true for constant leaves
    pub fn is_constant(&self) -> bool {
        self.function == Function::Undefined && self.constant.is_some()
    }

    /// Returns a named child
    pub fn named(&self, name: &str) -> Option<&Node> {
        self.named_children.get(name)
    }

    /// Visits this node and every descendant, depth first.
    ///
    /// Positional children are visited before named children; named
    /// children are visited in key order. The first error stops the walk.
    pub fn walk<E, F>(&self, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&Node) -> Result<(), E>,
    {
        visit(self)?;
        for child in &self.children {
            child.walk(visit)?;
        }
        for child in self.named_children.values() {
            child.walk(visit)?;
        }
        Ok(())
    }
}
