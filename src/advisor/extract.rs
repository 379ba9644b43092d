//! Query pattern extraction
//!
//! Walks rule ASTs and turns every `Aggregator` node into an
//! [`AggregateQueryFamily`]. The same shape usually appears several times
//! across a trigger and its rules; the output holds each shape once, in
//! canonical-key order.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::ast::{FilterOperator, Function, Node, FIELD_NAME, FILTERS, OPERATOR, TABLE_NAME};

use super::errors::{AdvisorError, AdvisorResult};
use super::normalize_identifier;
use super::query_family::AggregateQueryFamily;

/// How a filter field participates in an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterClass {
    /// Equality: can be any leading key column
    Eq,
    /// Range: can only be the trailing key column
    Ineq,
    /// Membership, not-equal, string match, ...: read only
    Other,
}

impl From<FilterOperator> for FilterClass {
    fn from(op: FilterOperator) -> Self {
        if op.is_equality() {
            FilterClass::Eq
        } else if op.is_range() {
            FilterClass::Ineq
        } else {
            FilterClass::Other
        }
    }
}

/// Extracts the deduplicated query families of every aggregation in `asts`.
///
/// Fails on the first aggregation that cannot be read; callers must block
/// publication on that error.
pub fn extract_query_families<'a, I>(asts: I) -> AdvisorResult<Vec<AggregateQueryFamily>>
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut families: BTreeMap<String, AggregateQueryFamily> = BTreeMap::new();

    for ast in asts {
        ast.walk(&mut |node: &Node| -> AdvisorResult<()> {
            if node.function == Function::Aggregator {
                let family = family_from_aggregator(node)?;
                families.entry(family.canonical_key()).or_insert(family);
            }
            Ok(())
        })?;
    }

    Ok(families.into_values().collect())
}

/// Builds the query family of a single `Aggregator` node
pub fn family_from_aggregator(node: &Node) -> AdvisorResult<AggregateQueryFamily> {
    let table = required_string(node, TABLE_NAME, "aggregator")?;
    let field = required_string(node, FIELD_NAME, "aggregator")?;
    let mut family = AggregateQueryFamily::new(&table);

    for filter in filter_nodes(node, &family.table)? {
        let filter_table = required_string(filter, TABLE_NAME, "filter")?;
        if normalize_identifier(&filter_table) != family.table {
            return Err(AdvisorError::table_mismatch(&family.table, &filter_table));
        }

        let filter_field = required_string(filter, FIELD_NAME, "filter")?;
        let operator = required_string(filter, OPERATOR, "filter")?;
        let op = FilterOperator::parse(&operator)
            .ok_or_else(|| AdvisorError::unknown_operator(&family.table, &operator))?;

        match FilterClass::from(op) {
            FilterClass::Eq => family.add_eq(&filter_field),
            FilterClass::Ineq => family.add_ineq(&filter_field),
            FilterClass::Other => family.add_other(&filter_field),
        }
    }

    // After the filters, so a filtered aggregated field keeps its class
    family.add_other(&field);

    Ok(family)
}

/// Returns the filter nodes of an aggregator. A missing `filters` child
/// means the aggregation is unfiltered.
fn filter_nodes<'a>(aggregator: &'a Node, table: &str) -> AdvisorResult<&'a [Node]> {
    let Some(list) = aggregator.named(FILTERS) else {
        return Ok(&[]);
    };

    if list.function != Function::List {
        return Err(AdvisorError::invalid_ast_on(
            table,
            format!("'{}' must be a List, got {}", FILTERS, list.function),
        ));
    }

    if let Some(bad) = list.children.iter().find(|c| c.function != Function::Filter) {
        return Err(AdvisorError::invalid_ast_on(
            table,
            format!("'{}' contains a {} node", FILTERS, bad.function),
        ));
    }

    Ok(&list.children)
}

/// Reads a named child that must be a string constant
fn required_string(node: &Node, name: &str, context: &str) -> AdvisorResult<String> {
    let child = node
        .named(name)
        .ok_or_else(|| AdvisorError::invalid_ast(format!("{} is missing '{}'", context, name)))?;

    if !child.is_constant() {
        return Err(AdvisorError::invalid_ast(format!(
            "{} '{}' must be a constant, got {}",
            context, name, child.function
        )));
    }

    match &child.constant {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(AdvisorError::invalid_ast(format!(
            "{} '{}' must be a non-empty string",
            context, name
        ))),
    }
}
