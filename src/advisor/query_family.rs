//! Aggregate query families
//!
//! The shape of one historical aggregation: which fields are pinned by
//! equality, which are range-bounded, and which are only read.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::normalize_identifier;

/// Query shape of one aggregation on one table.
///
/// The three field sets are pairwise disjoint. Equality takes precedence
/// over inequality, inequality over everything else, independently of the
/// order in which fields are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateQueryFamily {
    /// Table name (normalized)
    pub table: String,
    /// Fields compared with `=`
    pub eq: BTreeSet<String>,
    /// Fields compared with `>`, `>=`, `<`, `<=`
    pub ineq: BTreeSet<String>,
    /// Aggregated field and fields filtered any other way
    pub other: BTreeSet<String>,
}

impl AggregateQueryFamily {
    /// Creates an empty family for a table
    pub fn new(table: &str) -> Self {
        Self {
            table: normalize_identifier(table),
            eq: BTreeSet::new(),
            ineq: BTreeSet::new(),
            other: BTreeSet::new(),
        }
    }

    /// Classifies a field as equality-bound
    pub fn add_eq(&mut self, field: &str) {
        let field = normalize_identifier(field);
        self.ineq.remove(&field);
        self.other.remove(&field);
        self.eq.insert(field);
    }

    /// Classifies a field as range-bound unless it is already equality-bound
    pub fn add_ineq(&mut self, field: &str) {
        let field = normalize_identifier(field);
        if self.eq.contains(&field) {
            return;
        }
        self.other.remove(&field);
        self.ineq.insert(field);
    }

    /// Records a field that is read but not usable for seeking
    pub fn add_other(&mut self, field: &str) {
        let field = normalize_identifier(field);
        if self.eq.contains(&field) || self.ineq.contains(&field) {
            return;
        }
        self.other.insert(field);
    }

    /// Returns true if an index can narrow the scan at all
    pub fn is_indexable(&self) -> bool {
        !self.eq.is_empty() || !self.ineq.is_empty()
    }

    /// Canonical form used for structural deduplication
    pub fn canonical_key(&self) -> String {
        format!(
            "{}|eq:{}|ineq:{}|other:{}",
            self.table,
            join(&self.eq),
            join(&self.ineq),
            join(&self.other)
        )
    }
}

impl fmt::Display for AggregateQueryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} eq=[{}] ineq=[{}] other=[{}]",
            self.table,
            join(&self.eq),
            join(&self.ineq),
            join(&self.other)
        )
    }
}

fn join(fields: &BTreeSet<String>) -> String {
    fields.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint(f: &AggregateQueryFamily) {
        assert!(f.eq.is_disjoint(&f.ineq));
        assert!(f.eq.is_disjoint(&f.other));
        assert!(f.ineq.is_disjoint(&f.other));
    }

    #[test]
    fn test_equality_wins_regardless_of_order() {
        let mut a = AggregateQueryFamily::new("t");
        a.add_eq("field");
        a.add_ineq("field");

        let mut b = AggregateQueryFamily::new("t");
        b.add_ineq("field");
        b.add_eq("field");

        assert_eq!(a, b);
        assert!(a.eq.contains("field"));
        assert!(a.ineq.is_empty());
        assert_disjoint(&a);
    }

    #[test]
    fn test_other_is_lowest_priority() {
        let mut f = AggregateQueryFamily::new("t");
        f.add_other("amount");
        f.add_ineq("amount");
        f.add_other("amount");
        f.add_other("currency");

        assert!(f.ineq.contains("amount"));
        assert!(f.other.contains("currency"));
        assert!(!f.other.contains("amount"));
        assert_disjoint(&f);
    }

    #[test]
    fn test_identifiers_are_case_insensitive() {
        let mut f = AggregateQueryFamily::new("Transactions");
        f.add_eq("AccountId");
        f.add_ineq("accountid");

        assert_eq!(f.table, "transactions");
        assert_eq!(f.eq.len(), 1);
        assert!(f.ineq.is_empty());
    }

    #[test]
    fn test_canonical_key_ignores_insertion_order() {
        let mut a = AggregateQueryFamily::new("t");
        a.add_eq("b");
        a.add_eq("a");
        a.add_other("z");

        let mut b = AggregateQueryFamily::new("t");
        b.add_other("z");
        b.add_eq("a");
        b.add_eq("b");

        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_eq!(a.canonical_key(), "t|eq:a,b|ineq:|other:z");
    }

    #[test]
    fn test_indexable() {
        let mut f = AggregateQueryFamily::new("t");
        f.add_other("amount");
        assert!(!f.is_indexable());
        f.add_ineq("created_at");
        assert!(f.is_indexable());
    }
}
