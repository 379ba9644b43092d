//! Index families
//!
//! An index family is the set of physical indexes that serve a query shape
//! equally well. A family is read as a sequence of key "blocks": each fixed
//! column is a one-column block, then the flex set, then `last`. Within a
//! block the column order is free; blocks themselves are ordered.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::query_family::AggregateQueryFamily;

/// Equivalence class of composite indexes satisfying a query shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexFamily {
    /// Table name
    pub table: String,
    /// Leading key columns in mandatory order
    pub fixed: Vec<String>,
    /// Key columns in any order, right after `fixed`
    pub flex: BTreeSet<String>,
    /// Trailing key column (the range column)
    pub last: Option<String>,
    /// Non-key columns the index must carry
    pub included: BTreeSet<String>,
}

impl IndexFamily {
    /// Creates an empty family for a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fixed: Vec::new(),
            flex: BTreeSet::new(),
            last: None,
            included: BTreeSet::new(),
        }
    }

    /// Number of key columns
    pub fn size(&self) -> usize {
        self.fixed.len() + self.flex.len() + usize::from(self.last.is_some())
    }

    /// All key columns, unordered
    pub fn key_columns(&self) -> BTreeSet<String> {
        let mut cols: BTreeSet<String> = self.fixed.iter().cloned().collect();
        cols.extend(self.flex.iter().cloned());
        cols.extend(self.last.iter().cloned());
        cols
    }

    /// Drops included columns that are already part of the key
    pub fn normalize(&mut self) {
        let key = self.key_columns();
        self.included.retain(|c| !key.contains(c));
    }

    /// Cumulative key prefixes an index must reproduce, as column sets.
    ///
    /// An index belongs to this family iff, for every boundary `b`, the
    /// first `|b|` key columns of the index are exactly `b`.
    pub fn boundaries(&self) -> Vec<BTreeSet<String>> {
        let mut acc = BTreeSet::new();
        let mut out = Vec::with_capacity(self.fixed.len() + 2);

        for col in &self.fixed {
            acc.insert(col.clone());
            out.push(acc.clone());
        }
        if !self.flex.is_empty() {
            acc.extend(self.flex.iter().cloned());
            out.push(acc.clone());
        }
        if let Some(last) = &self.last {
            acc.insert(last.clone());
            out.push(acc);
        }
        out
    }

    /// Rebuilds a family from an ordered block sequence.
    ///
    /// A trailing one-column block becomes `last` (given at least two
    /// blocks), the block before becomes `flex`, and earlier blocks are
    /// pinned into `fixed` in sorted order.
    pub fn from_blocks(table: impl Into<String>, blocks: Vec<BTreeSet<String>>) -> Self {
        let mut family = IndexFamily::new(table);
        let n = blocks.len();
        if n == 0 {
            return family;
        }

        let trailing_last = n >= 2 && blocks[n - 1].len() == 1;
        let flex_at = if trailing_last { n - 2 } else { n - 1 };

        let mut blocks = blocks.into_iter();
        for block in blocks.by_ref().take(flex_at) {
            family.fixed.extend(block);
        }
        family.flex = blocks.next().unwrap_or_default();
        if trailing_last {
            family.last = blocks.next().and_then(|b| b.into_iter().next());
        }
        family
    }

    /// Returns the family with its first fixed column removed
    pub(crate) fn without_first_fixed(&self) -> Self {
        let mut rest = self.clone();
        if !rest.fixed.is_empty() {
            rest.fixed.remove(0);
        }
        rest
    }

    /// Canonical form used for ordering and deduplication
    pub fn canonical_key(&self) -> String {
        format!(
            "{}|fixed:{}|flex:{}|last:{}|included:{}",
            self.table,
            self.fixed.join(","),
            join(&self.flex),
            self.last.as_deref().unwrap_or(""),
            join(&self.included)
        )
    }
}

impl fmt::Display for IndexFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.table)?;
        write!(f, "[{}] {{{}}}", self.fixed.join(", "), join(&self.flex))?;
        if let Some(last) = &self.last {
            write!(f, " {}", last)?;
        }
        write!(f, ")")?;
        if !self.included.is_empty() {
            write!(f, " INCLUDE ({})", join(&self.included))?;
        }
        Ok(())
    }
}

fn join(fields: &BTreeSet<String>) -> String {
    fields.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Expands a query shape into its candidate index families.
///
/// - No equality and no range field: no candidate, a scan is unavoidable.
/// - No range field: one candidate with the equality fields as flex.
/// - Otherwise one candidate per range field, which becomes `last`; the
///   other range fields can only be carried as included columns.
pub fn candidate_families(query: &AggregateQueryFamily) -> Vec<IndexFamily> {
    if !query.is_indexable() {
        return Vec::new();
    }

    let mut base = IndexFamily::new(query.table.clone());
    base.flex = query.eq.clone();
    base.included = query.other.clone();

    if query.ineq.is_empty() {
        base.normalize();
        return vec![base];
    }

    query
        .ineq
        .iter()
        .map(|range_field| {
            let mut candidate = base.clone();
            candidate.last = Some(range_field.clone());
            candidate
                .included
                .extend(query.ineq.iter().filter(|f| *f != range_field).cloned());
            candidate.normalize();
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(fields: &[&str]) -> BTreeSet<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_size() {
        let mut f = IndexFamily::new("t");
        f.fixed = vec!["a".into()];
        f.flex = set(&["b", "c"]);
        f.last = Some("d".into());
        f.included = set(&["x"]);
        assert_eq!(f.size(), 4);
    }

    #[test]
    fn test_normalize_drops_key_columns_from_included() {
        let mut f = IndexFamily::new("t");
        f.flex = set(&["a"]);
        f.last = Some("b".into());
        f.included = set(&["a", "b", "c"]);
        f.normalize();
        assert_eq!(f.included, set(&["c"]));
    }

    #[test]
    fn test_boundaries() {
        let mut f = IndexFamily::new("t");
        f.fixed = vec!["a".into()];
        f.flex = set(&["b", "c"]);
        f.last = Some("d".into());

        assert_eq!(
            f.boundaries(),
            vec![set(&["a"]), set(&["a", "b", "c"]), set(&["a", "b", "c", "d"])]
        );
    }

    #[test]
    fn test_from_blocks() {
        let f = IndexFamily::from_blocks("t", vec![set(&["b", "a"]), set(&["c", "d"]), set(&["e"])]);
        assert_eq!(f.fixed, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(f.flex, set(&["c", "d"]));
        assert_eq!(f.last.as_deref(), Some("e"));

        let single = IndexFamily::from_blocks("t", vec![set(&["a"])]);
        assert!(single.fixed.is_empty());
        assert_eq!(single.flex, set(&["a"]));
        assert_eq!(single.last, None);
    }

    #[test]
    fn test_no_candidates_without_seekable_fields() {
        let mut q = AggregateQueryFamily::new("t");
        q.add_other("amount");
        assert!(candidate_families(&q).is_empty());
    }

    #[test]
    fn test_equality_only_candidate() {
        let mut q = AggregateQueryFamily::new("t");
        q.add_eq("a");
        q.add_eq("b");
        q.add_other("amount");

        let candidates = candidate_families(&q);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].flex, set(&["a", "b"]));
        assert_eq!(candidates[0].last, None);
        assert_eq!(candidates[0].included, set(&["amount"]));
    }

    #[test]
    fn test_one_candidate_per_range_field() {
        let mut q = AggregateQueryFamily::new("t");
        q.add_eq("a");
        q.add_ineq("x");
        q.add_ineq("y");
        q.add_other("amount");

        let candidates = candidate_families(&q);
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].last.as_deref(), Some("x"));
        assert_eq!(candidates[0].included, set(&["amount", "y"]));
        assert_eq!(candidates[1].last.as_deref(), Some("y"));
        assert_eq!(candidates[1].included, set(&["amount", "x"]));

        for c in &candidates {
            assert_eq!(c.flex, set(&["a"]));
        }
    }

    #[test]
    fn test_display() {
        let mut f = IndexFamily::new("t");
        f.flex = set(&["a"]);
        f.last = Some("b".into());
        f.included = set(&["c"]);
        assert_eq!(f.to_string(), "t([] {a} b) INCLUDE (c)");
    }
}
