//! Family minimization
//!
//! Merges overlapping candidate families so that dozens of rules reading
//! the same table end up sharing a handful of indexes.
//!
//! # Merge rule
//!
//! Two families merge only when one physical column ordering satisfies
//! both. Each family constrains the index through its cumulative block
//! boundaries (see [`IndexFamily::boundaries`]): the first `|b|` key columns
//! must be exactly `b`. Two families are compatible iff the union of their
//! boundaries is a chain under inclusion. The chain's successive
//! differences are then the block sequence of the merged family.
//!
//! # Determinism
//!
//! Candidates are partitioned by table and folded in canonical-key order,
//! so identical inputs always produce identical outputs. When several
//! minimal answers exist, the fold order picks one.

use std::collections::{BTreeMap, BTreeSet};

use super::index_family::IndexFamily;

/// Merges two families into one that every index serving it also serves
/// both inputs. `None` when no single column ordering fits both; that is
/// the common case, not an error.
pub fn merge(a: &IndexFamily, b: &IndexFamily) -> Option<IndexFamily> {
    if a.table != b.table {
        return None;
    }

    let mut merged = merge_keys(a, b)?;
    merged.included = a.included.union(&b.included).cloned().collect();
    merged.normalize();
    Some(merged)
}

/// Peels the common fixed prefix, then reconciles the remaining blocks.
fn merge_keys(a: &IndexFamily, b: &IndexFamily) -> Option<IndexFamily> {
    if let (Some(x), Some(y)) = (a.fixed.first(), b.fixed.first()) {
        if x != y {
            return None;
        }
        let mut rest = merge_keys(&a.without_first_fixed(), &b.without_first_fixed())?;
        rest.fixed.insert(0, x.clone());
        return Some(rest);
    }

    reconcile_blocks(a, b)
}

/// At least one side has no fixed prefix left here.
fn reconcile_blocks(a: &IndexFamily, b: &IndexFamily) -> Option<IndexFamily> {
    let mut boundaries = a.boundaries();
    boundaries.extend(b.boundaries());
    boundaries.sort_by(|l, r| l.len().cmp(&r.len()).then_with(|| l.cmp(r)));
    boundaries.dedup();

    let mut blocks = Vec::with_capacity(boundaries.len());
    let mut prev: BTreeSet<String> = BTreeSet::new();
    for boundary in boundaries {
        // Same-sized but different boundaries also land here
        if !prev.is_subset(&boundary) {
            return None;
        }
        blocks.push(boundary.difference(&prev).cloned().collect());
        prev = boundary;
    }

    Some(IndexFamily::from_blocks(a.table.clone(), blocks))
}

/// Reduces candidates to a small set of families such that every candidate
/// is served by (the projection of) one of them.
///
/// Output is grouped by table in table order.
pub fn minimize(candidates: &[IndexFamily]) -> Vec<IndexFamily> {
    let mut by_table: BTreeMap<String, Vec<IndexFamily>> = BTreeMap::new();
    for candidate in candidates {
        let mut family = candidate.clone();
        family.normalize();
        by_table.entry(family.table.clone()).or_default().push(family);
    }

    by_table
        .into_values()
        .flat_map(minimize_table)
        .collect()
}

/// Folds until a pass merges nothing. A merged family may absorb a family
/// that was appended before it grew, so one pass is not always enough.
fn minimize_table(mut families: Vec<IndexFamily>) -> Vec<IndexFamily> {
    loop {
        let before = families.len();
        families = fold(families);
        if families.len() == before {
            return families;
        }
    }
}

fn fold(mut families: Vec<IndexFamily>) -> Vec<IndexFamily> {
    families.sort_by_cached_key(IndexFamily::canonical_key);
    families.dedup();

    let mut acc: Vec<IndexFamily> = Vec::with_capacity(families.len());
    for family in families {
        let hit = acc
            .iter()
            .enumerate()
            .find_map(|(i, existing)| merge(existing, &family).map(|m| (i, m)));

        match hit {
            Some((i, merged)) => acc[i] = merged,
            None => acc.push(family),
        }
    }
    acc
}
