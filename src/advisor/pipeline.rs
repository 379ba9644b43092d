//! The advice pipeline
//!
//! extract → generate → filter covered → minimize → project
//!
//! Pure and synchronous. The only input besides the ASTs is the list of
//! indexes already present on the tenant's schema, which the caller reads
//! from its catalog beforehand (see [`tables_of`]).

use std::collections::BTreeSet;

use serde::Serialize;

use crate::ast::Node;

use super::concrete::{project, ConcreteIndex};
use super::coverage::retain_uncovered;
use super::errors::AdvisorResult;
use super::extract::extract_query_families;
use super::index_family::{candidate_families, IndexFamily};
use super::minimizer::minimize;
use super::query_family::AggregateQueryFamily;

/// Counters describing one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdviceStats {
    /// Distinct aggregation shapes
    pub query_families: usize,
    /// Candidate families generated from them
    pub candidates: usize,
    /// Candidates already served by an existing index
    pub covered: usize,
    /// Indexes left after minimization
    pub proposed: usize,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct Advice {
    /// Distinct aggregation shapes found in the ASTs
    pub query_families: Vec<AggregateQueryFamily>,
    /// Indexes to create, in deterministic order
    pub to_create: Vec<ConcreteIndex>,
    /// Run counters
    pub stats: AdviceStats,
}

/// Tables whose existing indexes [`advise`] needs to see
pub fn tables_of(query_families: &[AggregateQueryFamily]) -> BTreeSet<String> {
    query_families
        .iter()
        .filter(|f| f.is_indexable())
        .map(|f| f.table.clone())
        .collect()
}

/// Every candidate family of every query shape
pub fn candidates_for(query_families: &[AggregateQueryFamily]) -> Vec<IndexFamily> {
    query_families.iter().flat_map(candidate_families).collect()
}

/// Runs generation, coverage filtering, minimization and projection
pub fn advise(query_families: Vec<AggregateQueryFamily>, existing: &[ConcreteIndex]) -> Advice {
    let existing: Vec<ConcreteIndex> = existing.iter().map(ConcreteIndex::normalized).collect();

    let candidates = candidates_for(&query_families);
    let candidate_count = candidates.len();

    let (uncovered, covered) = retain_uncovered(candidates, &existing);
    let minimized = minimize(&uncovered);
    let to_create = project(&minimized);

    let stats = AdviceStats {
        query_families: query_families.len(),
        candidates: candidate_count,
        covered,
        proposed: to_create.len(),
    };

    Advice {
        query_families,
        to_create,
        stats,
    }
}

/// Extracts query shapes from `asts` and runs the full pipeline
pub fn indexes_to_create<'a, I>(asts: I, existing: &[ConcreteIndex]) -> AdvisorResult<Advice>
where
    I: IntoIterator<Item = &'a Node>,
{
    let query_families = extract_query_families(asts)?;
    Ok(advise(query_families, existing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Function;
    use serde_json::json;

    fn agg(field: &str, filters: &[(&str, &str)]) -> Node {
        Node::aggregator(
            "transactions",
            field,
            filters
                .iter()
                .map(|(f, op)| Node::filter("transactions", f, op, json!(1)))
                .collect(),
        )
    }

    #[test]
    fn test_tables_of_skips_unindexable() {
        let mut a = AggregateQueryFamily::new("a");
        a.add_eq("x");
        let mut b = AggregateQueryFamily::new("b");
        b.add_other("y");

        let tables = tables_of(&[a, b]);
        assert_eq!(tables.into_iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_stats() {
        let rule = Node::call(
            Function::And,
            vec![
                agg("amount", &[("account_id", "="), ("created_at", ">")]),
                agg("amount", &[("account_id", "=")]),
                agg("amount", &[]),
            ],
        );
        let existing = vec![ConcreteIndex::new(
            "transactions",
            ["account_id"],
            ["amount"],
        )];

        let advice = indexes_to_create([&rule], &existing).unwrap();
        assert_eq!(advice.stats.query_families, 3);
        assert_eq!(advice.stats.candidates, 2);
        assert_eq!(advice.stats.covered, 1);
        assert_eq!(advice.stats.proposed, 1);
        assert_eq!(
            advice.to_create[0].indexed,
            vec!["account_id", "created_at"]
        );
    }

    #[test]
    fn test_existing_index_case_ignored() {
        let rule = agg("amount", &[("account_id", "=")]);
        let existing = vec![ConcreteIndex {
            table: "Transactions".into(),
            indexed: vec!["ACCOUNT_ID".into()],
            included: ["Amount".to_string()].into_iter().collect(),
        }];

        let advice = indexes_to_create([&rule], &existing).unwrap();
        assert!(advice.to_create.is_empty());
    }
}
