//! Coverage filtering against the tenant's existing indexes

use super::concrete::ConcreteIndex;
use super::index_family::IndexFamily;

/// Returns the first existing index covering the family, if any
pub fn covering_index<'a>(
    family: &IndexFamily,
    existing: &'a [ConcreteIndex],
) -> Option<&'a ConcreteIndex> {
    existing.iter().find(|idx| idx.covers(family))
}

/// Splits candidates into those still needing an index and the number
/// already served by an existing one.
pub fn retain_uncovered(
    candidates: Vec<IndexFamily>,
    existing: &[ConcreteIndex],
) -> (Vec<IndexFamily>, usize) {
    let before = candidates.len();
    let uncovered: Vec<IndexFamily> = candidates
        .into_iter()
        .filter(|family| covering_index(family, existing).is_none())
        .collect();
    let covered = before - uncovered.len();
    (uncovered, covered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flex_family(flex: &[&str], last: Option<&str>) -> IndexFamily {
        let mut f = IndexFamily::new("t");
        f.flex = flex.iter().map(|s| s.to_string()).collect();
        f.last = last.map(str::to_string);
        f
    }

    #[test]
    fn test_covered_candidates_removed() {
        let existing = vec![ConcreteIndex::new("t", ["a", "b"], ["amount"])];
        let candidates = vec![
            flex_family(&["a"], Some("b")),
            flex_family(&["a"], Some("c")),
        ];

        let (uncovered, covered) = retain_uncovered(candidates, &existing);
        assert_eq!(covered, 1);
        assert_eq!(uncovered.len(), 1);
        assert_eq!(uncovered[0].last.as_deref(), Some("c"));
    }

    #[test]
    fn test_no_existing_indexes() {
        let candidates = vec![flex_family(&["a"], None)];
        let (uncovered, covered) = retain_uncovered(candidates.clone(), &[]);
        assert_eq!(covered, 0);
        assert_eq!(uncovered, candidates);
    }

    #[test]
    fn test_covering_index_found() {
        let existing = vec![
            ConcreteIndex::new("t", ["x"], Vec::<&str>::new()),
            ConcreteIndex::new("t", ["a", "z"], Vec::<&str>::new()),
        ];
        let found = covering_index(&flex_family(&["a"], None), &existing).unwrap();
        assert_eq!(found.indexed, vec!["a", "z"]);
    }
}
