//! Concrete indexes
//!
//! A literal composite index: an ordered key plus included columns. Used
//! both for indexes read back from a tenant's catalog and for indexes the
//! advisor asks to create.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::index_family::IndexFamily;
use super::normalize_identifier;

/// A physical composite index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConcreteIndex {
    /// Table name
    pub table: String,
    /// Key columns in order
    pub indexed: Vec<String>,
    /// Non-key columns stored in the index
    #[serde(default)]
    pub included: BTreeSet<String>,
}

impl ConcreteIndex {
    /// Creates an index definition, normalizing every identifier
    pub fn new<I, J, S, T>(table: &str, indexed: I, included: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            table: normalize_identifier(table),
            indexed: indexed
                .into_iter()
                .map(|c| normalize_identifier(c.as_ref()))
                .collect(),
            included: included
                .into_iter()
                .map(|c| normalize_identifier(c.as_ref()))
                .collect(),
        }
    }

    /// Returns a copy with every identifier normalized.
    ///
    /// Catalog rows and JSON input may use any case.
    pub fn normalized(&self) -> Self {
        Self::new(&self.table, &self.indexed, &self.included)
    }

    /// Projects a family onto one literal index:
    /// `fixed ++ sorted(flex) ++ [last]`.
    pub fn from_family(family: &IndexFamily) -> Self {
        let mut indexed = family.fixed.clone();
        indexed.extend(family.flex.iter().cloned());
        indexed.extend(family.last.iter().cloned());

        Self {
            table: family.table.clone(),
            indexed,
            included: family.included.clone(),
        }
    }

    /// Returns true if this index serves every query the family describes.
    ///
    /// - the key starts with `fixed`, in order
    /// - the next `|flex|` key columns are exactly `flex`, in any order
    /// - the column after them is `last`, when set
    /// - further key columns are allowed
    /// - every included column of the family is in the key or included here
    pub fn covers(&self, family: &IndexFamily) -> bool {
        if self.table != family.table || self.indexed.len() < family.size() {
            return false;
        }

        let fixed_end = family.fixed.len();
        if self.indexed[..fixed_end] != family.fixed[..] {
            return false;
        }

        let flex_end = fixed_end + family.flex.len();
        let flex: BTreeSet<&str> = self.indexed[fixed_end..flex_end]
            .iter()
            .map(String::as_str)
            .collect();
        if flex.len() != family.flex.len() || !family.flex.iter().all(|c| flex.contains(c.as_str()))
        {
            return false;
        }

        if let Some(last) = &family.last {
            if &self.indexed[flex_end] != last {
                return false;
            }
        }

        family
            .included
            .iter()
            .all(|c| self.included.contains(c) || self.indexed.contains(c))
    }

    /// Returns true if both describe the same physical index.
    pub fn same_definition(&self, other: &ConcreteIndex) -> bool {
        self.table == other.table
            && self.indexed == other.indexed
            && self.included == other.included
    }
}

impl fmt::Display for ConcreteIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.table, self.indexed.join(", "))?;
        if !self.included.is_empty() {
            let included: Vec<&str> = self.included.iter().map(String::as_str).collect();
            write!(f, " INCLUDE ({})", included.join(", "))?;
        }
        Ok(())
    }
}

/// Projects minimized families onto literal indexes, preserving order
pub fn project(families: &[IndexFamily]) -> Vec<ConcreteIndex> {
    families.iter().map(ConcreteIndex::from_family).collect()
}
