//! SupervisedFiberSet - 子孫 fiber のハンドル集合

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::FiberId;

/// Set of descendant fiber handles recorded under [`Property::fibers`](super::Property::fibers).
///
/// Entries are ids, not references: each one is resolved through the
/// registry, which may in turn report that fiber's own nested set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisedFiberSet {
    fibers: BTreeSet<FiberId>,
}

impl SupervisedFiberSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(fiber: FiberId) -> Self {
        Self {
            fibers: BTreeSet::from([fiber]),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            fibers: self.fibers.union(&other.fibers).copied().collect(),
        }
    }

    pub fn insert(&mut self, fiber: FiberId) -> bool {
        self.fibers.insert(fiber)
    }

    pub fn remove(&mut self, fiber: &FiberId) -> bool {
        self.fibers.remove(fiber)
    }

    pub fn contains(&self, fiber: &FiberId) -> bool {
        self.fibers.contains(fiber)
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FiberId> + '_ {
        self.fibers.iter().copied()
    }
}

impl FromIterator<FiberId> for SupervisedFiberSet {
    fn from_iter<I: IntoIterator<Item = FiberId>>(iter: I) -> Self {
        Self {
            fibers: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for SupervisedFiberSet {
    type Item = FiberId;
    type IntoIter = std::collections::btree_set::IntoIter<FiberId>;

    fn into_iter(self) -> Self::IntoIter {
        self.fibers.into_iter()
    }
}
