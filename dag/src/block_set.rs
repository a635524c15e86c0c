//! Unordered set of block ids.
//!
//! Iteration order is never observable through consensus outputs; every
//! order-producing operation funnels through the deterministic sort in
//! [`crate::graph::sort_by_past_count`].

use std::collections::hash_set;
use std::collections::HashSet;

use strand_types::BlockId;

/// An unordered set of block ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockSet {
    inner: HashSet<BlockId>,
}

impl BlockSet {
    pub fn new() -> Self {
        Self {
            inner: HashSet::new(),
        }
    }

    /// Insert an id; returns false if it was already present.
    pub fn add(&mut self, id: BlockId) -> bool {
        self.inner.insert(id)
    }

    /// Remove an id; returns true if it was present.
    pub fn remove(&mut self, id: &BlockId) -> bool {
        self.inner.remove(id)
    }

    pub fn has(&self, id: &BlockId) -> bool {
        self.inner.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// True if this set is exactly `{id}`.
    pub fn has_only(&self, id: &BlockId) -> bool {
        self.inner.len() == 1 && self.inner.contains(id)
    }

    /// Insert every member of `other`.
    pub fn add_set(&mut self, other: &BlockSet) {
        for id in &other.inner {
            self.inner.insert(*id);
        }
    }

    /// Remove every member of `other`.
    pub fn exclude(&mut self, other: &BlockSet) {
        for id in &other.inner {
            self.inner.remove(id);
        }
    }

    pub fn union(&self, other: &BlockSet) -> BlockSet {
        BlockSet {
            inner: self.inner.union(&other.inner).copied().collect(),
        }
    }

    pub fn intersection(&self, other: &BlockSet) -> BlockSet {
        BlockSet {
            inner: self.inner.intersection(&other.inner).copied().collect(),
        }
    }

    pub fn difference(&self, other: &BlockSet) -> BlockSet {
        BlockSet {
            inner: self.inner.difference(&other.inner).copied().collect(),
        }
    }

    /// True if every member of `other` is in this set.
    pub fn contains_set(&self, other: &BlockSet) -> bool {
        other.inner.is_subset(&self.inner)
    }

    /// Snapshot iterator; order is unspecified.
    pub fn iter(&self) -> hash_set::Iter<'_, BlockId> {
        self.inner.iter()
    }
}

impl FromIterator<BlockId> for BlockSet {
    fn from_iter<I: IntoIterator<Item = BlockId>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Extend<BlockId> for BlockSet {
    fn extend<I: IntoIterator<Item = BlockId>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<'a> IntoIterator for &'a BlockSet {
    type Item = &'a BlockId;
    type IntoIter = hash_set::Iter<'a, BlockId>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> BlockId {
        let mut bytes = [0u8; 32];
        bytes[0] = n;
        BlockId::new(bytes)
    }

    #[test]
    fn add_remove_has() {
        let mut set = BlockSet::new();
        assert!(set.add(id(1)));
        assert!(!set.add(id(1)));
        assert!(set.has(&id(1)));
        assert_eq!(set.len(), 1);
        assert!(set.remove(&id(1)));
        assert!(!set.remove(&id(1)));
        assert!(set.is_empty());
    }

    #[test]
    fn has_only() {
        let mut set = BlockSet::new();
        set.add(id(1));
        assert!(set.has_only(&id(1)));
        set.add(id(2));
        assert!(!set.has_only(&id(1)));
    }

    #[test]
    fn set_algebra() {
        let a: BlockSet = [id(1), id(2), id(3)].into_iter().collect();
        let b: BlockSet = [id(2), id(3), id(4)].into_iter().collect();

        let union = a.union(&b);
        assert_eq!(union.len(), 4);

        let inter = a.intersection(&b);
        assert_eq!(inter.len(), 2);
        assert!(inter.has(&id(2)) && inter.has(&id(3)));

        let diff = a.difference(&b);
        assert!(diff.has_only(&id(1)));
    }

    #[test]
    fn contains_set_is_superset() {
        let big: BlockSet = [id(1), id(2), id(3)].into_iter().collect();
        let small: BlockSet = [id(1), id(3)].into_iter().collect();
        assert!(big.contains_set(&small));
        assert!(!small.contains_set(&big));
        assert!(big.contains_set(&BlockSet::new()));
    }

    #[test]
    fn exclude_removes_members() {
        let mut a: BlockSet = [id(1), id(2), id(3)].into_iter().collect();
        let b: BlockSet = [id(2), id(9)].into_iter().collect();
        a.exclude(&b);
        assert_eq!(a.len(), 2);
        assert!(!a.has(&id(2)));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a: BlockSet = [id(1), id(2)].into_iter().collect();
        let b: BlockSet = [id(2), id(1)].into_iter().collect();
        assert_eq!(a, b);
    }
}
