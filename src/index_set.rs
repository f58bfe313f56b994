use std::collections::HashSet;

use serde::{Serialize, Serializer};

use crate::models::RegionId;

/// Ordered, duplicate-free set of region ids.
/// Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet {
    order: Vec<RegionId>,
    members: HashSet<RegionId>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id`; returns false if it was already present
    pub fn insert(&mut self, id: RegionId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn contains(&self, id: RegionId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = RegionId> + '_ {
        self.order.iter().copied()
    }

    pub fn as_slice(&self) -> &[RegionId] {
        &self.order
    }

    /// Members of `self` also in `other`, in `self`'s order
    pub fn intersection(&self, other: &IndexSet) -> IndexSet {
        self.iter().filter(|id| other.contains(*id)).collect()
    }

    /// Members of `self` not in `other`, in `self`'s order
    pub fn difference(&self, other: &IndexSet) -> IndexSet {
        self.iter().filter(|id| !other.contains(*id)).collect()
    }

    pub fn is_subset(&self, other: &IndexSet) -> bool {
        self.iter().all(|id| other.contains(id))
    }
}

impl FromIterator<RegionId> for IndexSet {
    fn from_iter<T: IntoIterator<Item = RegionId>>(iter: T) -> Self {
        let mut set = IndexSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a IndexSet {
    type Item = RegionId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, RegionId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter().copied()
    }
}

impl Serialize for IndexSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.order.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> IndexSet {
        raw.iter().map(|&i| RegionId(i)).collect()
    }

    #[test]
    fn test_insert_keeps_order_and_drops_duplicates() {
        let mut set = ids(&[3, 1]);
        assert!(!set.insert(RegionId(3)));
        assert!(set.insert(RegionId(2)));
        assert_eq!(set.as_slice(), &[RegionId(3), RegionId(1), RegionId(2)]);
    }

    #[test]
    fn test_intersection_follows_receiver_order() {
        let a = ids(&[5, 2, 9, 4]);
        let b = ids(&[4, 9, 1]);
        assert_eq!(a.intersection(&b), ids(&[9, 4]));
        assert_eq!(b.intersection(&a), ids(&[4, 9]));
        assert_eq!(a.difference(&b), ids(&[5, 2]));
    }
}
