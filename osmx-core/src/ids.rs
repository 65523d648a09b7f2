//! Identifier sets backing the reference closure.
//!
//! The extraction engine only ever asks "was this id referenced by a kept
//! entity?", so both implementations are grow-only and expose membership
//! and bulk insertion. [`HashIdSet`] is the default; [`SortedIdSet`] keeps a
//! single ascending vector and trades insert cost for a smaller footprint.

use std::collections::HashSet;

/// Occupancy ratio above which a [`SortedIdSet`] doubles its capacity.
const GROWTH_THRESHOLD: f64 = 0.9;

/// Initial capacity of a [`SortedIdSet`].
const INITIAL_CAPACITY: usize = 1024;

/// Grow-only membership set over 64-bit identifiers.
pub trait IdMembership: Default {
    /// Whether `id` has been inserted.
    fn contains(&self, id: u64) -> bool;

    /// Insert every id yielded by `ids`.
    fn extend_ids<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = u64>;

    /// Number of stored ids. May count duplicates for sets that tolerate them.
    fn len(&self) -> usize;

    /// Whether nothing has been inserted.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash-based identifier set.
///
/// # Examples
/// ```
/// use osmx_core::{HashIdSet, IdMembership};
///
/// let mut ids = HashIdSet::default();
/// ids.extend_ids([4, 8, 4]);
/// assert!(ids.contains(8));
/// assert!(!ids.contains(5));
/// assert_eq!(ids.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HashIdSet {
    ids: HashSet<u64>,
}

impl IdMembership for HashIdSet {
    fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    fn extend_ids<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = u64>,
    {
        self.ids.extend(ids);
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Ascending vector of identifiers searched with binary search.
///
/// Appends tolerate duplicates; [`SortedIdSet::bulk_insert`] with `dedup`
/// re-sorts and removes them. Until that happens membership falls back to a
/// linear scan.
///
/// # Examples
/// ```
/// use osmx_core::SortedIdSet;
///
/// let mut ids = SortedIdSet::new();
/// ids.bulk_insert([30, 10, 20], true);
/// ids.bulk_insert([10, 5], true);
/// assert!(ids.contains(5));
/// assert!(ids.contains(30));
/// assert!(!ids.contains(15));
/// assert_eq!(ids.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct SortedIdSet {
    ids: Vec<u64>,
    sorted: bool,
}

impl Default for SortedIdSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SortedIdSet {
    /// Create an empty set with the default initial capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: Vec::with_capacity(INITIAL_CAPACITY),
            sorted: true,
        }
    }

    /// Binary search for `id`, or scan if unsorted appends are pending.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        if self.sorted {
            self.ids.binary_search(&id).is_ok()
        } else {
            self.ids.contains(&id)
        }
    }

    /// Append `ids`, then optionally re-sort and drop duplicates.
    pub fn bulk_insert<I>(&mut self, ids: I, dedup: bool)
    where
        I: IntoIterator<Item = u64>,
    {
        let incoming: Vec<u64> = ids.into_iter().collect();
        if incoming.is_empty() {
            return;
        }
        self.reserve_for(incoming.len());
        self.ids.extend(incoming);
        if dedup {
            self.ids.sort_unstable();
            self.ids.dedup();
            self.sorted = true;
        } else {
            self.sorted = false;
        }
    }

    /// Number of stored ids, counting duplicates from non-dedup inserts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set holds no ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Double capacity until the pending insert stays below the threshold.
    #[expect(
        clippy::cast_precision_loss,
        clippy::float_arithmetic,
        reason = "occupancy ratio only steers growth, exactness is irrelevant"
    )]
    fn reserve_for(&mut self, additional: usize) {
        let needed = self.ids.len() + additional;
        let mut capacity = self.ids.capacity().max(INITIAL_CAPACITY);
        while needed as f64 / capacity as f64 > GROWTH_THRESHOLD {
            capacity *= 2;
        }
        if capacity > self.ids.capacity() {
            self.ids.reserve_exact(capacity - self.ids.len());
        }
    }
}

impl IdMembership for SortedIdSet {
    fn contains(&self, id: u64) -> bool {
        Self::contains(self, id)
    }

    fn extend_ids<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = u64>,
    {
        self.bulk_insert(ids, true);
    }

    fn len(&self) -> usize {
        Self::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    fn empty_sets_contain_nothing() {
        assert!(!SortedIdSet::new().contains(0));
        assert!(!HashIdSet::default().contains(1));
        assert!(SortedIdSet::new().is_empty());
    }

    #[rstest]
    fn unsorted_appends_remain_visible() {
        let mut ids = SortedIdSet::new();
        ids.bulk_insert([9, 3, 7], false);
        assert!(ids.contains(3));
        assert!(ids.contains(9));
        assert!(!ids.contains(4));
        ids.bulk_insert([3], true);
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(7));
    }

    #[rstest]
    fn capacity_grows_geometrically() {
        let mut ids = SortedIdSet::new();
        ids.bulk_insert(0..2000, true);
        assert!(ids.ids.capacity() >= 2048);
        let ratio = ids.len() * 10;
        assert!(ratio <= ids.ids.capacity() * 9, "occupancy above 90%");
    }

    proptest! {
        #[test]
        fn sorted_set_membership_matches_inserted(
            first in proptest::collection::vec(0u64..500, 0..200),
            second in proptest::collection::vec(0u64..500, 0..200),
            candidate in 0u64..500,
        ) {
            let mut ids = SortedIdSet::new();
            ids.bulk_insert(first.iter().copied(), true);
            ids.bulk_insert(second.iter().copied(), true);
            let expected = first.contains(&candidate) || second.contains(&candidate);
            prop_assert_eq!(ids.contains(candidate), expected);
            for id in first.iter().chain(second.iter()) {
                prop_assert!(ids.contains(*id));
            }
        }

        #[test]
        fn hash_and_sorted_sets_agree(
            inserted in proptest::collection::vec(any::<u64>(), 0..100),
            candidate in any::<u64>(),
        ) {
            let mut sorted = SortedIdSet::new();
            let mut hashed = HashIdSet::default();
            IdMembership::extend_ids(&mut sorted, inserted.iter().copied());
            hashed.extend_ids(inserted.iter().copied());
            prop_assert_eq!(IdMembership::contains(&sorted, candidate), hashed.contains(candidate));
            prop_assert_eq!(IdMembership::len(&sorted), hashed.len());
        }
    }
}
