// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time-ordered multimap tuned for mostly-chronological batch insertion.
//!
//! [`TimelineMultimap`] is a single `Vec` of `(key, value)` pairs split at a
//! cursor:
//!
//! ```text
//!   [ sorted prefix ............ | unsorted suffix ... ]
//!                                ^ sorted_len
//! ```
//!
//! Appends go to the suffix in O(1). The first query after a batch of
//! appends sorts the suffix (O(u log u)) and merges it into the prefix
//! (O(n)), so a frame's worth of events costs one sort instead of one
//! shifting insert per event. Equal keys keep insertion order.
//!
//! Queries that may sort take `&mut self`. Erasure is only defined on a fully
//! sorted buffer.

use alloc::vec::Vec;
use core::ops::Range;

/// An append-friendly multimap ordered by key.
#[derive(Clone, Debug)]
pub struct TimelineMultimap<K, V> {
    entries: Vec<(K, V)>,
    /// Entries before this index are sorted by key.
    sorted_len: usize,
}

impl<K, V> Default for TimelineMultimap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            sorted_len: 0,
        }
    }
}

impl<K: Ord + Copy, V> TimelineMultimap<K, V> {
    /// Creates an empty multimap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty multimap with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            sorted_len: 0,
        }
    }

    /// Number of entries, sorted or not.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if no appends are waiting to be merged.
    #[inline]
    #[must_use]
    pub fn is_sorted_up_to_date(&self) -> bool {
        self.sorted_len == self.entries.len()
    }

    /// Appends an entry and returns its current position.
    ///
    /// The position is only meaningful until the next sort (any query).
    /// Appending a key no smaller than the last sorted key keeps the buffer
    /// fully sorted.
    pub fn emplace(&mut self, key: K, value: V) -> usize {
        let pos = self.entries.len();
        let in_order = self.is_sorted_up_to_date()
            && self.entries.last().is_none_or(|(last, _)| *last <= key);
        self.entries.push((key, value));
        if in_order {
            self.sorted_len = self.entries.len();
        }
        pos
    }

    /// Merges pending appends into the sorted prefix.
    pub fn sort(&mut self) {
        if self.is_sorted_up_to_date() {
            return;
        }
        let split = self.sorted_len;
        self.entries[split..].sort_by_key(|(k, _)| *k);
        // Prefix entries with keys <= the smallest appended key are already in
        // their final position; only the tail after them needs merging.
        let first_new = self.entries[split].0;
        let merge_start = self.entries[..split].partition_point(|(k, _)| *k <= first_new);
        if merge_start < split {
            // Two sorted runs; the stable sort merges them in linear time and
            // keeps prefix entries ahead of equal-keyed appends.
            self.entries[merge_start..].sort_by_key(|(k, _)| *k);
        }
        self.sorted_len = self.entries.len();
    }

    /// Index of the first entry whose key is not less than `key`.
    pub fn lower_bound(&mut self, key: K) -> usize {
        self.sort();
        self.entries.partition_point(|(k, _)| *k < key)
    }

    /// Index of the first entry whose key is greater than `key`.
    pub fn upper_bound(&mut self, key: K) -> usize {
        self.sort();
        self.entries.partition_point(|(k, _)| *k <= key)
    }

    /// All entries in key order.
    pub fn as_sorted_slice(&mut self) -> &[(K, V)] {
        self.sort();
        &self.entries
    }

    /// Entries with `lo <= key <= hi`, in key order.
    pub fn between(&mut self, lo: K, hi: K) -> &[(K, V)] {
        let begin = self.lower_bound(lo);
        let end = self.entries.partition_point(|(k, _)| *k <= hi).max(begin);
        &self.entries[begin..end]
    }

    /// Entries in storage order: the sorted prefix followed by pending
    /// appends.
    ///
    /// Use this for order-insensitive passes that only have `&self`.
    #[inline]
    #[must_use]
    pub fn entries_unordered(&self) -> &[(K, V)] {
        &self.entries
    }

    /// Removes the entries at `range` (indices into the sorted order).
    ///
    /// # Panics
    ///
    /// Panics if appends are pending (call a query or [`sort`](Self::sort)
    /// first) or if `range` is out of bounds.
    pub fn erase(&mut self, range: Range<usize>) {
        assert!(
            self.is_sorted_up_to_date(),
            "erase requires a fully sorted timeline"
        );
        self.entries.drain(range);
        self.sorted_len = self.entries.len();
    }

    /// Removes the first `end` entries in key order.
    ///
    /// # Panics
    ///
    /// Same conditions as [`erase`](Self::erase).
    pub fn erase_prefix(&mut self, end: usize) {
        self.erase(0..end);
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.sorted_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn keys(map: &mut TimelineMultimap<u64, u32>) -> Vec<u64> {
        map.as_sorted_slice().iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn in_order_appends_stay_sorted() {
        let mut map = TimelineMultimap::new();
        for k in [1_u64, 2, 2, 5, 9] {
            map.emplace(k, 0_u32);
        }
        assert!(map.is_sorted_up_to_date(), "chronological appends need no merge");
        assert_eq!(keys(&mut map), vec![1, 2, 2, 5, 9]);
    }

    #[test]
    fn out_of_order_batch_merges() {
        let mut map = TimelineMultimap::new();
        for k in [10_u64, 20, 30] {
            map.emplace(k, 0_u32);
        }
        assert_eq!(map.lower_bound(0), 0);
        for k in [25_u64, 5, 40, 15] {
            map.emplace(k, 1);
        }
        assert!(!map.is_sorted_up_to_date(), "late appends are pending");
        assert_eq!(keys(&mut map), vec![5, 10, 15, 20, 25, 30, 40]);
    }

    #[test]
    fn interleaved_queries_keep_invariant() {
        let mut map = TimelineMultimap::new();
        let mut expected = Vec::new();
        // A deterministic scramble: mostly increasing with periodic stragglers.
        let mut seed = 7_u64;
        for round in 0..20_u64 {
            for _ in 0..5 {
                seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                let key = round * 100 + (seed >> 58);
                map.emplace(key, 0_u32);
                expected.push(key);
            }
            let probe = round * 100;
            let lb = map.lower_bound(probe);
            let sorted = map.as_sorted_slice();
            assert!(
                sorted.windows(2).all(|w| w[0].0 <= w[1].0),
                "prefix must be sorted after a query"
            );
            assert!(sorted[..lb].iter().all(|(k, _)| *k < probe), "lower bound");
        }
        expected.sort_unstable();
        assert_eq!(keys(&mut map), expected);
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let mut map = TimelineMultimap::new();
        map.emplace(10_u64, 0_u32);
        map.emplace(20, 1);
        map.emplace(10, 2);
        map.emplace(10, 3);
        let values: Vec<u32> = map.as_sorted_slice().iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 2, 3, 1]);
    }

    #[test]
    fn bounds_and_between() {
        let mut map = TimelineMultimap::new();
        for k in [3_u64, 1, 4, 1, 5, 9, 2, 6] {
            map.emplace(k, 0_u32);
        }
        assert_eq!(map.lower_bound(1), 0);
        assert_eq!(map.upper_bound(1), 2);
        assert_eq!(map.lower_bound(7), 7);
        assert_eq!(map.upper_bound(100), 8);
        let window: Vec<u64> = map.between(2, 5).iter().map(|(k, _)| *k).collect();
        assert_eq!(window, vec![2, 3, 4, 5]);
        assert!(map.between(7, 8).is_empty(), "no keys in range");
        assert!(map.between(9, 1).is_empty(), "inverted range");
    }

    #[test]
    fn erase_prefix_after_sort() {
        let mut map = TimelineMultimap::new();
        for k in [5_u64, 1, 3] {
            map.emplace(k, 0_u32);
        }
        let cut = map.lower_bound(3);
        map.erase_prefix(cut);
        assert_eq!(keys(&mut map), vec![3, 5]);
        map.emplace(4, 0);
        map.sort();
        map.erase(1..2);
        assert_eq!(keys(&mut map), vec![3, 5]);
    }

    #[test]
    #[should_panic(expected = "erase requires a fully sorted timeline")]
    fn erase_with_pending_appends_panics() {
        let mut map = TimelineMultimap::new();
        map.emplace(5_u64, 0_u32);
        map.emplace(1, 0);
        map.erase_prefix(1);
    }

    #[test]
    fn clear_resets() {
        let mut map = TimelineMultimap::with_capacity(4);
        map.emplace(2_u64, 0_u32);
        map.emplace(1, 0);
        map.clear();
        assert!(map.is_empty());
        assert!(map.is_sorted_up_to_date());
        assert_eq!(map.len(), 0);
    }
}
