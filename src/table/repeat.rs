//! Run-length bookkeeping for repeated table content.
//!
//! ODF collapses runs of identical rows, columns and cells into one XML
//! node carrying a repeat-count attribute. This module maps between the
//! *raw* entries actually present and the *logical* positions they stand
//! for, without materializing the expanded form.
//!
//! [`RepeatMap`] keeps one inclusive end position per raw entry, so the
//! array is strictly increasing and a logical position resolves to a raw
//! index with one binary search. Entries `[2, 1, 2]` produce ends
//! `[1, 2, 4]`: positions 0-1 live in entry 0, position 2 in entry 1,
//! positions 3-4 in entry 2.
//!
//! Every mutation patches the map and the backing store in the same call.
//! The store side is abstracted by [`RunStore`], implemented over a row's
//! cell buffer and over raw row/column elements in the document tree, so
//! the split arithmetic lives in exactly one place.

use crate::Result;

/// Backing storage for a run sequence: the payloads the map counts.
///
/// Implementations mirror map mutations onto their own representation
/// (a `Vec` of cells, repeat attributes on tree elements). Raw indices
/// always refer to the state the map had when the callback fires.
pub(crate) trait RunStore {
    /// Split entry `raw` into two adjacent entries with repeat counts
    /// `keep` and `rest`, duplicating its payload.
    fn split_run(&mut self, raw: usize, keep: usize, rest: usize) -> Result<()>;

    /// Update the repeat count of entry `raw`.
    fn set_repeat(&mut self, raw: usize, repeat: usize) -> Result<()>;

    /// Remove entry `raw` entirely.
    fn remove(&mut self, raw: usize) -> Result<()>;
}

/// Cumulative run-length index over a sequence of repeated entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RepeatMap {
    /// Inclusive last logical position of each raw entry, strictly increasing
    ends: Vec<usize>,
}

impl RepeatMap {
    pub(crate) fn new() -> Self {
        RepeatMap { ends: Vec::new() }
    }

    /// Build from per-entry repeat counts, in raw order.
    pub(crate) fn from_repeats<I: IntoIterator<Item = usize>>(repeats: I) -> Self {
        let mut map = RepeatMap::new();
        for repeat in repeats {
            map.push_entry(repeat);
        }
        map
    }

    /// Number of raw entries.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.ends.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Total number of logical positions covered.
    #[inline]
    pub(crate) fn total_span(&self) -> usize {
        self.ends.last().map_or(0, |&end| end + 1)
    }

    /// Raw index covering a logical position, `None` past the end.
    #[inline]
    pub(crate) fn find_raw(&self, pos: usize) -> Option<usize> {
        let raw = self.ends.partition_point(|&end| end < pos);
        (raw < self.ends.len()).then_some(raw)
    }

    /// First logical position of raw entry `raw`.
    #[inline]
    pub(crate) fn start_of(&self, raw: usize) -> usize {
        if raw == 0 { 0 } else { self.ends[raw - 1] + 1 }
    }

    /// Repeat count of raw entry `raw`.
    #[inline]
    pub(crate) fn repeat_of(&self, raw: usize) -> usize {
        self.ends[raw] + 1 - self.start_of(raw)
    }

    /// Per-entry repeat counts, in raw order.
    pub(crate) fn repeats(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).map(|raw| self.repeat_of(raw))
    }

    // ------------------------------------------------------------------
    // Entry-level edits (map side only)
    // ------------------------------------------------------------------

    /// Append an entry at the end. O(1); the append path never splits.
    pub(crate) fn push_entry(&mut self, repeat: usize) {
        debug_assert!(repeat >= 1);
        self.ends.push(self.total_span() + repeat - 1);
    }

    /// Splice a new entry in at `raw`, shifting later positions up.
    pub(crate) fn insert_entry(&mut self, raw: usize, repeat: usize) {
        debug_assert!(repeat >= 1);
        let start = self.start_of(raw);
        self.ends.insert(raw, start + repeat - 1);
        for end in &mut self.ends[raw + 1..] {
            *end += repeat;
        }
    }

    /// Drop entry `raw`, shifting later positions down by its span.
    pub(crate) fn erase_entry(&mut self, raw: usize) {
        let span = self.repeat_of(raw);
        self.ends.remove(raw);
        for end in &mut self.ends[raw..] {
            *end -= span;
        }
    }

    /// Change the repeat count of entry `raw`, shifting later positions
    /// by the difference.
    pub(crate) fn set_repeat_entry(&mut self, raw: usize, repeat: usize) {
        debug_assert!(repeat >= 1);
        let old = self.repeat_of(raw);
        if repeat >= old {
            let delta = repeat - old;
            for end in &mut self.ends[raw..] {
                *end += delta;
            }
        } else {
            let delta = old - repeat;
            for end in &mut self.ends[raw..] {
                *end -= delta;
            }
        }
    }

    // ------------------------------------------------------------------
    // Position-level edits (map and store together)
    // ------------------------------------------------------------------

    /// Ensure a run boundary falls exactly at logical position `pos`,
    /// splitting the covering entry when `pos` lands mid-run.
    ///
    /// Returns the raw index of the entry that now starts at `pos`, or
    /// `len()` when `pos` is at or past the end of the map.
    pub(crate) fn split_before<S: RunStore>(&mut self, store: &mut S, pos: usize) -> Result<usize> {
        let Some(raw) = self.find_raw(pos) else {
            return Ok(self.len());
        };
        let start = self.start_of(raw);
        if start == pos {
            return Ok(raw);
        }
        let keep = pos - start;
        let rest = self.repeat_of(raw) - keep;
        let end = self.ends[raw];
        self.ends[raw] = pos - 1;
        self.ends.insert(raw + 1, end);
        store.split_run(raw, keep, rest)?;
        Ok(raw + 1)
    }

    /// Carve out logical positions `[pos, pos + repeat)` for one new entry.
    ///
    /// Splits at both edges, consumes every raw entry the new span covers
    /// (a wide write may swallow several, including a partial tail of the
    /// map), and splices a map entry of `repeat` at the cut. Returns the
    /// raw index where the caller must insert the new payload into its
    /// store. Positions outside the span keep their payloads, and the total
    /// span only changes when the write extends past the old end.
    pub(crate) fn replace_span<S: RunStore>(
        &mut self,
        store: &mut S,
        pos: usize,
        repeat: usize,
    ) -> Result<usize> {
        debug_assert!(repeat >= 1);
        debug_assert!(pos <= self.total_span());
        let raw_start = self.split_before(store, pos)?;
        let raw_end = self.split_before(store, pos + repeat)?;
        for raw in (raw_start..raw_end).rev() {
            self.erase_entry(raw);
            store.remove(raw)?;
        }
        self.insert_entry(raw_start, repeat);
        Ok(raw_start)
    }

    /// Open a gap of `repeat` logical positions at `pos`, shifting later
    /// content right. Returns the raw index for the caller's new payload.
    pub(crate) fn insert_at<S: RunStore>(
        &mut self,
        store: &mut S,
        pos: usize,
        repeat: usize,
    ) -> Result<usize> {
        debug_assert!(repeat >= 1);
        let raw = self.split_before(store, pos)?;
        self.insert_entry(raw, repeat);
        Ok(raw)
    }

    /// Remove one logical position. Runs shrink by one; a run of one is
    /// dropped outright. Returns `false` past the end of the map.
    pub(crate) fn delete_at<S: RunStore>(&mut self, store: &mut S, pos: usize) -> Result<bool> {
        let Some(raw) = self.find_raw(pos) else {
            return Ok(false);
        };
        let repeat = self.repeat_of(raw);
        if repeat > 1 {
            self.set_repeat_entry(raw, repeat - 1);
            store.set_repeat(raw, repeat - 1)?;
        } else {
            self.erase_entry(raw);
            store.remove(raw)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal store: a payload character and a repeat count per entry.
    #[derive(Debug, Clone, PartialEq)]
    struct Runs(Vec<(char, usize)>);

    impl Runs {
        fn of(entries: &[(char, usize)]) -> (RepeatMap, Runs) {
            let map = RepeatMap::from_repeats(entries.iter().map(|&(_, r)| r));
            (map, Runs(entries.to_vec()))
        }

        /// Expand to one payload per logical position.
        fn expand(&self) -> Vec<char> {
            let mut out = Vec::new();
            for &(payload, repeat) in &self.0 {
                out.extend(std::iter::repeat_n(payload, repeat));
            }
            out
        }

        fn insert(&mut self, raw: usize, payload: char, repeat: usize) {
            self.0.insert(raw, (payload, repeat));
        }
    }

    impl RunStore for Runs {
        fn split_run(&mut self, raw: usize, keep: usize, rest: usize) -> Result<()> {
            let payload = self.0[raw].0;
            self.0[raw].1 = keep;
            self.0.insert(raw + 1, (payload, rest));
            Ok(())
        }

        fn set_repeat(&mut self, raw: usize, repeat: usize) -> Result<()> {
            self.0[raw].1 = repeat;
            Ok(())
        }

        fn remove(&mut self, raw: usize) -> Result<()> {
            self.0.remove(raw);
            Ok(())
        }
    }

    /// Map and store must agree entry by entry after every operation.
    fn assert_consistent(map: &RepeatMap, runs: &Runs) {
        assert_eq!(map.len(), runs.0.len());
        let mut expected_end = 0usize;
        for raw in 0..map.len() {
            assert_eq!(map.repeat_of(raw), runs.0[raw].1, "entry {raw}");
            expected_end += runs.0[raw].1;
            assert_eq!(map.ends[raw], expected_end - 1, "end {raw}");
        }
        assert_eq!(map.total_span(), expected_end);
    }

    #[test]
    fn test_find_raw_exhaustive() {
        let map = RepeatMap::from_repeats([2, 1, 2]);
        assert_eq!(map.ends, vec![1, 2, 4]);
        assert_eq!(map.total_span(), 5);
        let expected = [0, 0, 1, 2, 2];
        for (pos, &raw) in expected.iter().enumerate() {
            assert_eq!(map.find_raw(pos), Some(raw), "position {pos}");
        }
        assert_eq!(map.find_raw(5), None);
        assert_eq!(map.find_raw(100), None);
    }

    #[test]
    fn test_empty_map() {
        let map = RepeatMap::new();
        assert_eq!(map.total_span(), 0);
        assert_eq!(map.find_raw(0), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_entry_accessors() {
        let map = RepeatMap::from_repeats([3, 1, 4]);
        assert_eq!(map.start_of(0), 0);
        assert_eq!(map.start_of(1), 3);
        assert_eq!(map.start_of(2), 4);
        assert_eq!(map.repeat_of(0), 3);
        assert_eq!(map.repeat_of(1), 1);
        assert_eq!(map.repeat_of(2), 4);
        assert_eq!(map.repeats().collect::<Vec<_>>(), vec![3, 1, 4]);
    }

    #[test]
    fn test_push_entry_extends_the_end() {
        let mut map = RepeatMap::new();
        map.push_entry(3);
        map.push_entry(1);
        assert_eq!(map.ends, vec![2, 3]);
        assert_eq!(map.total_span(), 4);
    }

    #[test]
    fn test_write_mid_run_splits_into_three() {
        let (mut map, mut runs) = Runs::of(&[('x', 5)]);
        let raw = map.replace_span(&mut runs, 2, 1).unwrap();
        runs.insert(raw, 'y', 1);

        assert_eq!(runs.0, vec![('x', 2), ('y', 1), ('x', 2)]);
        assert_consistent(&map, &runs);
        assert_eq!(runs.expand(), vec!['x', 'x', 'y', 'x', 'x']);
        assert_eq!(map.total_span(), 5);
    }

    #[test]
    fn test_write_at_run_boundaries_splits_into_two() {
        let (mut map, mut runs) = Runs::of(&[('x', 5)]);
        let raw = map.replace_span(&mut runs, 0, 1).unwrap();
        runs.insert(raw, 'y', 1);
        assert_eq!(runs.0, vec![('y', 1), ('x', 4)]);
        assert_consistent(&map, &runs);

        let (mut map, mut runs) = Runs::of(&[('x', 5)]);
        let raw = map.replace_span(&mut runs, 4, 1).unwrap();
        runs.insert(raw, 'y', 1);
        assert_eq!(runs.0, vec![('x', 4), ('y', 1)]);
        assert_consistent(&map, &runs);
    }

    #[test]
    fn test_write_at_end_appends() {
        let (mut map, mut runs) = Runs::of(&[('x', 2)]);
        let raw = map.replace_span(&mut runs, 2, 3).unwrap();
        runs.insert(raw, 'y', 3);
        assert_eq!(runs.0, vec![('x', 2), ('y', 3)]);
        assert_consistent(&map, &runs);
        assert_eq!(map.total_span(), 5);
    }

    #[test]
    fn test_wide_write_consumes_covered_entries() {
        let (mut map, mut runs) = Runs::of(&[('a', 2), ('b', 2), ('c', 2)]);
        let raw = map.replace_span(&mut runs, 1, 4).unwrap();
        runs.insert(raw, 'n', 4);

        assert_eq!(runs.0, vec![('a', 1), ('n', 4), ('c', 1)]);
        assert_consistent(&map, &runs);
        assert_eq!(runs.expand(), vec!['a', 'n', 'n', 'n', 'n', 'c']);
        assert_eq!(map.total_span(), 6);
    }

    #[test]
    fn test_wide_write_overruns_the_map() {
        let (mut map, mut runs) = Runs::of(&[('a', 2), ('b', 2)]);
        let raw = map.replace_span(&mut runs, 3, 4).unwrap();
        runs.insert(raw, 'n', 4);

        assert_eq!(runs.0, vec![('a', 2), ('b', 1), ('n', 4)]);
        assert_consistent(&map, &runs);
        assert_eq!(map.total_span(), 7);
    }

    #[test]
    fn test_insert_at_shifts_content_right() {
        let (mut map, mut runs) = Runs::of(&[('x', 3)]);
        let raw = map.insert_at(&mut runs, 1, 1).unwrap();
        runs.insert(raw, 'y', 1);

        assert_eq!(runs.0, vec![('x', 1), ('y', 1), ('x', 2)]);
        assert_consistent(&map, &runs);
        assert_eq!(runs.expand(), vec!['x', 'y', 'x', 'x']);
        assert_eq!(map.total_span(), 4);
    }

    #[test]
    fn test_delete_at_shrinks_or_drops() {
        let (mut map, mut runs) = Runs::of(&[('x', 2), ('y', 1)]);
        assert!(map.delete_at(&mut runs, 0).unwrap());
        assert_eq!(runs.0, vec![('x', 1), ('y', 1)]);
        assert_consistent(&map, &runs);

        assert!(map.delete_at(&mut runs, 1).unwrap());
        assert_eq!(runs.0, vec![('x', 1)]);
        assert_consistent(&map, &runs);

        assert!(!map.delete_at(&mut runs, 5).unwrap());
    }

    #[test]
    fn test_split_before_is_idempotent_at_boundaries() {
        let (mut map, mut runs) = Runs::of(&[('a', 3), ('b', 2)]);
        assert_eq!(map.split_before(&mut runs, 0).unwrap(), 0);
        assert_eq!(map.split_before(&mut runs, 3).unwrap(), 1);
        assert_eq!(map.split_before(&mut runs, 5).unwrap(), 2);
        // Boundary splits change nothing
        assert_eq!(runs.0, vec![('a', 3), ('b', 2)]);
        assert_consistent(&map, &runs);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn repeats_strategy() -> impl Strategy<Value = Vec<usize>> {
            prop::collection::vec(1usize..=8, 0..12)
        }

        fn runs_strategy() -> impl Strategy<Value = Vec<(char, usize)>> {
            prop::collection::vec(
                (prop::char::range('a', 'z'), 1usize..=8),
                1..12,
            )
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            /// Every logical position resolves to a raw entry, and the
            /// entries' spans reconstruct the original repeat sequence.
            #[test]
            fn prop_round_trip(repeats in repeats_strategy()) {
                let map = RepeatMap::from_repeats(repeats.iter().copied());
                let total: usize = repeats.iter().sum();
                prop_assert_eq!(map.total_span(), total);
                prop_assert_eq!(map.repeats().collect::<Vec<_>>(), repeats.clone());

                let mut pos = 0usize;
                for (raw, &repeat) in repeats.iter().enumerate() {
                    for _ in 0..repeat {
                        prop_assert_eq!(map.find_raw(pos), Some(raw));
                        pos += 1;
                    }
                }
                prop_assert_eq!(map.find_raw(total), None);
            }

            /// Writing one position into a run leaves every other position
            /// with its original payload, keeps the total span, and adds at
            /// most two raw entries.
            #[test]
            fn prop_single_write_preserves_neighbors(
                entries in runs_strategy(),
                pick in 0.0f64..1.0,
            ) {
                let (mut map, mut runs) = Runs::of(&entries);
                let before = runs.expand();
                let pos = ((before.len() - 1) as f64 * pick) as usize;
                let raw_before = map.len();

                let raw = map.replace_span(&mut runs, pos, 1).unwrap();
                runs.insert(raw, 'Z', 1);

                prop_assert_eq!(map.total_span(), before.len());
                prop_assert!(map.len() <= raw_before + 2);
                assert_consistent(&map, &runs);

                let after = runs.expand();
                for (p, (&was, &now)) in before.iter().zip(after.iter()).enumerate() {
                    if p == pos {
                        prop_assert_eq!(now, 'Z');
                    } else {
                        prop_assert_eq!(now, was);
                    }
                }
            }

            /// Gap inserts grow the span by the inserted repeat and shift
            /// everything after the position right.
            #[test]
            fn prop_insert_shifts_right(
                entries in runs_strategy(),
                pick in 0.0f64..1.0,
                repeat in 1usize..4,
            ) {
                let (mut map, mut runs) = Runs::of(&entries);
                let before = runs.expand();
                let pos = ((before.len()) as f64 * pick) as usize;

                let raw = map.insert_at(&mut runs, pos, repeat).unwrap();
                runs.insert(raw, 'Z', repeat);
                assert_consistent(&map, &runs);

                let after = runs.expand();
                prop_assert_eq!(after.len(), before.len() + repeat);
                prop_assert_eq!(&after[..pos], &before[..pos]);
                for p in pos..pos + repeat {
                    prop_assert_eq!(after[p], 'Z');
                }
                prop_assert_eq!(&after[pos + repeat..], &before[pos..]);
            }
        }
    }
}
