use ulid::Ulid;

use crate::model::*;

/// Keyed collection of busy times with half-open overlap queries.
///
/// Entries are kept sorted by `span.start` so a query can stop at the first
/// entry starting at or after the range end. Identity is unique: adding an
/// id that is already present replaces the old entry.
#[derive(Debug, Clone, Default)]
pub struct IntervalStore {
    entries: Vec<BusyTime>,
}

impl IntervalStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &Ulid) -> Option<&BusyTime> {
        self.position(id).map(|pos| &self.entries[pos])
    }

    /// Iterate every entry, ordered by start.
    pub fn entries(&self) -> impl Iterator<Item = &BusyTime> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = Ulid> + '_ {
        self.entries.iter().map(|bt| bt.id)
    }

    /// Insert, overwriting any entry with the same id.
    pub fn add(&mut self, item: BusyTime) {
        self.remove(&item.id);
        let pos = self
            .entries
            .partition_point(|bt| bt.span.start <= item.span.start);
        self.entries.insert(pos, item);
    }

    /// Remove by id. No-op if absent.
    pub fn remove(&mut self, id: &Ulid) -> Option<BusyTime> {
        self.position(id).map(|pos| self.entries.remove(pos))
    }

    /// Every entry `[s, e)` with `s < range.end && e > range.start`.
    pub fn query(&self, range: &Span) -> Vec<BusyTime> {
        self.overlapping(*range).copied().collect()
    }

    pub fn count_overlapping(&self, range: &Span) -> usize {
        self.overlapping(*range).count()
    }

    pub fn has_overlap(&self, range: &Span) -> bool {
        self.overlapping(*range).next().is_some()
    }

    fn overlapping(&self, range: Span) -> impl Iterator<Item = &BusyTime> {
        // Everything at index >= right_bound starts at or after range.end → can't overlap.
        let right_bound = self
            .entries
            .partition_point(|bt| bt.span.start < range.end);
        self.entries[..right_bound]
            .iter()
            .filter(move |bt| bt.span.end > range.start)
    }

    /// Min start and max end over all entries.
    pub fn bounds(&self) -> Option<Span> {
        let first = self.entries.first()?;
        let end = self
            .entries
            .iter()
            .map(|bt| bt.span.end)
            .max()
            .unwrap_or(first.span.end);
        Some(Span::new(first.span.start, end))
    }

    fn position(&self, id: &Ulid) -> Option<usize> {
        self.entries.iter().position(|bt| bt.id == *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bt(start: Ms, end: Ms) -> BusyTime {
        BusyTime::new(Ulid::new(), start, end)
    }

    #[test]
    fn entries_stay_sorted_by_start() {
        let mut store = IntervalStore::new();
        store.add(bt(300, 400));
        store.add(bt(100, 200));
        store.add(bt(200, 300));
        let starts: Vec<Ms> = store.entries().map(|b| b.start()).collect();
        assert_eq!(starts, vec![100, 200, 300]);
    }

    #[test]
    fn add_same_id_overwrites() {
        let mut store = IntervalStore::new();
        let id = Ulid::new();
        store.add(BusyTime::new(id, 100, 200));
        store.add(BusyTime::new(id, 500, 600));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().span, Span::new(500, 600));
        assert!(store.query(&Span::new(100, 200)).is_empty());
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut store = IntervalStore::new();
        store.add(bt(100, 200));
        assert!(store.remove(&Ulid::new()).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_returns_record() {
        let mut store = IntervalStore::new();
        let item = bt(100, 200);
        store.add(item);
        assert_eq!(store.remove(&item.id), Some(item));
        assert!(store.is_empty());
        assert!(!store.contains(&item.id));
    }

    #[test]
    fn query_skips_past_and_future() {
        let mut store = IntervalStore::new();
        store.add(bt(100, 200)); // past
        store.add(bt(450, 600)); // overlapping
        store.add(bt(1000, 1100)); // starts after query end

        let hits = store.query(&Span::new(500, 800));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span, Span::new(450, 600));
    }

    #[test]
    fn query_adjacent_not_included() {
        let mut store = IntervalStore::new();
        store.add(bt(100, 200));
        assert!(store.query(&Span::new(200, 300)).is_empty());
        assert!(store.query(&Span::new(0, 100)).is_empty());
    }

    #[test]
    fn query_single_ms_overlap() {
        let mut store = IntervalStore::new();
        store.add(bt(100, 201));
        assert_eq!(store.count_overlapping(&Span::new(200, 300)), 1);
        assert!(store.has_overlap(&Span::new(200, 300)));
    }

    #[test]
    fn query_large_entry_spanning_range() {
        let mut store = IntervalStore::new();
        store.add(bt(0, 10_000));
        store.add(bt(20, 30));
        assert_eq!(store.query(&Span::new(500, 600)).len(), 1);
    }

    #[test]
    fn query_empty_store() {
        let store = IntervalStore::new();
        assert!(store.query(&Span::new(0, 1000)).is_empty());
        assert!(!store.has_overlap(&Span::new(0, 1000)));
    }

    #[test]
    fn bounds_track_min_start_and_max_end() {
        let mut store = IntervalStore::new();
        assert_eq!(store.bounds(), None);
        store.add(bt(200, 900));
        store.add(bt(100, 300));
        store.add(bt(400, 500));
        assert_eq!(store.bounds(), Some(Span::new(100, 900)));
    }
}
