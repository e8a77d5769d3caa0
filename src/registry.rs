use dashmap::DashMap;
use ulid::Ulid;

use crate::model::BusyTime;

/// Global id → live record registry. Shared behind an `Arc` so a loader or
/// sync layer can feed records while the view lays them out.
pub struct IntervalRegistry {
    by_id: DashMap<Ulid, BusyTime>,
}

impl Default for IntervalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalRegistry {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &Ulid) -> Option<BusyTime> {
        self.by_id.get(id).map(|e| *e.value())
    }

    /// Insert or replace. Returns the previous record.
    pub fn insert(&self, item: BusyTime) -> Option<BusyTime> {
        self.by_id.insert(item.id, item)
    }

    pub fn remove(&self, id: &Ulid) -> Option<BusyTime> {
        self.by_id.remove(id).map(|(_, item)| item)
    }

    pub fn ids(&self) -> Vec<Ulid> {
        self.by_id.iter().map(|e| *e.key()).collect()
    }
}
