use std::collections::HashMap;

use tracing::{debug, warn};
use ulid::Ulid;

use crate::config::LayoutConfig;
use crate::model::*;
use crate::observability;

use super::{ColumnLayout, IntervalStore, LayoutHost, Maintenance, RemoveOutcome, SpanId};

/// One cluster of transitively overlapping busy times, packed into columns.
///
/// Invariants between public calls:
/// - every member is in `all` and in exactly one column;
/// - no two members of one column overlap;
/// - `bounds` covers every member, `None` only when empty.
///
/// A span holds no reference to its view; every operation that publishes
/// layout or touches the side tables takes the view as a `LayoutHost`.
#[derive(Debug)]
pub struct ConflictSpan {
    id: SpanId,
    pub(super) config: LayoutConfig,
    bounds: Option<Span>,
    pub(super) all: IntervalStore,
    columns: Vec<IntervalStore>,
    columns_by_id: HashMap<Ulid, usize>,
}

impl ConflictSpan {
    /// Empty span with a single empty column.
    pub fn new(config: LayoutConfig) -> Self {
        let id = SpanId::next();
        metrics::counter!(observability::SPANS_CREATED_TOTAL).increment(1);
        debug!(span_id = %id, "conflict span created");
        Self {
            id,
            config,
            bounds: None,
            all: IntervalStore::new(),
            columns: vec![IntervalStore::new()],
            columns_by_id: HashMap::new(),
        }
    }

    pub fn id(&self) -> SpanId {
        self.id
    }

    pub fn start_time(&self) -> Option<Ms> {
        self.bounds.map(|b| b.start)
    }

    pub fn end_time(&self) -> Option<Ms> {
        self.bounds.map(|b| b.end)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn contains(&self, id: &Ulid) -> bool {
        self.columns_by_id.contains_key(id)
    }

    /// Member ids ordered by start time.
    pub fn member_ids(&self) -> Vec<Ulid> {
        self.all.ids().collect()
    }

    pub fn members(&self) -> impl Iterator<Item = &BusyTime> {
        self.all.entries()
    }

    pub fn columns(&self) -> &[IntervalStore] {
        &self.columns
    }

    pub fn column_of(&self, id: &Ulid) -> Option<usize> {
        self.columns_by_id.get(id).copied()
    }

    /// Add a member and relayout the whole span.
    ///
    /// Re-adding a member with a new range moves it: it leaves its old
    /// column before first-fit picks a new one.
    pub fn add<H: LayoutHost>(&mut self, host: &mut H, item: BusyTime) {
        host.assign_span(item.id, self.id);
        let replaced = self.all.contains(&item.id);
        self.all.add(item);
        if let Some(old) = self.columns_by_id.remove(&item.id) {
            self.columns[old].remove(&item.id);
        }

        let column = self.find_column(&item.span);
        self.columns[column].add(item);
        self.columns_by_id.insert(item.id, column);

        self.bounds = match self.bounds {
            Some(bounds) if !replaced => Some(bounds.union(&item.span)),
            _ => self.all.bounds(),
        };
        self.update_layout(host);
    }

    /// Remove a member by id. No-op (`removed == false`) if it isn't one.
    ///
    /// With `Maintenance::Run` the span may split, dissolve, or drop empty
    /// columns before returning. With `Maintenance::Defer` only the member
    /// is detached; call [`ConflictSpan::maintain`] once the batch is done.
    pub fn remove<H: LayoutHost>(
        &mut self,
        host: &mut H,
        id: &Ulid,
        maintenance: Maintenance,
    ) -> RemoveOutcome {
        if self.detach(host, id).is_none() {
            return RemoveOutcome::default();
        }
        let mut outcome = match maintenance {
            Maintenance::Run => self.maintain(host),
            Maintenance::Defer => RemoveOutcome::default(),
        };
        outcome.removed = true;
        outcome
    }

    /// Split at gaps, then dissolve if fewer than two members remain,
    /// otherwise refresh bounds, drop empty columns and relayout.
    pub fn maintain<H: LayoutHost>(&mut self, host: &mut H) -> RemoveOutcome {
        let spawned = match self.split_if_necessary(host) {
            Some(spawned) => spawned,
            None => {
                if !self.self_destruct_if_necessary(host) && !self.is_empty() {
                    self.refresh(host);
                }
                Vec::new()
            }
        };
        RemoveOutcome {
            removed: false,
            spawned,
            dissolved: self.is_empty(),
        }
    }

    /// Take over every member of `other`, resolving each id through the
    /// host's registry so the live record is used. `other` is consumed.
    pub fn absorb<H: LayoutHost>(&mut self, host: &mut H, other: ConflictSpan) {
        debug!(span_id = %self.id, absorbed = %other.id, members = other.len(), "absorbing conflict span");
        metrics::counter!(observability::SPANS_ABSORBED_TOTAL).increment(1);
        for id in other.member_ids() {
            match host.resolve(&id) {
                Some(item) => self.add(host, item),
                None => warn!(span_id = %self.id, %id, "absorb: busy time missing from registry"),
            }
        }
    }

    /// Dissolve when exactly one member is left: detach it and clear its
    /// layout. Returns whether the span was destroyed.
    pub(super) fn self_destruct_if_necessary<H: LayoutHost>(&mut self, host: &mut H) -> bool {
        if self.all.len() != 1 {
            return false;
        }
        let Some(last) = self.all.ids().next() else {
            return false;
        };
        self.detach(host, &last);
        host.clear_layout(&last);
        self.bounds = None;
        metrics::counter!(observability::SPANS_DISSOLVED_TOTAL).increment(1);
        debug!(span_id = %self.id, survivor = %last, "conflict span dissolved");
        true
    }

    /// Drop `id` from `all`, its column and the host's span table.
    /// Returns `None` when `id` had no column.
    pub(super) fn detach<H: LayoutHost>(&mut self, host: &mut H, id: &Ulid) -> Option<BusyTime> {
        let item = self.all.remove(id);
        let column = self.columns_by_id.remove(id)?;
        let in_column = self.columns[column].remove(id);
        host.release_span(id);
        item.or(in_column)
    }

    pub(super) fn refresh<H: LayoutHost>(&mut self, host: &mut H) {
        self.bounds = self.all.bounds();
        self.drop_empty_columns();
        self.update_layout(host);
    }

    /// First column with no member overlapping `range`; a new one if none.
    fn find_column(&mut self, range: &Span) -> usize {
        if let Some(index) = self.columns.iter().position(|c| !c.has_overlap(range)) {
            return index;
        }
        self.columns.push(IntervalStore::new());
        self.columns.len() - 1
    }

    fn drop_empty_columns(&mut self) {
        let before = self.columns.len();
        self.columns.retain(|c| !c.is_empty());
        if self.columns.len() == before {
            return;
        }
        self.columns_by_id.clear();
        for (index, column) in self.columns.iter().enumerate() {
            for id in column.ids() {
                self.columns_by_id.insert(id, index);
            }
        }
    }

    fn update_layout<H: LayoutHost>(&self, host: &mut H) {
        let count = self.columns.len();
        metrics::histogram!(observability::SPAN_COLUMNS).record(count as f64);
        for (index, column) in self.columns.iter().enumerate() {
            let layout = ColumnLayout::for_column(index, count, &self.config);
            for item in column.entries() {
                host.apply_layout(item.id, layout);
            }
        }
    }
}
