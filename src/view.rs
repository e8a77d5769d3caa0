use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use ulid::Ulid;

use crate::config::LayoutConfig;
use crate::engine::{
    ColumnLayout, ConflictSpan, IntervalStore, LayoutError, LayoutHost, Maintenance, RemoveOutcome,
    SpanId,
};
use crate::limits::*;
use crate::model::*;
use crate::observability;
use crate::registry::IntervalRegistry;

/// Side tables a span reads and writes while it works. Kept apart from the
/// span map so a span taken out of `DayView::spans` can borrow it mutably.
struct ViewState {
    /// Published for other readers. Spans never read it back.
    registry: Arc<IntervalRegistry>,
    /// Every busy time currently laid out, conflicting or not. The record
    /// spans resolve ids against.
    timeline: IntervalStore,
    /// id → owning span.
    conflicts: HashMap<Ulid, SpanId>,
    /// id → current visual state. Absent means "no conflict".
    layouts: HashMap<Ulid, ColumnLayout>,
}

impl LayoutHost for ViewState {
    fn resolve(&self, id: &Ulid) -> Option<BusyTime> {
        self.timeline.get(id).copied()
    }

    fn assign_span(&mut self, id: Ulid, span: SpanId) {
        self.conflicts.insert(id, span);
    }

    fn release_span(&mut self, id: &Ulid) {
        self.conflicts.remove(id);
    }

    fn apply_layout(&mut self, id: Ulid, layout: ColumnLayout) {
        self.layouts.insert(id, layout);
    }

    fn clear_layout(&mut self, id: &Ulid) {
        self.layouts.remove(id);
    }
}

/// Reflow driver for one calendar view. Decides which conflict span a busy
/// time joins, owns the live spans, and keeps every side table in sync.
pub struct DayView {
    config: LayoutConfig,
    state: ViewState,
    spans: HashMap<SpanId, ConflictSpan>,
}

impl DayView {
    pub fn new(registry: Arc<IntervalRegistry>, config: LayoutConfig) -> Self {
        Self {
            config,
            state: ViewState {
                registry,
                timeline: IntervalStore::new(),
                conflicts: HashMap::new(),
                layouts: HashMap::new(),
            },
            spans: HashMap::new(),
        }
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self::new(Arc::new(IntervalRegistry::new()), config)
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<IntervalRegistry> {
        &self.state.registry
    }

    pub fn len(&self) -> usize {
        self.state.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.timeline.is_empty()
    }

    pub fn get(&self, id: &Ulid) -> Option<&BusyTime> {
        self.state.timeline.get(id)
    }

    /// Current visual state of a busy time. `None` means it conflicts with
    /// nothing and takes the full width.
    pub fn layout_of(&self, id: &Ulid) -> Option<ColumnLayout> {
        self.state.layouts.get(id).copied()
    }

    pub fn span_of(&self, id: &Ulid) -> Option<SpanId> {
        self.state.conflicts.get(id).copied()
    }

    pub fn span(&self, id: SpanId) -> Option<&ConflictSpan> {
        self.spans.get(&id)
    }

    pub fn spans(&self) -> impl Iterator<Item = &ConflictSpan> {
        self.spans.values()
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Lay out a busy time. An id that is already present is treated as an
    /// edit: the old placement is removed first.
    pub fn add_busytime(&mut self, item: BusyTime) -> Result<(), LayoutError> {
        validate_span(&item.span)?;
        let started = Instant::now();

        if self.state.timeline.contains(&item.id) {
            self.detach_busytime(&item.id);
        }
        self.state.registry.insert(item);
        let overlapping = self.state.timeline.query(&item.span);
        self.state.timeline.add(item);
        if !overlapping.is_empty() {
            self.place(item, &overlapping);
        }

        metrics::histogram!(observability::LAYOUT_DURATION_SECONDS, "op" => "add")
            .record(started.elapsed().as_secs_f64());
        Ok(())
    }

    /// Add busy times one at a time, stopping at the first invalid one.
    pub fn extend<I>(&mut self, items: I) -> Result<(), LayoutError>
    where
        I: IntoIterator<Item = BusyTime>,
    {
        for item in items {
            self.add_busytime(item)?;
        }
        Ok(())
    }

    pub fn remove_busytime(&mut self, id: &Ulid) -> Result<BusyTime, LayoutError> {
        let started = Instant::now();
        let item = self
            .detach_busytime(id)
            .ok_or(LayoutError::NotFound(*id))?;
        self.state.registry.remove(id);

        metrics::histogram!(observability::LAYOUT_DURATION_SECONDS, "op" => "remove")
            .record(started.elapsed().as_secs_f64());
        Ok(item)
    }

    /// Remove many busy times, running span maintenance once per touched
    /// span instead of once per removal. Unknown ids are skipped.
    pub fn remove_many<'a, I>(&mut self, ids: I) -> Vec<BusyTime>
    where
        I: IntoIterator<Item = &'a Ulid>,
    {
        let started = Instant::now();
        let mut touched = BTreeSet::new();
        let mut removed = Vec::new();

        for id in ids {
            let Some(item) = self.state.timeline.remove(id) else {
                continue;
            };
            self.state.registry.remove(id);
            if let Some(span_id) = self.state.conflicts.get(id).copied()
                && let Some(span) = self.spans.get_mut(&span_id)
            {
                span.remove(&mut self.state, id, Maintenance::Defer);
                touched.insert(span_id);
            }
            self.state.layouts.remove(id);
            removed.push(item);
        }

        for span_id in touched {
            if let Some(mut span) = self.spans.remove(&span_id) {
                let outcome = span.maintain(&mut self.state);
                self.adopt(span, outcome);
            }
        }

        metrics::histogram!(observability::LAYOUT_DURATION_SECONDS, "op" => "remove_many")
            .record(started.elapsed().as_secs_f64());
        removed
    }

    /// Put `item` into the span of whatever it overlaps. Several spans are
    /// merged into the oldest one; loose overlappers join too.
    fn place(&mut self, item: BusyTime, overlapping: &[BusyTime]) {
        let mut owners: Vec<SpanId> = Vec::new();
        let mut loose: Vec<BusyTime> = Vec::new();
        for other in overlapping {
            match self.state.conflicts.get(&other.id) {
                Some(span_id) => owners.push(*span_id),
                None => loose.push(*other),
            }
        }
        owners.sort();
        owners.dedup();

        let mut span = owners
            .first()
            .and_then(|id| self.spans.remove(id))
            .unwrap_or_else(|| ConflictSpan::new(self.config));
        for other_id in owners.iter().skip(1) {
            if let Some(other) = self.spans.remove(other_id) {
                span.absorb(&mut self.state, other);
            }
        }
        for other in loose {
            span.add(&mut self.state, other);
        }
        span.add(&mut self.state, item);

        debug!(span_id = %span.id(), members = span.len(), columns = span.columns().len(), "busy time placed");
        self.spans.insert(span.id(), span);
    }

    /// Take a busy time off the timeline and out of its span, with full
    /// maintenance. Leaves the registry alone.
    fn detach_busytime(&mut self, id: &Ulid) -> Option<BusyTime> {
        let item = self.state.timeline.remove(id)?;
        if let Some(span_id) = self.state.conflicts.get(id).copied()
            && let Some(mut span) = self.spans.remove(&span_id)
        {
            let outcome = span.remove(&mut self.state, id, Maintenance::Run);
            self.adopt(span, outcome);
        }
        self.state.layouts.remove(id);
        Some(item)
    }

    fn adopt(&mut self, span: ConflictSpan, outcome: RemoveOutcome) {
        for spawned in outcome.spawned {
            self.spans.insert(spawned.id(), spawned);
        }
        if !outcome.dissolved && !span.is_empty() {
            self.spans.insert(span.id(), span);
        }
    }
}

pub(crate) fn validate_span(span: &Span) -> Result<(), LayoutError> {
    if span.end < span.start {
        return Err(LayoutError::InvalidSpan {
            start: span.start,
            end: span.end,
        });
    }
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(LayoutError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_BUSYTIME_DURATION_MS {
        return Err(LayoutError::LimitExceeded("busy time too long"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: Ms = MINUTE_MS;

    #[test]
    fn validate_rejects_inverted_span() {
        let err = validate_span(&Span { start: 10, end: 5 }).unwrap_err();
        assert_eq!(err, LayoutError::InvalidSpan { start: 10, end: 5 });
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert_eq!(
            validate_span(&Span { start: -1, end: 5 }),
            Err(LayoutError::LimitExceeded("timestamp out of range"))
        );
        assert_eq!(
            validate_span(&Span::new(0, MAX_BUSYTIME_DURATION_MS + 1)),
            Err(LayoutError::LimitExceeded("busy time too long"))
        );
        assert!(validate_span(&Span::new(0, MAX_BUSYTIME_DURATION_MS)).is_ok());
        assert!(validate_span(&Span::new(5, 5)).is_ok());
    }

    #[test]
    fn add_invalid_leaves_view_untouched() {
        let mut view = DayView::with_config(LayoutConfig::default());
        let bad = BusyTime {
            id: Ulid::new(),
            span: Span { start: 10 * M, end: 0 },
        };
        assert!(view.add_busytime(bad).is_err());
        assert!(view.is_empty());
        assert!(view.registry().is_empty());
    }

    #[test]
    fn side_tables_follow_membership() {
        let mut view = DayView::with_config(LayoutConfig::default());
        let a = BusyTime::new(Ulid::new(), 0, 10 * M);
        let b = BusyTime::new(Ulid::new(), 5 * M, 15 * M);
        view.add_busytime(a).unwrap();
        assert!(view.state.conflicts.is_empty());
        view.add_busytime(b).unwrap();
        assert_eq!(view.state.conflicts.len(), 2);
        assert_eq!(view.state.layouts.len(), 2);

        view.remove_busytime(&a.id).unwrap();
        assert!(view.state.conflicts.is_empty());
        assert!(view.state.layouts.is_empty());
        assert!(view.spans.is_empty());
    }

    #[test]
    fn absorb_ignores_outside_registry_writes() {
        let registry = Arc::new(IntervalRegistry::new());
        let mut view = DayView::new(Arc::clone(&registry), LayoutConfig::default());
        let a = BusyTime::new(Ulid::new(), 0, 10 * M);
        let b = BusyTime::new(Ulid::new(), 5 * M, 15 * M);
        let c = BusyTime::new(Ulid::new(), 30 * M, 40 * M);
        let d = BusyTime::new(Ulid::new(), 35 * M, 45 * M);
        view.extend([a, b, c, d]).unwrap();
        assert_eq!(view.span_count(), 2);

        // Another writer moves `c` without going through the view.
        registry.insert(BusyTime::new(c.id, 100 * M, 110 * M));

        let bridge = BusyTime::new(Ulid::new(), 8 * M, 32 * M);
        view.add_busytime(bridge).unwrap();
        assert_eq!(view.span_count(), 1);

        let span_id = view.span_of(&c.id).unwrap();
        let stored = view.span(span_id).unwrap().members().find(|m| m.id == c.id).copied();
        assert_eq!(stored, Some(c));
        assert_eq!(view.get(&c.id), Some(&c));
    }
}
