mod conflict;
mod error;
mod layout;
mod split;
mod store;

pub use conflict::ConflictSpan;
pub use error::LayoutError;
pub use layout::ColumnLayout;
pub use store::IntervalStore;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::BusyTime;

static NEXT_SPAN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, increasing span identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpanId(u64);

impl SpanId {
    pub(crate) fn next() -> Self {
        SpanId(NEXT_SPAN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "span#{}", self.0)
    }
}

/// The owning view, as seen by a span. Passed into every span operation
/// instead of being stored, so spans never alias the view.
pub trait LayoutHost {
    /// Current record for an id as the view knows it. Only absorb uses it.
    fn resolve(&self, id: &Ulid) -> Option<BusyTime>;

    /// Record that `id` is now owned by `span`.
    fn assign_span(&mut self, id: Ulid, span: SpanId);

    /// Forget the owning span of `id`.
    fn release_span(&mut self, id: &Ulid);

    /// Set width/offset/flags on the visual target of `id`.
    fn apply_layout(&mut self, id: Ulid, layout: ColumnLayout);

    /// Reset the visual target of `id` to "no conflict".
    fn clear_layout(&mut self, id: &Ulid);
}

/// Whether `ConflictSpan::remove` runs split/dissolve/relayout right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maintenance {
    Run,
    /// Batch in flight; the caller runs `ConflictSpan::maintain` once at the end.
    Defer,
}

/// What a removal (or a deferred maintenance pass) did to a span.
#[derive(Debug, Default)]
pub struct RemoveOutcome {
    /// The id was a member and has been detached.
    pub removed: bool,
    /// Spans split off this one. The caller owns them now.
    pub spawned: Vec<ConflictSpan>,
    /// The span fell below two members and emptied itself; drop it.
    pub dissolved: bool,
}
