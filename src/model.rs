use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The only time type.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;

/// Half-open interval `[start, end)`. Zero-length spans are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start <= end, "Span start must not be after end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Half-open overlap test: `self.start < other.end && self.end > other.start`.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }

    /// Smallest span covering both.
    pub fn union(&self, other: &Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// A scheduled time range from one calendar event occurrence.
/// The atomic unit of layout; identity is stable across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusyTime {
    pub id: Ulid,
    pub span: Span,
}

impl BusyTime {
    pub fn new(id: Ulid, start: Ms, end: Ms) -> Self {
        Self {
            id,
            span: Span::new(start, end),
        }
    }

    pub fn start(&self) -> Ms {
        self.span.start
    }

    pub fn end(&self) -> Ms {
        self.span.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
        assert!(s.contains_instant(100));
        assert!(s.contains_instant(199));
        assert!(!s.contains_instant(200)); // half-open
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn zero_length_span_overlaps_nothing_at_its_edges() {
        let point = Span::new(100, 100);
        assert_eq!(point.duration_ms(), 0);
        assert!(!point.overlaps(&Span::new(0, 100)));
        assert!(!point.overlaps(&Span::new(100, 200)));
        // Strictly inside a wider span still counts under the half-open test.
        assert!(point.overlaps(&Span::new(50, 150)));
    }

    #[test]
    fn span_union() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 400);
        assert_eq!(a.union(&b), Span::new(100, 400));
        assert_eq!(b.union(&a), Span::new(100, 400));
    }

    #[test]
    fn busytime_accessors() {
        let id = Ulid::new();
        let bt = BusyTime::new(id, 10 * MINUTE_MS, 20 * MINUTE_MS);
        assert_eq!(bt.id, id);
        assert_eq!(bt.start(), 600_000);
        assert_eq!(bt.end(), 1_200_000);
    }

    #[test]
    fn busytime_serialization_roundtrip() {
        let bt = BusyTime::new(Ulid::new(), 0, 3_600_000);
        let json = serde_json::to_string(&bt).unwrap();
        let decoded: BusyTime = serde_json::from_str(&json).unwrap();
        assert_eq!(bt, decoded);
    }
}
