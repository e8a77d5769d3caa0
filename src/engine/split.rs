use tracing::debug;

use crate::model::*;
use crate::observability;

use super::{ConflictSpan, LayoutHost};

impl ConflictSpan {
    /// Cut the members' extent into fixed windows starting at the earliest
    /// member and return the start of the first touched window that directly
    /// follows an untouched one.
    ///
    /// A member touches a window when it starts inside it or covers part of
    /// it, so a zero-length member counts as a point. Gaps narrower than the
    /// window can be missed. Members are visited in start order and the scan
    /// jumps between them, so the cost does not depend on the extent.
    pub(super) fn find_split_point(&self) -> Option<Ms> {
        let origin = self.all.bounds()?.start;
        let window = self.config.scan_window_ms.max(1);
        let index_of = |at: Ms| (at - origin) / window;

        let mut last_touched: Option<i64> = None;
        for item in self.all.entries() {
            let first = index_of(item.span.start);
            let last = if item.span.end > item.span.start {
                index_of(item.span.end - 1)
            } else {
                first
            };
            if let Some(reached) = last_touched
                && first > reached + 1
            {
                return Some(origin + first * window);
            }
            last_touched = Some(last_touched.map_or(last, |reached| reached.max(last)));
        }
        None
    }

    /// Split this span at its first gap, then keep splitting the tail until
    /// no gap is left. Returns `None` if there was no gap.
    ///
    /// Spawned spans hold at least two members each and belong to the
    /// caller. A tail of one member just gets its layout cleared.
    pub(super) fn split_if_necessary<H: LayoutHost>(
        &mut self,
        host: &mut H,
    ) -> Option<Vec<ConflictSpan>> {
        let mut pending = self.detach_after_gap(host)?;
        let mut spawned = Vec::new();
        loop {
            match pending.len() {
                0 => break,
                1 => {
                    host.clear_layout(&pending[0].id);
                    break;
                }
                _ => {
                    let mut next = ConflictSpan::new(self.config);
                    for item in pending.drain(..) {
                        next.add(host, item);
                    }
                    pending = next.detach_after_gap(host).unwrap_or_default();
                    if !next.is_empty() {
                        spawned.push(next);
                    }
                }
            }
        }
        Some(spawned)
    }

    /// Detach every member starting at or after the first gap and settle
    /// what stays behind. Returns the detached members.
    fn detach_after_gap<H: LayoutHost>(&mut self, host: &mut H) -> Option<Vec<BusyTime>> {
        let split_at = self.find_split_point()?;
        let tail: Vec<BusyTime> = self
            .all
            .entries()
            .filter(|item| item.span.start >= split_at)
            .copied()
            .collect();
        for item in &tail {
            self.detach(host, &item.id);
        }
        metrics::counter!(observability::SPAN_SPLITS_TOTAL).increment(1);
        debug!(span_id = %self.id(), split_at, moved = tail.len(), kept = self.len(), "conflict span split");

        if !self.self_destruct_if_necessary(host) && !self.is_empty() {
            self.refresh(host);
        }
        Some(tail)
    }
}
