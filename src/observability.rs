use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// ── Span lifecycle ──────────────────────────────────────────────

/// Counter: conflict spans created (including split-off spans).
pub const SPANS_CREATED_TOTAL: &str = "busytime_spans_created_total";

/// Counter: gaps found by the split scan.
pub const SPAN_SPLITS_TOTAL: &str = "busytime_span_splits_total";

/// Counter: spans dissolved down to a single member.
pub const SPANS_DISSOLVED_TOTAL: &str = "busytime_spans_dissolved_total";

/// Counter: spans consumed by absorb.
pub const SPANS_ABSORBED_TOTAL: &str = "busytime_spans_absorbed_total";

/// Histogram: column count of a span at each relayout.
pub const SPAN_COLUMNS: &str = "busytime_span_columns";

// ── View operations ─────────────────────────────────────────────

/// Histogram: duration of a view add/remove in seconds. Labels: op.
pub const LAYOUT_DURATION_SECONDS: &str = "busytime_layout_duration_seconds";

/// Install a Prometheus recorder when `enabled`. The handle renders the
/// current metrics as text. Returns `None` if disabled or if a recorder is
/// already installed.
pub fn init(enabled: bool) -> Option<PrometheusHandle> {
    if !enabled {
        return None;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!("failed to install metrics recorder: {e}");
            None
        }
    }
}
