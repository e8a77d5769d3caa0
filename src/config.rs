use crate::limits::MIN_SCAN_WINDOW_MS;
use crate::model::{MINUTE_MS, Ms};

pub const DEFAULT_SCAN_WINDOW_MS: Ms = 5 * MINUTE_MS;
pub const DEFAULT_MANY_OVERLAPS_THRESHOLD: usize = 4;

/// Tunables shared by every span of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Width of the windows the gap scan walks a span with. Gaps narrower
    /// than this may go undetected.
    pub scan_window_ms: Ms,
    /// Column count above which members are flagged "many overlaps".
    pub many_overlaps_threshold: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            scan_window_ms: DEFAULT_SCAN_WINDOW_MS,
            many_overlaps_threshold: DEFAULT_MANY_OVERLAPS_THRESHOLD,
        }
    }
}

impl LayoutConfig {
    /// Read `BUSYTIME_SCAN_WINDOW_MS` and `BUSYTIME_MANY_OVERLAPS`,
    /// keeping the default for anything missing or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let scan_window_ms = lookup("BUSYTIME_SCAN_WINDOW_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.scan_window_ms);
        let many_overlaps_threshold = lookup("BUSYTIME_MANY_OVERLAPS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.many_overlaps_threshold);
        Self {
            scan_window_ms,
            many_overlaps_threshold,
        }
        .clamped()
    }

    pub fn with_scan_window(mut self, scan_window_ms: Ms) -> Self {
        self.scan_window_ms = scan_window_ms;
        self.clamped()
    }

    fn clamped(mut self) -> Self {
        self.scan_window_ms = self.scan_window_ms.max(MIN_SCAN_WINDOW_MS);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_five_minutes_and_four_columns() {
        let cfg = LayoutConfig::default();
        assert_eq!(cfg.scan_window_ms, 300_000);
        assert_eq!(cfg.many_overlaps_threshold, 4);
    }

    #[test]
    fn env_overrides_are_applied() {
        let cfg = LayoutConfig::from_lookup(lookup(&[
            ("BUSYTIME_SCAN_WINDOW_MS", "60000"),
            ("BUSYTIME_MANY_OVERLAPS", "6"),
        ]));
        assert_eq!(cfg.scan_window_ms, 60_000);
        assert_eq!(cfg.many_overlaps_threshold, 6);
    }

    #[test]
    fn garbage_env_falls_back_to_defaults() {
        let cfg = LayoutConfig::from_lookup(lookup(&[
            ("BUSYTIME_SCAN_WINDOW_MS", "five minutes"),
            ("BUSYTIME_MANY_OVERLAPS", "-1"),
        ]));
        assert_eq!(cfg, LayoutConfig::default());
    }

    #[test]
    fn scan_window_is_clamped() {
        let cfg = LayoutConfig::default().with_scan_window(0);
        assert_eq!(cfg.scan_window_ms, MIN_SCAN_WINDOW_MS);
        let cfg = LayoutConfig::from_lookup(lookup(&[("BUSYTIME_SCAN_WINDOW_MS", "-5")]));
        assert_eq!(cfg.scan_window_ms, MIN_SCAN_WINDOW_MS);
    }
}
