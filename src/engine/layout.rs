use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;

/// Visual attributes for one member of a conflict span.
///
/// `width` and `offset` are percentages of the span's rendering area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub column: usize,
    pub columns: usize,
    pub width: f64,
    pub offset: f64,
    pub has_overlaps: bool,
    pub many_overlaps: bool,
}

impl ColumnLayout {
    /// Layout for a member of column `column` out of `columns`. Depends on
    /// nothing else, so recomputing it is always safe.
    pub fn for_column(column: usize, columns: usize, config: &LayoutConfig) -> Self {
        debug_assert!(column < columns, "column index out of range");
        let width = 100.0 / columns as f64;
        Self {
            column,
            columns,
            width,
            offset: column as f64 * width,
            has_overlaps: columns > 1,
            many_overlaps: columns > config.many_overlaps_threshold,
        }
    }
}
