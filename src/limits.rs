use crate::model::{MINUTE_MS, Ms};

/// 1970-01-01.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;

/// 9999-12-31.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 253_402_300_799_999;

/// Longest busy time accepted by the view. Gap scanning walks a span in
/// fixed windows, so its cost grows with the span's duration.
pub const MAX_BUSYTIME_DURATION_MS: Ms = 366 * 24 * 60 * MINUTE_MS;

/// Narrowest gap-scan window a config may request.
pub const MIN_SCAN_WINDOW_MS: Ms = 1_000;
