//! Wall-clock helper. All persisted timestamps are Unix seconds as `f64`.

use chrono::Utc;

/// Current time as fractional Unix seconds (microsecond resolution).
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
