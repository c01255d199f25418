//! Timestamp helpers.

use chrono::{DateTime, Local, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Format used for human-readable banners.
pub const HUMAN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp in local time for log banners.
///
/// ```
/// use stagechain::utils::human_timestamp;
/// use chrono::{TimeZone, Utc};
///
/// let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
/// assert_eq!(human_timestamp(&ts).len(), 19);
/// ```
#[must_use]
pub fn human_timestamp(ts: &Timestamp) -> String {
    ts.with_timezone(&Local).format(HUMAN_FORMAT).to_string()
}
