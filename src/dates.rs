//! Date handling with a single, fixed calendar convention.
//!
//! Every date in the pipeline is interpreted in UTC. Year bucketing, the
//! active-year marker, and the formatted strings all go through this module
//! so an episode published at 23:30 on December 31st can never land in one
//! year for the rollups and another for the page text.

use chrono::{DateTime, Datelike, Utc};

/// Format used for an episode's human-readable date and time.
const DATE_AND_TIME_FORMAT: &str = "%m/%d/%Y %H:%M";

/// Format used for the "site generated at" stamp on the index page.
const GENERATION_FORMAT: &str = "%m/%d/%Y %H:%M:%S%.3f";

/// Calendar year of a publication date.
pub fn year_of(date: &DateTime<Utc>) -> i32 {
    date.year()
}

/// Convert a stored epoch-millisecond timestamp into a UTC date.
///
/// Returns `None` for values outside chrono's representable range.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Human-readable date and time for an episode, e.g. `06/01/2023 14:05`.
pub fn format_date_and_time(date: &DateTime<Utc>) -> String {
    date.format(DATE_AND_TIME_FORMAT).to_string()
}

/// Generation stamp with millisecond precision, e.g. `06/01/2023 14:05:09.123`.
pub fn format_generation_timestamp(now: &DateTime<Utc>) -> String {
    now.format(GENERATION_FORMAT).to_string()
}
