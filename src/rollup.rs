//! Year rollups and the "latest episodes" highlight.
//!
//! Records are bucketed by their UTC publication year (see [`crate::dates`]).
//! Buckets are ordered most-recent-first internally and by year descending
//! overall. The active year is computed once from the full record set before
//! grouping and passed in, so it does not depend on which buckets exist.

use crate::dates;
use crate::types::{Podcast, PodcastRecord, YearRollup};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Number of records in the index page highlight.
pub const TOP_N: usize = 3;

/// Year of the most recent podcast, or the year of `now` when there are none.
pub fn max_year(podcasts: &[Podcast], now: &DateTime<Utc>) -> i32 {
    podcasts
        .iter()
        .map(|p| p.date)
        .max()
        .map(|d| dates::year_of(&d))
        .unwrap_or_else(|| dates::year_of(now))
}

/// Sort records by publication date, most recent first.
///
/// The sort is stable, so records sharing a timestamp keep their input order.
pub fn sort_most_recent_first(records: &mut [PodcastRecord]) {
    records.sort_by_key(|r| Reverse(r.publish_date));
}

/// The `n` most recent records, most recent first.
pub fn top_n(records: &[PodcastRecord], n: usize) -> Vec<PodcastRecord> {
    let mut sorted = records.to_vec();
    sort_most_recent_first(&mut sorted);
    sorted.truncate(n);
    sorted
}

/// Partition records by publication year, each bucket most recent first.
pub fn group_by_year(records: &[PodcastRecord]) -> BTreeMap<i32, Vec<PodcastRecord>> {
    let mut years: BTreeMap<i32, Vec<PodcastRecord>> = BTreeMap::new();
    for record in records {
        years
            .entry(dates::year_of(&record.publish_date))
            .or_default()
            .push(record.clone());
    }
    for bucket in years.values_mut() {
        sort_most_recent_first(bucket);
    }
    years
}

/// Rollups ordered by year descending; the one for `active_year` is flagged.
pub fn build_rollups(records: &[PodcastRecord], active_year: i32) -> Vec<YearRollup> {
    group_by_year(records)
        .into_iter()
        .rev()
        .map(|(year, podcasts)| YearRollup {
            year,
            podcasts,
            is_active: year == active_year,
        })
        .collect()
}
