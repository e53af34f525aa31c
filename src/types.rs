//! Shared types used across all pipeline stages.
//!
//! A [`Podcast`] is the raw entity as loaded from the record source. The build
//! turns each one into a [`PodcastRecord`] snapshot exactly once; every later
//! stage (export, rollups, pages) reads those snapshots and never goes back to
//! the raw entity.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Directory under the page-staging dir holding cached episode artwork.
pub const EPISODE_PHOTOS_DIR: &str = "episode-photos";

/// One episode as stored in the record source.
#[derive(Debug, Clone, PartialEq)]
pub struct Podcast {
    pub id: i64,
    pub uid: String,
    pub title: String,
    pub date: DateTime<Utc>,
    /// Raw markdown.
    pub description: String,
    pub notes: String,
    pub transcript: String,
    pub podbean_media_uri: String,
    /// Canonical upstream artwork URI.
    pub podbean_photo_uri: String,
}

/// Immutable snapshot of one episode for the duration of a build.
///
/// `description_html` is the output of the build's single markdown pass for
/// this uid; the export and every rendered page read it from here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastRecord {
    pub id: i64,
    pub uid: String,
    pub title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub publish_date: DateTime<Utc>,
    pub raw_description: String,
    pub description_html: String,
    /// Artwork path relative to the site root, e.g. `episode-photos/abc.jpg`.
    pub photo_path: String,
    pub episode_photo_uri: String,
    pub date_and_time: String,
}

impl PodcastRecord {
    /// Site-relative path of the cached artwork for `uid`.
    pub fn photo_path_for(uid: &str) -> String {
        format!("{EPISODE_PHOTOS_DIR}/{}", photo_file_name(uid))
    }
}

/// Artwork file name for `uid`: always a single path component.
///
/// Path separators and NUL become `_`. With the `.jpg` suffix appended,
/// even `.` or `..` yield an ordinary file name.
pub fn photo_file_name(uid: &str) -> String {
    let stem: String = uid
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    format!("{stem}.jpg")
}

/// The episodes of one calendar year, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRollup {
    pub year: i32,
    pub podcasts: Vec<PodcastRecord>,
    pub is_active: bool,
}

impl YearRollup {
    /// CSS class marker used by page templates (`"active"` or empty).
    pub fn active_class(&self) -> &'static str {
        if self.is_active { "active" } else { "" }
    }
}
