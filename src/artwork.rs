//! Episode artwork acquisition.
//!
//! Each episode gets exactly one file, `episode-photos/<uid>.jpg`, under the
//! page-staging directory. When the file is already there nothing happens, so
//! re-running a build or retrying a record never touches the network twice.
//! Otherwise the artwork is fetched from the API; any failure other than an
//! authentication failure is logged and replaced by the default artwork, so a
//! missing photo never fails a build.
//!
//! ## Parallel Processing
//!
//! Records are processed in parallel using [rayon](https://docs.rs/rayon).
//! Target paths are disjoint per uid, so workers share nothing but the
//! photos directory, which is created once before the fan-out starts.

use crate::api::{ApiError, ArtworkSource};
use crate::types::{EPISODE_PHOTOS_DIR, PodcastRecord, photo_file_name};
use rayon::prelude::*;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Artwork written when an episode's own artwork can't be retrieved.
pub const DEFAULT_EPISODE_PHOTO: &[u8] =
    include_bytes!("../static/assets/images/default-episode-photo.jpg");

#[derive(Error, Debug)]
pub enum ArtworkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artwork download aborted: {0}")]
    Auth(ApiError),
}

/// What happened to one record's artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkOutcome {
    /// The target file already existed.
    Cached,
    Downloaded,
    /// The remote artwork was unavailable; the default was written.
    Fallback,
}

/// Tally of outcomes across one build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArtworkStats {
    pub cached: usize,
    pub downloaded: usize,
    pub fallback: usize,
}

impl ArtworkStats {
    fn record(&mut self, outcome: ArtworkOutcome) {
        match outcome {
            ArtworkOutcome::Cached => self.cached += 1,
            ArtworkOutcome::Downloaded => self.downloaded += 1,
            ArtworkOutcome::Fallback => self.fallback += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.cached + self.downloaded + self.fallback
    }
}

impl fmt::Display for ArtworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded, {} cached, {} default",
            self.downloaded, self.cached, self.fallback
        )
    }
}

/// Fetches artwork for records into one photos directory.
pub struct ArtworkAcquirer<'a> {
    source: &'a dyn ArtworkSource,
    photos_dir: PathBuf,
    default_photo: Cow<'static, [u8]>,
}

impl<'a> ArtworkAcquirer<'a> {
    /// Prepare an acquirer writing under `pages_dir/episode-photos`.
    ///
    /// Creates the photos directory if missing. This is the only directory
    /// creation; it happens before any worker writes.
    pub fn new(source: &'a dyn ArtworkSource, pages_dir: &Path) -> Result<Self, ArtworkError> {
        let photos_dir = pages_dir.join(EPISODE_PHOTOS_DIR);
        fs::create_dir_all(&photos_dir)?;
        Ok(Self {
            source,
            photos_dir,
            default_photo: Cow::Borrowed(DEFAULT_EPISODE_PHOTO),
        })
    }

    /// Use `path` instead of the bundled default artwork.
    pub fn with_default_photo(mut self, path: &Path) -> Result<Self, ArtworkError> {
        self.default_photo = Cow::Owned(fs::read(path)?);
        Ok(self)
    }

    /// Artwork file for `uid`, always directly inside the photos directory.
    pub fn target_for(&self, uid: &str) -> PathBuf {
        self.photos_dir.join(photo_file_name(uid))
    }

    /// Make sure `record` has artwork on disk.
    ///
    /// Only an authentication failure is returned as an error from the
    /// remote side; everything else degrades to the default artwork.
    pub fn acquire(&self, record: &PodcastRecord) -> Result<ArtworkOutcome, ArtworkError> {
        let target = self.target_for(&record.uid);
        if target.exists() {
            tracing::debug!(path = %target.display(), "artwork already present");
            return Ok(ArtworkOutcome::Cached);
        }
        match self.source.fetch_artwork(&record.uid) {
            Ok(bytes) => {
                write_file(&target, &bytes)?;
                tracing::info!(uid = %record.uid, path = %target.display(), "saved artwork");
                Ok(ArtworkOutcome::Downloaded)
            }
            Err(err) if err.is_auth() => Err(ArtworkError::Auth(err)),
            Err(err) => {
                tracing::warn!(
                    uid = %record.uid,
                    error = %err,
                    "no artwork for episode, using default"
                );
                write_file(&target, &self.default_photo)?;
                Ok(ArtworkOutcome::Fallback)
            }
        }
    }

    /// Acquire artwork for every record in parallel.
    pub fn acquire_all(&self, records: &[PodcastRecord]) -> Result<ArtworkStats, ArtworkError> {
        let outcomes = records
            .par_iter()
            .map(|record| self.acquire(record))
            .collect::<Result<Vec<_>, _>>()?;
        let mut stats = ArtworkStats::default();
        for outcome in outcomes {
            stats.record(outcome);
        }
        Ok(stats)
    }
}

/// Write through a sibling temp file; a `<uid>.jpg` on disk is always complete.
fn write_file(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let partial = target.with_extension("jpg.part");
    fs::write(&partial, bytes)?;
    fs::rename(&partial, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockArtwork, record};
    use reqwest::StatusCode;
    use tempfile::TempDir;

    #[test]
    fn downloads_into_photos_dir() {
        let tmp = TempDir::new().unwrap();
        let source = MockArtwork::serving(b"remote-bytes");
        let acquirer = ArtworkAcquirer::new(&source, tmp.path()).unwrap();

        let outcome = acquirer.acquire(&record(1, "abc", "2023-01-01")).unwrap();

        assert_eq!(outcome, ArtworkOutcome::Downloaded);
        let written = fs::read(tmp.path().join("episode-photos/abc.jpg")).unwrap();
        assert_eq!(written, b"remote-bytes");
        assert!(!tmp.path().join("episode-photos/abc.jpg.part").exists());
    }

    #[test]
    fn server_error_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let source = MockArtwork::failing_with(StatusCode::INTERNAL_SERVER_ERROR);
        let acquirer = ArtworkAcquirer::new(&source, tmp.path()).unwrap();

        let outcome = acquirer.acquire(&record(1, "abc", "2023-01-01")).unwrap();

        assert_eq!(outcome, ArtworkOutcome::Fallback);
        let written = fs::read(tmp.path().join("episode-photos/abc.jpg")).unwrap();
        assert_eq!(written, DEFAULT_EPISODE_PHOTO);
    }

    #[test]
    fn existing_file_is_left_alone_without_a_request() {
        let tmp = TempDir::new().unwrap();
        let source = MockArtwork::serving(b"new");
        let acquirer = ArtworkAcquirer::new(&source, tmp.path()).unwrap();
        let target = acquirer.target_for("abc");
        fs::write(&target, b"old").unwrap();

        let r = record(1, "abc", "2023-01-01");
        assert_eq!(acquirer.acquire(&r).unwrap(), ArtworkOutcome::Cached);
        assert_eq!(acquirer.acquire(&r).unwrap(), ArtworkOutcome::Cached);

        assert_eq!(source.requests(), Vec::<String>::new());
        assert_eq!(fs::read(&target).unwrap(), b"old");
    }

    #[test]
    fn second_acquire_hits_network_once() {
        let tmp = TempDir::new().unwrap();
        let source = MockArtwork::serving(b"bytes");
        let acquirer = ArtworkAcquirer::new(&source, tmp.path()).unwrap();
        let r = record(1, "abc", "2023-01-01");

        acquirer.acquire(&r).unwrap();
        let before = fs::read(acquirer.target_for("abc")).unwrap();
        acquirer.acquire(&r).unwrap();

        assert_eq!(source.requests(), vec!["abc".to_string()]);
        assert_eq!(fs::read(acquirer.target_for("abc")).unwrap(), before);
    }

    #[test]
    fn auth_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let source = MockArtwork::unauthorized();
        let acquirer = ArtworkAcquirer::new(&source, tmp.path()).unwrap();

        let result = acquirer.acquire(&record(1, "abc", "2023-01-01"));

        assert!(matches!(result, Err(ArtworkError::Auth(_))));
        assert!(!acquirer.target_for("abc").exists());
    }

    #[test]
    fn custom_default_photo_is_used() {
        let tmp = TempDir::new().unwrap();
        let default = tmp.path().join("default.jpg");
        fs::write(&default, b"custom-default").unwrap();
        let source = MockArtwork::failing_with(StatusCode::NOT_FOUND);
        let acquirer = ArtworkAcquirer::new(&source, &tmp.path().join("pages"))
            .unwrap()
            .with_default_photo(&default)
            .unwrap();

        acquirer.acquire(&record(1, "abc", "2023-01-01")).unwrap();

        assert_eq!(fs::read(acquirer.target_for("abc")).unwrap(), b"custom-default");
    }

    #[test]
    fn acquire_all_tallies_outcomes() {
        let tmp = TempDir::new().unwrap();
        let source = MockArtwork::serving(b"bytes").with_failure("bad", StatusCode::BAD_GATEWAY);
        let acquirer = ArtworkAcquirer::new(&source, tmp.path()).unwrap();
        fs::write(acquirer.target_for("old"), b"x").unwrap();
        let records = vec![
            record(1, "old", "2021-01-01"),
            record(2, "new", "2022-01-01"),
            record(3, "bad", "2023-01-01"),
        ];

        let stats = acquirer.acquire_all(&records).unwrap();

        assert_eq!(
            stats,
            ArtworkStats {
                cached: 1,
                downloaded: 1,
                fallback: 1
            }
        );
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.to_string(), "1 downloaded, 1 cached, 1 default");
    }

    #[test]
    fn uid_with_separator_stays_in_photos_dir() {
        let tmp = TempDir::new().unwrap();
        let source = MockArtwork::serving(b"bytes");
        let acquirer = ArtworkAcquirer::new(&source, tmp.path()).unwrap();

        let outcome = acquirer.acquire(&record(1, "a/b", "2023-01-01")).unwrap();

        assert_eq!(outcome, ArtworkOutcome::Downloaded);
        assert_eq!(fs::read(tmp.path().join("episode-photos/a_b.jpg")).unwrap(), b"bytes");
    }

    #[test]
    fn traversal_uid_cannot_escape_photos_dir() {
        let tmp = TempDir::new().unwrap();
        let pages = tmp.path().join("site/pages");
        let source = MockArtwork::serving(b"bytes");
        let acquirer = ArtworkAcquirer::new(&source, &pages).unwrap();
        let r = record(2, "../../escaped", "2023-01-01");

        acquirer.acquire(&r).unwrap();

        let target = acquirer.target_for(&r.uid);
        assert_eq!(target.parent(), Some(pages.join("episode-photos").as_path()));
        assert!(target.is_file());
        assert!(!tmp.path().join("site/escaped.jpg").exists());
        assert!(!tmp.path().join("escaped.jpg").exists());
        assert_eq!(r.photo_path, "episode-photos/.._.._escaped.jpg");
    }

    #[test]
    fn photos_dir_creation_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let source = MockArtwork::serving(b"x");
        ArtworkAcquirer::new(&source, tmp.path()).unwrap();
        ArtworkAcquirer::new(&source, tmp.path()).unwrap();
        assert!(tmp.path().join("episode-photos").is_dir());
    }
}
