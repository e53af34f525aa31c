//! Shared test utilities for the podcast-site test suite.
//!
//! Provides record builders keyed by a `YYYY-MM-DD` date, a SQLite fixture
//! writer, and mock implementations of the two external seams (artwork API
//! and version control).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let r = record(1, "abc", "2023-01-01");
//! assert_eq!(r.photo_path, "episode-photos/abc.jpg");
//!
//! let source = MockArtwork::serving(b"jpeg").with_failure("bad", StatusCode::NOT_FOUND);
//! ```

use crate::api::{ApiError, ArtworkSource};
use crate::dates;
use crate::publish::{PublishError, VersionControl};
use crate::types::{Podcast, PodcastRecord};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

// =========================================================================
// Record builders
// =========================================================================

/// Midnight UTC on `date` (`YYYY-MM-DD`). Panics on a malformed date.
pub fn midnight(date: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap_or_else(|e| panic!("bad test date {date:?}: {e}"))
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// A raw podcast entity published at midnight UTC on `date`.
pub fn podcast(id: i64, uid: &str, date: &str) -> Podcast {
    Podcast {
        id,
        uid: uid.to_string(),
        title: format!("Episode {uid}"),
        date: midnight(date),
        description: format!("About *{uid}*"),
        notes: String::new(),
        transcript: String::new(),
        podbean_media_uri: format!("https://podbean.example.com/media/{uid}.mp3"),
        podbean_photo_uri: format!("https://podbean.example.com/photo/{uid}.jpg"),
    }
}

/// A build snapshot as the pipeline would produce it for [`podcast`].
pub fn record(id: i64, uid: &str, date: &str) -> PodcastRecord {
    let p = podcast(id, uid, date);
    PodcastRecord {
        id,
        uid: p.uid.clone(),
        title: p.title,
        publish_date: p.date,
        description_html: format!("<p>About <em>{uid}</em></p>"),
        raw_description: p.description,
        photo_path: PodcastRecord::photo_path_for(uid),
        episode_photo_uri: p.podbean_photo_uri,
        date_and_time: dates::format_date_and_time(&p.date),
    }
}

// =========================================================================
// SQLite fixtures
// =========================================================================

/// Create `path` with a `podcast` table holding `rows`.
///
/// Each row is `(id, uid, title, date_millis, description)`; the remaining
/// columns get deterministic values derived from the uid.
pub fn create_podcast_db(path: &Path, rows: &[(i64, &str, &str, i64, &str)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE podcast (
             id INTEGER PRIMARY KEY,
             uid TEXT NOT NULL,
             title TEXT,
             date INTEGER NOT NULL,
             description TEXT,
             notes TEXT,
             transcript TEXT,
             podbean_media_uri TEXT,
             podbean_photo_uri TEXT
         );",
    )
    .unwrap();
    for (id, uid, title, millis, description) in rows {
        conn.execute(
            "INSERT INTO podcast (id, uid, title, date, description, notes, transcript, \
             podbean_media_uri, podbean_photo_uri) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                uid,
                title,
                millis,
                description,
                format!("notes for {uid}"),
                "",
                format!("https://podbean.example.com/media/{uid}.mp3"),
                format!("https://podbean.example.com/photo/{uid}.jpg"),
            ],
        )
        .unwrap();
    }
}

// =========================================================================
// Artwork API mock
// =========================================================================

enum Behavior {
    Serve(Vec<u8>),
    Fail(StatusCode),
    Unauthorized,
}

/// In-memory [`ArtworkSource`] that records every uid it is asked for.
pub struct MockArtwork {
    behavior: Behavior,
    failures: HashMap<String, StatusCode>,
    requests: Mutex<Vec<String>>,
}

impl MockArtwork {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            failures: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with `bytes`.
    pub fn serving(bytes: &[u8]) -> Self {
        Self::with_behavior(Behavior::Serve(bytes.to_vec()))
    }

    /// Answer every request with an HTTP error status.
    pub fn failing_with(status: StatusCode) -> Self {
        Self::with_behavior(Behavior::Fail(status))
    }

    /// Fail every request as if the token request was rejected.
    pub fn unauthorized() -> Self {
        Self::with_behavior(Behavior::Unauthorized)
    }

    /// Fail requests for `uid` with `status`, whatever the default behavior.
    pub fn with_failure(mut self, uid: &str, status: StatusCode) -> Self {
        self.failures.insert(uid.to_string(), status);
        self
    }

    /// Requested uids, sorted (the fan-out order is not deterministic).
    pub fn requests(&self) -> Vec<String> {
        let mut requests = self.requests.lock().unwrap().clone();
        requests.sort();
        requests
    }
}

impl ArtworkSource for MockArtwork {
    fn fetch_artwork(&self, uid: &str) -> Result<Vec<u8>, ApiError> {
        self.requests.lock().unwrap().push(uid.to_string());
        let url = format!("http://mock/podcasts/{uid}/profile-photo");
        if let Some(&status) = self.failures.get(uid) {
            return Err(ApiError::Status { url, status });
        }
        match &self.behavior {
            Behavior::Serve(bytes) => Ok(bytes.clone()),
            Behavior::Fail(status) => Err(ApiError::Status {
                url,
                status: *status,
            }),
            Behavior::Unauthorized => Err(ApiError::Auth {
                uri: "http://mock".into(),
                username: "user".into(),
                status: StatusCode::UNAUTHORIZED,
            }),
        }
    }
}

// =========================================================================
// Version control mock
// =========================================================================

/// One call made against [`MockVcs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Stage(String),
    Commit(String),
    Push,
}

/// Records calls instead of running git. Entries listed in `unchanged`
/// report that nothing was staged.
#[derive(Default)]
pub struct MockVcs {
    unchanged: Vec<String>,
    fail_push: bool,
    calls: Mutex<Vec<VcsCall>>,
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unchanged(mut self, entry: &str) -> Self {
        self.unchanged.push(entry.to_string());
        self
    }

    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Commit messages in call order.
    pub fn commits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                VcsCall::Commit(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }
}

impl VersionControl for MockVcs {
    fn stage(&self, entry: &str) -> Result<bool, PublishError> {
        self.calls
            .lock()
            .unwrap()
            .push(VcsCall::Stage(entry.to_string()));
        Ok(!self.unchanged.iter().any(|u| u == entry))
    }

    fn commit(&self, message: &str) -> Result<(), PublishError> {
        self.calls
            .lock()
            .unwrap()
            .push(VcsCall::Commit(message.to_string()));
        Ok(())
    }

    fn push(&self) -> Result<(), PublishError> {
        self.calls.lock().unwrap().push(VcsCall::Push);
        if self.fail_push {
            return Err(PublishError::Git {
                command: "git push".into(),
                status: "exit status: 1".into(),
                stderr: "rejected".into(),
            });
        }
        Ok(())
    }
}
