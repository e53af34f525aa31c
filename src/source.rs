//! Record source: where the build's episodes come from.
//!
//! The pipeline only needs an ordered list of [`Podcast`] entities, so the
//! source sits behind the [`RecordSource`] trait. Production reads a SQLite
//! database with a configurable query; tests and embedders can hand over a
//! `Vec<Podcast>` directly.

use crate::dates;
use crate::types::Podcast;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database not found: {0}")]
    NotFound(PathBuf),
    #[error("podcast {uid} has an out-of-range date: {millis}")]
    InvalidDate { uid: String, millis: i64 },
}

/// Supplies the full record set for one build. Read-only.
pub trait RecordSource {
    fn load_podcasts(&self) -> Result<Vec<Podcast>, SourceError>;
}

impl RecordSource for Vec<Podcast> {
    fn load_podcasts(&self) -> Result<Vec<Podcast>, SourceError> {
        Ok(self.clone())
    }
}

/// Reads podcasts from a SQLite database.
///
/// Columns are mapped by name, so the query may select them in any order:
/// `id`, `uid`, `title`, `date` (epoch milliseconds), `description`, `notes`,
/// `transcript`, `podbean_media_uri`, `podbean_photo_uri`. NULL text columns
/// become empty strings.
pub struct SqliteSource {
    database: PathBuf,
    query: String,
}

impl SqliteSource {
    pub fn new(database: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            query: query.into(),
        }
    }

    fn open(&self) -> Result<Connection, SourceError> {
        if !self.database.exists() {
            return Err(SourceError::NotFound(self.database.clone()));
        }
        Ok(Connection::open_with_flags(
            &self.database,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }
}

impl RecordSource for SqliteSource {
    fn load_podcasts(&self) -> Result<Vec<Podcast>, SourceError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(&self.query)?;
        let rows = stmt.query_map([], map_row)?;
        let mut podcasts = Vec::new();
        for row in rows {
            let (podcast, millis) = row?;
            let date = dates::from_epoch_millis(millis).ok_or_else(|| SourceError::InvalidDate {
                uid: podcast.uid.clone(),
                millis,
            })?;
            podcasts.push(Podcast { date, ..podcast });
        }
        tracing::debug!(
            count = podcasts.len(),
            database = %self.database.display(),
            "loaded podcasts"
        );
        Ok(podcasts)
    }
}

/// Map one row; the date is returned separately so range errors carry the uid.
fn map_row(row: &Row<'_>) -> rusqlite::Result<(Podcast, i64)> {
    let text = |name: &str| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(name)?.unwrap_or_default())
    };
    let millis: i64 = row.get("date")?;
    let podcast = Podcast {
        id: row.get("id")?,
        uid: row.get("uid")?,
        title: text("title")?,
        date: DateTime::<Utc>::UNIX_EPOCH,
        description: text("description")?,
        notes: text("notes")?,
        transcript: text("transcript")?,
        podbean_media_uri: text("podbean_media_uri")?,
        podbean_photo_uri: text("podbean_photo_uri")?,
    };
    Ok((podcast, millis))
}
