//! `podcasts.json`: the machine-readable export of every episode.
//!
//! The field set and its order are fixed. `dataAndTime` duplicates
//! `dateAndTime`; downstream consumers may still read the misspelled key, so
//! both are written with the same value.

use crate::types::PodcastRecord;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the export inside the page-staging directory.
pub const EXPORT_FILENAME: &str = "podcasts.json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("export file {0} is missing or empty after write")]
    NotWritten(PathBuf),
}

/// One episode in the export. Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEntry {
    pub id: String,
    pub uid: String,
    pub title: String,
    /// Publication date as epoch milliseconds.
    pub date: i64,
    pub episode_photo_uri: String,
    /// Rendered HTML, never the raw markdown.
    pub description: String,
    pub date_and_time: String,
    pub data_and_time: String,
    pub episode_uri: String,
}

impl ExportEntry {
    fn from_record(record: &PodcastRecord, api_base: &str) -> Self {
        Self {
            id: record.id.to_string(),
            uid: record.uid.clone(),
            title: record.title.clone(),
            date: record.publish_date.timestamp_millis(),
            episode_photo_uri: record.episode_photo_uri.clone(),
            description: record.description_html.clone(),
            date_and_time: record.date_and_time.clone(),
            data_and_time: record.date_and_time.clone(),
            episode_uri: episode_uri(api_base, &record.uid),
        }
    }
}

/// URI of the produced audio for `uid`.
pub fn episode_uri(api_base: &str, uid: &str) -> String {
    format!(
        "{}/podcasts/{}/produced-audio",
        api_base.trim_end_matches('/'),
        uid
    )
}

/// Build one export entry per record, in record order.
pub fn build_export(records: &[PodcastRecord], api_base: &str) -> Vec<ExportEntry> {
    records
        .iter()
        .map(|r| ExportEntry::from_record(r, api_base))
        .collect()
}

/// Pretty-print the export into `dir/podcasts.json` and confirm it landed.
///
/// A missing or zero-byte file after the write is an error.
pub fn write_export(entries: &[ExportEntry], dir: &Path) -> Result<PathBuf, ExportError> {
    let path = dir.join(EXPORT_FILENAME);
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(&path, json)?;
    match fs::metadata(&path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {
            tracing::info!(path = %path.display(), entries = entries.len(), "wrote export");
            Ok(path)
        }
        _ => Err(ExportError::NotWritten(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::record;
    use tempfile::TempDir;

    #[test]
    fn one_entry_per_record_in_order() {
        let records = vec![record(1, "abc", "2023-01-01"), record(2, "def", "2022-12-01")];
        let export = build_export(&records, "https://api.example.com");
        assert_eq!(export.len(), 2);
        assert_eq!(export[0].uid, "abc");
        assert_eq!(export[1].id, "2");
    }

    #[test]
    fn duplicate_date_field_matches() {
        let records = vec![record(1, "abc", "2023-01-01"), record(2, "def", "2022-12-01")];
        for entry in build_export(&records, "https://api.example.com") {
            assert_eq!(entry.data_and_time, entry.date_and_time);
            assert!(!entry.date_and_time.is_empty());
        }
    }

    #[test]
    fn description_is_rendered_html() {
        let mut r = record(1, "abc", "2023-01-01");
        r.raw_description = "**bold**".into();
        r.description_html = "<p><strong>bold</strong></p>".into();
        let export = build_export(&[r], "https://api.example.com");
        assert_eq!(export[0].description, "<p><strong>bold</strong></p>");
    }

    #[test]
    fn episode_uri_points_at_produced_audio() {
        let export = build_export(&[record(1, "abc", "2023-01-01")], "https://api.example.com/");
        assert_eq!(
            export[0].episode_uri,
            "https://api.example.com/podcasts/abc/produced-audio"
        );
    }

    #[test]
    fn serialized_field_order_is_stable() {
        let export = build_export(&[record(42, "abc", "2023-01-01")], "http://api");
        let json = serde_json::to_string(&export[0]).unwrap();
        let keys = [
            "\"id\"",
            "\"uid\"",
            "\"title\"",
            "\"date\"",
            "\"episodePhotoUri\"",
            "\"description\"",
            "\"dateAndTime\"",
            "\"dataAndTime\"",
            "\"episodeUri\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(json.contains("\"id\":\"42\""));
        assert!(json.contains("\"date\":1672531200000"));
    }

    #[test]
    fn empty_record_set_writes_empty_array() {
        let tmp = TempDir::new().unwrap();
        let path = write_export(&[], tmp.path()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!([]));
    }

    #[test]
    fn output_is_pretty_printed() {
        let tmp = TempDir::new().unwrap();
        let export = build_export(&[record(1, "abc", "2023-01-01")], "http://api");
        let path = write_export(&export, tmp.path()).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("[\n  {\n"));
    }

    #[test]
    fn missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let result = write_export(&[], &tmp.path().join("absent"));
        assert!(matches!(result, Err(ExportError::Io(_))));
    }
}
