//! # Podcast Site
//!
//! Regenerates a static podcast website from episode records and publishes
//! it by committing the result into a version-controlled clone.
//!
//! # Architecture: One Sequential Build
//!
//! A build is a single unit of work. Each step depends on the previous one,
//! and the first fatal error aborts the rest:
//!
//! ```text
//!  1. skip if disabled
//!  2. reset output dirs   clone (keep .git), items, pages
//!  3. load podcasts       RecordSource (SQLite)
//!  4. active year         max publication year, computed once
//!  5. snapshot            markdown → HTML once per uid
//!  6. export              pages/podcasts.json
//!  7. artwork             pages/episode-photos/<uid>.jpg (parallel)
//!  8. top 3               most recent first
//!  9. rollups             per year, year descending, one active
//! 10. pages               pages/index.html, pages/<year>.html
//! 11. copy                static + pages → items → clone
//! 12. publish             one commit per top-level entry, push ("cloud" only)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | `Generator::build`, the orchestrator above |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`types`] | `Podcast`, `PodcastRecord` snapshots, `YearRollup` |
//! | [`dates`] | UTC year extraction and date formatting |
//! | [`source`] | `RecordSource` trait and the SQLite source |
//! | [`markdown`] | Sanitizing markdown renderer and the per-build cache |
//! | [`export`] | `podcasts.json` |
//! | [`api`] | Podcast API client: cached token, artwork download |
//! | [`artwork`] | Artwork acquisition with default-image fallback |
//! | [`rollup`] | Year grouping and the latest-episodes highlight |
//! | [`render`] | Index and year pages (builtin Maud or upon templates) |
//! | [`files`] | Directory resets and recursive copies |
//! | [`publish`] | Copy into the clone, per-entry commits, push |
//! | [`output`] | CLI summaries |
//!
//! # Design Decisions
//!
//! ## Degrade, Don't Fail, on Artwork
//!
//! A missing or broken episode photo never fails a build; the default artwork
//! is written in its place. The one exception is a rejected API token, which
//! would fail every request the same way and therefore aborts the build.
//!
//! ## Snapshots Carry Their HTML
//!
//! Markdown is rendered once per uid per build and stored on the
//! [`types::PodcastRecord`] snapshot. The export, the rollups and the pages all
//! read that one string, so they cannot disagree.
//!
//! ## Start From Empty
//!
//! Staging directories are removed and recreated at the start of every build,
//! and the publish clone is emptied around its `.git`. Nothing from a previous
//! run is carried forward. One build at a time per output tree.

pub mod api;
pub mod artwork;
pub mod config;
pub mod dates;
pub mod export;
pub mod files;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod rollup;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
