//! The build: one sequential run from record load through publish.
//!
//! ```text
//! prepare dirs → load → snapshot (markdown once per uid) → podcasts.json
//!     → artwork (parallel) → top 3 + rollups → pages → copy → commit/push
//! ```
//!
//! Every step depends on the previous one succeeding; the first error aborts
//! the build and is returned as a [`BuildError`]. The only build-scoped state,
//! the [`MarkdownCache`], is a local of [`Generator::build_at`] and is
//! discarded on every exit path. Nothing is retried here; the next trigger is
//! the retry.
//!
//! Collaborators are injected: records come from a [`RecordSource`], artwork
//! from an [`ArtworkSource`], and commits go through a [`VersionControl`].

use crate::api::ArtworkSource;
use crate::artwork::{ArtworkAcquirer, ArtworkError, ArtworkStats};
use crate::config::{ConfigError, SiteConfig};
use crate::dates;
use crate::export::{self, ExportError};
use crate::files;
use crate::markdown::MarkdownCache;
use crate::publish::{self, CopyStats, PublishError, PublishReport, VersionControl};
use crate::render::{BuildContext, PageRenderer, RenderError, RenderedPages};
use crate::rollup::{self, TOP_N};
use crate::source::{RecordSource, SourceError};
use crate::types::{Podcast, PodcastRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("preparing {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("loading podcasts: {0}")]
    Source(#[from] SourceError),
    #[error("export: {0}")]
    Export(#[from] ExportError),
    #[error("artwork: {0}")]
    Artwork(#[from] ArtworkError),
    #[error("rendering: {0}")]
    Render(#[from] RenderError),
    #[error("publishing: {0}")]
    Publish(#[from] PublishError),
}

/// Result of a build that ran to completion.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub generated_at: DateTime<Utc>,
    pub records: usize,
    pub active_year: i32,
    /// `(year, episode count)`, year descending.
    pub years: Vec<(i32, usize)>,
    /// Uids of the index page highlight, most recent first.
    pub top: Vec<String>,
    pub export_path: PathBuf,
    pub artwork: ArtworkStats,
    pub pages: RenderedPages,
    pub copy: CopyStats,
    /// `None` for a local (dry) run.
    pub publish: Option<PublishReport>,
}

#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// Generation is administratively disabled.
    Skipped,
    Completed(BuildReport),
}

/// Summary of the record set without building anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub records: usize,
    pub active_year: i32,
    /// `(year, episode count)`, year descending.
    pub years: Vec<(i32, usize)>,
    pub publish_enabled: bool,
}

/// Runs builds against one configuration and set of collaborators.
pub struct Generator<'a> {
    config: &'a SiteConfig,
    records: &'a dyn RecordSource,
    artwork: &'a dyn ArtworkSource,
    vcs: &'a dyn VersionControl,
}

impl<'a> Generator<'a> {
    pub fn new(
        config: &'a SiteConfig,
        records: &'a dyn RecordSource,
        artwork: &'a dyn ArtworkSource,
        vcs: &'a dyn VersionControl,
    ) -> Self {
        Self {
            config,
            records,
            artwork,
            vcs,
        }
    }

    /// Run one build stamped with the current time.
    pub fn build(&self) -> Result<BuildOutcome, BuildError> {
        self.build_at(Utc::now())
    }

    /// Run one build as if it were `now`.
    pub fn build_at(&self, now: DateTime<Utc>) -> Result<BuildOutcome, BuildError> {
        if self.config.disabled {
            tracing::info!("generation is disabled, skipping build");
            return Ok(BuildOutcome::Skipped);
        }
        tracing::info!(at = %now.to_rfc3339(), "starting build");

        let mut cache = MarkdownCache::new();
        let result = self.run(&mut cache, now);
        tracing::debug!(entries = cache.rendered_count(), "discarding markdown cache");
        drop(cache);

        result.map(BuildOutcome::Completed)
    }

    fn run(
        &self,
        cache: &mut MarkdownCache,
        now: DateTime<Utc>,
    ) -> Result<BuildReport, BuildError> {
        let output = &self.config.output;
        prepare_dirs(&output.git_clone, &output.items, &output.pages)?;

        let podcasts = self.records.load_podcasts()?;
        tracing::info!(count = podcasts.len(), "loaded podcasts");
        let active_year = rollup::max_year(&podcasts, &now);

        let records: Vec<PodcastRecord> = podcasts.iter().map(|p| snapshot(p, cache)).collect();

        let entries = export::build_export(&records, self.config.api_base());
        let export_path = export::write_export(&entries, &output.pages)?;

        let mut acquirer = ArtworkAcquirer::new(self.artwork, &output.pages)?;
        if let Some(path) = self
            .config
            .templates
            .default_episode_photo
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
        {
            acquirer = acquirer.with_default_photo(path)?;
        }
        let artwork = acquirer.acquire_all(&records)?;
        tracing::info!(%artwork, "artwork ready");

        let top3 = rollup::top_n(&records, TOP_N);
        let rollups = rollup::build_rollups(&records, active_year);

        let renderer = PageRenderer::from_config(&self.config.templates)?;
        let ctx = BuildContext::new(
            &top3,
            &rollups,
            dates::format_generation_timestamp(&now),
            dates::year_of(&now),
        );
        let pages = renderer.write_pages(&ctx, &output.pages)?;

        let copy = publish::copy_into_place(
            &self.config.templates.static_assets,
            &output.pages,
            &output.items,
            &output.git_clone,
        )?;

        let published = if self.config.publish_enabled() {
            Some(publish::publish(self.vcs, &output.git_clone, &now)?)
        } else {
            tracing::info!(
                clone = %output.git_clone.display(),
                "publishing not enabled for the active profiles, leaving clone uncommitted"
            );
            None
        };

        Ok(BuildReport {
            generated_at: now,
            records: records.len(),
            active_year,
            years: rollups.iter().map(|r| (r.year, r.podcasts.len())).collect(),
            top: top3.iter().map(|r| r.uid.clone()).collect(),
            export_path,
            artwork,
            pages,
            copy,
            publish: published,
        })
    }
}

/// Load records and report what a build would produce. Writes nothing.
///
/// Needs neither the podcast API nor the publish clone.
pub fn check(
    config: &SiteConfig,
    records: &dyn RecordSource,
    now: DateTime<Utc>,
) -> Result<CheckReport, BuildError> {
    config.validate()?;
    let podcasts = records.load_podcasts()?;
    let mut years: BTreeMap<i32, usize> = BTreeMap::new();
    for p in &podcasts {
        *years.entry(dates::year_of(&p.date)).or_default() += 1;
    }
    Ok(CheckReport {
        records: podcasts.len(),
        active_year: rollup::max_year(&podcasts, &now),
        years: years.into_iter().rev().collect(),
        publish_enabled: config.publish_enabled(),
    })
}

/// Empty the publish clone around its `.git` and reset both staging dirs.
fn prepare_dirs(clone: &Path, items: &Path, pages: &Path) -> Result<(), BuildError> {
    let removed = files::clear_except_git(clone).map_err(prepare_error(clone))?;
    tracing::debug!(removed, clone = %clone.display(), "cleared publish clone");
    files::reset_dir(items).map_err(prepare_error(items))?;
    files::reset_dir(pages).map_err(prepare_error(pages))?;
    Ok(())
}

fn prepare_error(path: &Path) -> impl FnOnce(io::Error) -> BuildError + '_ {
    move |source| BuildError::Prepare {
        path: path.to_path_buf(),
        source,
    }
}

/// The build's one snapshot of `podcast`, rendering its markdown via `cache`.
fn snapshot(podcast: &Podcast, cache: &mut MarkdownCache) -> PodcastRecord {
    let description_html = cache.render(&podcast.uid, &podcast.description).to_string();
    PodcastRecord {
        id: podcast.id,
        uid: podcast.uid.clone(),
        title: podcast.title.clone(),
        publish_date: podcast.date,
        raw_description: podcast.description.clone(),
        description_html,
        photo_path: PodcastRecord::photo_path_for(&podcast.uid),
        episode_photo_uri: podcast.podbean_photo_uri.clone(),
        date_and_time: dates::format_date_and_time(&podcast.date),
    }
}
