//! Publishing the generated site.
//!
//! Two halves:
//!
//! 1. [`copy_into_place`] moves the finished artifacts into the publish clone:
//!    static assets and the staged pages are merged into the item bundle, and
//!    the bundle is copied into the clone.
//! 2. [`publish`] commits the clone, one commit per top-level entry, then
//!    pushes once. It only runs in publish-enabled builds; the caller decides.
//!
//! Version control sits behind [`VersionControl`] so the commit sequence can
//! be exercised without a repository. [`GitCli`] drives the `git` binary.

use crate::files::{self, GIT_DIR};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{command} failed ({status}): {stderr}")]
    Git {
        command: String,
        status: String,
        stderr: String,
    },
}

/// The version-control operations the publisher needs, scoped to one
/// working directory.
pub trait VersionControl {
    /// Stage `entry` (a top-level name in the working directory).
    /// Returns whether anything ended up staged.
    fn stage(&self, entry: &str) -> Result<bool, PublishError>;
    fn commit(&self, message: &str) -> Result<(), PublishError>;
    fn push(&self) -> Result<(), PublishError>;
}

/// [`VersionControl`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    dir: PathBuf,
}

impl GitCli {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn git(&self, args: &[&str]) -> Result<std::process::Output, PublishError> {
        let command = format!("git {}", args.join(" "));
        tracing::debug!(%command, dir = %self.dir.display(), "running");
        Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|source| PublishError::Spawn { command, source })
    }

    fn run(&self, args: &[&str]) -> Result<(), PublishError> {
        let output = self.git(args)?;
        if !output.status.success() {
            return Err(PublishError::Git {
                command: format!("git {}", args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl VersionControl for GitCli {
    fn stage(&self, entry: &str) -> Result<bool, PublishError> {
        self.run(&["add", "--all", "--", entry])?;
        // Exit code 1 means the index differs from HEAD.
        let status = self.git(&["diff", "--cached", "--quiet"])?.status;
        match status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(PublishError::Git {
                command: "git diff --cached --quiet".into(),
                status: status.to_string(),
                stderr: String::new(),
            }),
        }
    }

    fn commit(&self, message: &str) -> Result<(), PublishError> {
        self.run(&["commit", "-m", message])
    }

    fn push(&self) -> Result<(), PublishError> {
        self.run(&["push"])
    }
}

/// File counts from [`copy_into_place`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    pub assets: usize,
    pub pages: usize,
    pub published: usize,
}

/// Assemble the bundle in `items` and copy it into `clone`.
///
/// `static_assets` may be absent, in which case only the pages are bundled.
/// `items` and `clone` are expected to have been reset by the caller.
pub fn copy_into_place(
    static_assets: &Path,
    pages: &Path,
    items: &Path,
    clone: &Path,
) -> Result<CopyStats, PublishError> {
    let assets = if static_assets.is_dir() {
        files::copy_dir_contents(static_assets, items)?
    } else {
        tracing::warn!(
            path = %static_assets.display(),
            "static assets directory not found, skipping"
        );
        0
    };
    let pages = files::copy_dir_contents(pages, items)?;
    let published = files::copy_dir_contents(items, clone)?;
    tracing::info!(
        assets,
        pages,
        published,
        clone = %clone.display(),
        "copied site into publish clone"
    );
    Ok(CopyStats {
        assets,
        pages,
        published,
    })
}

/// Commit message for one top-level entry.
pub fn commit_message(entry: &str, now: &DateTime<Utc>) -> String {
    format!(
        "adding {entry} @ {}",
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// What [`publish`] did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub committed: Vec<String>,
    /// Entries with nothing to commit.
    pub unchanged: Vec<String>,
}

/// Commit every top-level entry of `clone` separately, then push.
///
/// `.git` is never staged. Entries that stage nothing are skipped. A push
/// failure is returned as-is; there is no retry.
pub fn publish(
    vcs: &dyn VersionControl,
    clone: &Path,
    now: &DateTime<Utc>,
) -> Result<PublishReport, PublishError> {
    let mut report = PublishReport::default();
    for entry in files::top_level_entries(clone)? {
        debug_assert_ne!(entry, GIT_DIR);
        if !vcs.stage(&entry)? {
            tracing::debug!(%entry, "nothing to commit");
            report.unchanged.push(entry);
            continue;
        }
        let message = commit_message(&entry, now);
        vcs.commit(&message)?;
        tracing::info!(%entry, "committed");
        report.committed.push(entry);
    }
    vcs.push()?;
    tracing::info!(commits = report.committed.len(), "pushed publish clone");
    Ok(report)
}
