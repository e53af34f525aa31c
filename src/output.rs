//! CLI output formatting for builds and checks.
//!
//! Logging (via `tracing`) narrates a build as it runs; this module prints
//! the human-facing summary once it is over.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Podcasts: 3
//! Years
//!     2023 (2 episodes) active
//!     2022 (1 episode)
//! Latest: jun23, jan23, dec22
//! Artwork: 2 downloaded, 0 cached, 1 default
//! Export: build/pages/podcasts.json
//! Pages: index.html + 2 year pages
//! Published: 6 files into build/site
//! Commits: 6 (0 unchanged), pushed
//! ```
//!
//! A local run ends with `Commits: none (publishing not enabled)` instead.
//!
//! # Architecture
//!
//! Each summary has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::pipeline::{BuildOutcome, BuildReport, CheckReport};
use std::path::Path;

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn year_lines(years: &[(i32, usize)], active_year: i32) -> Vec<String> {
    let mut lines = vec!["Years".to_string()];
    if years.is_empty() {
        lines.push("    (none)".to_string());
    }
    for &(year, count) in years {
        let marker = if year == active_year { " active" } else { "" };
        lines.push(format!(
            "    {year} ({}){marker}",
            plural(count, "episode", "episodes")
        ));
    }
    lines
}

/// Format the summary of a finished build.
pub fn format_build_summary(report: &BuildReport, clone: &Path) -> Vec<String> {
    let mut lines = vec![format!("Podcasts: {}", report.records)];
    lines.extend(year_lines(&report.years, report.active_year));
    if !report.top.is_empty() {
        lines.push(format!("Latest: {}", report.top.join(", ")));
    }
    lines.push(format!("Artwork: {}", report.artwork));
    lines.push(format!("Export: {}", report.export_path.display()));
    lines.push(format!(
        "Pages: index.html + {}",
        plural(report.pages.years.len(), "year page", "year pages")
    ));
    lines.push(format!(
        "Published: {} into {}",
        plural(report.copy.published, "file", "files"),
        clone.display()
    ));
    match &report.publish {
        Some(published) => lines.push(format!(
            "Commits: {} ({} unchanged), pushed",
            published.committed.len(),
            published.unchanged.len()
        )),
        None => lines.push("Commits: none (publishing not enabled)".to_string()),
    }
    lines
}

/// Format the outcome of a build, skipped or completed.
pub fn format_build_outcome(outcome: &BuildOutcome, clone: &Path) -> Vec<String> {
    match outcome {
        BuildOutcome::Skipped => vec!["Build skipped: generation is disabled".to_string()],
        BuildOutcome::Completed(report) => format_build_summary(report, clone),
    }
}

pub fn print_build_outcome(outcome: &BuildOutcome, clone: &Path) {
    for line in format_build_outcome(outcome, clone) {
        println!("{}", line);
    }
}

/// Format the summary of `check`.
pub fn format_check_summary(report: &CheckReport) -> Vec<String> {
    let mut lines = vec![format!("Podcasts: {}", report.records)];
    lines.extend(year_lines(&report.years, report.active_year));
    lines.push(format!(
        "Publishing: {}",
        if report.publish_enabled {
            "enabled"
        } else {
            "disabled"
        }
    ));
    lines
}

pub fn print_check_summary(report: &CheckReport) {
    for line in format_check_summary(report) {
        println!("{}", line);
    }
}
