//! Output tree operations: destructive resets and recursive copies.
//!
//! A build always starts from empty staging directories. [`reset_dir`] is the
//! only way they are prepared: remove, then recreate, failing as a whole if
//! either half fails. The publish clone is different; its `.git` metadata must
//! survive, so [`clear_except_git`] empties everything around it.

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Version-control metadata directory preserved in the publish clone.
pub const GIT_DIR: &str = ".git";

/// Remove `dir` and everything in it, then recreate it empty.
pub fn reset_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(dir)?;
    tracing::debug!(path = %dir.display(), "reset directory");
    Ok(())
}

/// Delete every entry of `dir` except `.git`. Creates `dir` if missing.
///
/// Returns the number of top-level entries removed.
pub fn clear_except_git(dir: &Path) -> io::Result<usize> {
    fs::create_dir_all(dir)?;
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == GIT_DIR {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }
    Ok(removed)
}

/// Copy the contents of `src` into `dst`, recursively. Existing files are
/// overwritten. Returns the number of files copied.
pub fn copy_dir_contents(src: &Path, dst: &Path) -> io::Result<usize> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Names of the top-level entries in `dir`, sorted, excluding `.git`.
pub fn top_level_entries(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name != GIT_DIR {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
