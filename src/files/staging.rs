use crate::files::ignore::{IgnoreFile, IgnoreFileError};
use ignore::{DirEntry, WalkBuilder};
use log::debug;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories never uploaded, whatever the ignore file says.
const ALWAYS_SKIPPED: &[&str] = &[".git"];

#[derive(Error, Debug)]
pub enum StagingError {
    IgnoreFileError(#[from] IgnoreFileError),
    NestedIgnoreFileError { path: PathBuf, message: String },
    WalkError(#[from] ignore::Error),
}

impl Display for StagingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

fn not_skipped(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !ALWAYS_SKIPPED.iter().any(|s| entry.file_name() == *s)
}

/// Files under `root` that git would upload, relative and sorted.
///
/// `ignore_file` is read in every directory, and patterns in a nested file
/// apply below that directory only. A directory counts as uploaded only
/// through the files it holds.
pub fn staged(root: &Path, ignore_file: &str) -> Result<Vec<PathBuf>, StagingError> {
    // line-numbered errors for the root file
    IgnoreFile::load(root, ignore_file)?;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .parents(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .add_custom_ignore_filename(ignore_file)
        .filter_entry(not_skipped);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry?;
        if let Some(error) = entry.error() {
            return Err(StagingError::NestedIgnoreFileError {
                path: entry.path().join(ignore_file),
                message: error.to_string(),
            });
        }
        if entry.file_type().is_none_or(|t| t.is_dir()) {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        files.push(rel.to_path_buf());
    }

    files.sort();
    debug!("{} files staged under {}", files.len(), root.display());
    Ok(files)
}
