use crate::files::pattern::{PathPatternError, add_line};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log::{debug, warn};
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_IGNORE_FILE: &str = ".gitignore";

#[derive(Error, Debug)]
pub enum IgnoreFileError {
    #[error("failed to read ignore file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write ignore file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("invalid pattern at {}:{line}: {source}", .path.display())]
    Pattern {
        path: PathBuf,
        line: usize,
        source: PathPatternError,
    },
    #[error("failed to build matcher for {}: {message}", .path.display())]
    Build { path: PathBuf, message: String },
}

/// The ignore file at the project root, with gitignore semantics.
#[derive(Debug, Clone)]
pub struct IgnoreFile {
    root: PathBuf,
    path: PathBuf,
    exists: bool,
    lines: Vec<String>,
    matcher: Gitignore,
}

impl IgnoreFile {
    /// Load `root/name`. A missing file behaves as an empty one.
    pub fn load(root: &Path, name: &str) -> Result<Self, IgnoreFileError> {
        let path = root.join(name);
        if !path.is_file() {
            debug!("no ignore file at {}", path.display());
            return Self::from_content(root, &path, "");
        }

        let content = std::fs::read_to_string(&path).map_err(|source| IgnoreFileError::Read {
            path: path.clone(),
            source,
        })?;
        let mut ignore = Self::from_content(root, &path, &content)?;
        ignore.exists = true;
        Ok(ignore)
    }

    /// Parse `content` as if it were stored at `path` under `root`.
    pub fn from_content(root: &Path, path: &Path, content: &str) -> Result<Self, IgnoreFileError> {
        let mut builder = GitignoreBuilder::new(root);
        let mut lines = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            add_line(&mut builder, Some(path.to_path_buf()), trimmed).map_err(|source| {
                IgnoreFileError::Pattern {
                    path: path.to_path_buf(),
                    line: index + 1,
                    source,
                }
            })?;
            lines.push(trimmed.to_string());
        }
        debug!("{} patterns in {}", lines.len(), path.display());

        let matcher = builder.build().map_err(|e| IgnoreFileError::Build {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            path: path.to_path_buf(),
            exists: false,
            lines,
            matcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Pattern lines, without comments and blanks.
    pub fn patterns(&self) -> &[String] {
        &self.lines
    }

    /// Whether this file alone ignores `rel` or one of its parents.
    pub fn is_ignored(&self, rel: &Path, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(rel, is_dir)
            .is_ignore()
    }

    /// Excluded patterns that are not literally listed in this file.
    pub fn missing<'a>(&self, excluded: &'a [String]) -> Vec<&'a str> {
        excluded
            .iter()
            .filter(|wanted| {
                !self
                    .lines
                    .iter()
                    .any(|p| !p.starts_with('!') && normalize(p) == normalize(wanted))
            })
            .map(String::as_str)
            .collect()
    }

    /// Append patterns to the file, creating it when absent.
    pub fn append(&mut self, patterns: &[&str]) -> Result<(), IgnoreFileError> {
        if patterns.is_empty() {
            return Ok(());
        }

        let write_error = |source| IgnoreFileError::Write {
            path: self.path.clone(),
            source,
        };

        let needs_newline = self.exists
            && std::fs::read(&self.path)
                .map(|bytes| bytes.last().is_some_and(|b| *b != b'\n'))
                .map_err(write_error)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_error)?;

        let mut buffer = String::new();
        if needs_newline {
            buffer.push('\n');
        }
        for pattern in patterns {
            buffer.push_str(pattern);
            buffer.push('\n');
        }
        file.write_all(buffer.as_bytes()).map_err(write_error)?;

        if !self.exists {
            warn!("created ignore file {}", self.path.display());
        }

        let mut content = self.lines.join("\n");
        content.push('\n');
        content.push_str(&buffer);
        *self = Self::from_content(&self.root, &self.path, &content)?;
        self.exists = true;
        Ok(())
    }
}

fn normalize(source: &str) -> &str {
    source.strip_prefix('/').unwrap_or(source)
}
