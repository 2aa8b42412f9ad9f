use crate::checklist::Violations;
use crate::checklist::dependencies::missing_packages;
use crate::files::ignore::DEFAULT_IGNORE_FILE;
use crate::files::pattern::{PathPatternError, PatternSet, components};
use crate::files::staging::staged;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory the bot loads its cog modules from.
pub const COG_DIRECTORY: &str = "cogs";

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum ManifestError {
    #[error("required file {0} is missing")]
    MissingRequiredFile(String),
    #[error("{0} would be uploaded but matches an excluded pattern")]
    ForbiddenFileUploaded(String),
    #[error("{file} does not declare package {package}")]
    MissingDependency { file: String, package: String },
    #[error("could not inspect project tree: {0}")]
    Inspect(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestBuildError {
    #[error("required entry {entry} is also excluded by pattern {pattern}")]
    Overlap { entry: String, pattern: String },
    #[error("required entry {0:?} must be a non-empty relative path without `..`")]
    InvalidEntry(String),
    #[error("invalid excluded pattern: {0}")]
    Pattern(#[from] PathPatternError),
}

/// A relative path that must exist. A trailing `/` requires a directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManifestEntry {
    path: PathBuf,
    directory: bool,
}

impl ManifestEntry {
    pub fn parse(entry: &str) -> Result<Self, ManifestBuildError> {
        let trimmed = entry.trim();
        let (directory, rest) = match trimmed.strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let path = PathBuf::from(rest);
        let parts = components(&path);
        let relative = path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if parts.is_empty() || !relative {
            return Err(ManifestBuildError::InvalidEntry(entry.to_string()));
        }
        Ok(Self {
            path: PathBuf::from(parts.join("/")),
            directory,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_directory(&self) -> bool {
        self.directory
    }

    /// Slash-joined name, with a trailing `/` for directories.
    pub fn name(&self) -> String {
        let name = components(&self.path).join("/");
        if self.directory { format!("{name}/") } else { name }
    }

    fn exists_under(&self, root: &Path) -> bool {
        let full = root.join(&self.path);
        if self.directory {
            full.is_dir()
        } else {
            full.is_file()
        }
    }
}

#[derive(Debug, Clone)]
pub struct DependencyRequirement {
    pub file: ManifestEntry,
    pub packages: Vec<String>,
}

/// What must be uploaded and what must not.
///
/// Built through [`ManifestBuilder`], which rejects a required entry that an
/// excluded pattern would also match.
#[derive(Debug, Clone)]
pub struct FileManifest {
    required: Vec<ManifestEntry>,
    excluded: PatternSet,
    generated: Vec<ManifestEntry>,
    dependencies: Option<DependencyRequirement>,
    ignore_file: String,
}

impl FileManifest {
    pub fn builder() -> ManifestBuilder {
        ManifestBuilder::default()
    }

    pub fn new<R, E>(required: R, excluded: E) -> Result<Self, ManifestBuildError>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self::builder().required(required).excluded(excluded).build()
    }

    pub fn required(&self) -> &[ManifestEntry] {
        &self.required
    }

    pub fn excluded(&self) -> &[String] {
        self.excluded.patterns()
    }

    pub fn generated(&self) -> &[ManifestEntry] {
        &self.generated
    }

    pub fn dependencies(&self) -> Option<&DependencyRequirement> {
        self.dependencies.as_ref()
    }

    pub fn ignore_file(&self) -> &str {
        &self.ignore_file
    }

    /// Resources created on first run that are not there yet.
    pub fn pending_resources(&self, root: &Path) -> Vec<String> {
        self.generated
            .iter()
            .filter(|entry| !root.join(entry.path()).exists())
            .map(ManifestEntry::name)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct ManifestBuilder {
    required: Vec<String>,
    excluded: Vec<String>,
    cogs: Vec<String>,
    generated: Vec<String>,
    dependencies: Option<(String, Vec<String>)>,
    ignore_file: Option<String>,
}

impl ManifestBuilder {
    pub fn required<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.required
            .extend(entries.into_iter().map(|e| e.as_ref().to_string()));
        self
    }

    pub fn excluded<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.excluded
            .extend(patterns.into_iter().map(|p| p.as_ref().to_string()));
        self
    }

    /// Each cog name requires `cogs/<name>.py`.
    pub fn cogs<I>(mut self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.cogs
            .extend(names.into_iter().map(|n| n.as_ref().to_string()));
        self
    }

    pub fn generated<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.generated
            .extend(entries.into_iter().map(|e| e.as_ref().to_string()));
        self
    }

    /// The dependency file becomes a required entry as well.
    pub fn dependencies(mut self, file: &str, packages: Vec<String>) -> Self {
        self.dependencies = Some((file.to_string(), packages));
        self
    }

    pub fn ignore_file(mut self, name: &str) -> Self {
        self.ignore_file = Some(name.to_string());
        self
    }

    pub fn build(self) -> Result<FileManifest, ManifestBuildError> {
        let excluded = PatternSet::parse_all(&self.excluded)?;

        let mut required = self
            .required
            .iter()
            .map(|e| ManifestEntry::parse(e))
            .collect::<Result<Vec<_>, _>>()?;
        for cog in &self.cogs {
            let module = cog.trim().trim_end_matches(".py");
            required.push(ManifestEntry::parse(&format!("{COG_DIRECTORY}/{module}.py"))?);
        }

        let dependencies = match self.dependencies {
            Some((file, packages)) => {
                let file = ManifestEntry::parse(&file)?;
                required.push(file.clone());
                Some(DependencyRequirement { file, packages })
            }
            None => None,
        };

        required.sort();
        required.dedup();

        for entry in &required {
            if let Some((_, pattern)) = excluded.find(entry.path(), entry.is_directory()) {
                return Err(ManifestBuildError::Overlap {
                    entry: entry.name(),
                    pattern: pattern.to_string(),
                });
            }
        }

        let generated = self
            .generated
            .iter()
            .map(|e| ManifestEntry::parse(e))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FileManifest {
            required,
            excluded,
            generated,
            dependencies,
            ignore_file: self
                .ignore_file
                .unwrap_or_else(|| DEFAULT_IGNORE_FILE.to_string()),
        })
    }
}

/// Checks that every required entry exists under `root` and that no staged
/// file matches an excluded pattern.
///
/// All violations are reported together: missing files first, then forbidden
/// uploads, then undeclared packages. A forbidden directory is reported once,
/// with a trailing `/`, and only when it holds a staged file.
pub fn validate_manifest(root: &Path, manifest: &FileManifest) -> Result<(), Violations<ManifestError>> {
    let mut errors = Vec::new();

    let mut missing = Vec::new();
    for entry in manifest.required() {
        if !entry.exists_under(root) {
            debug!("missing required entry {}", entry.name());
            missing.push(ManifestError::MissingRequiredFile(entry.name()));
        }
    }
    errors.extend(missing);

    match staged(root, manifest.ignore_file()) {
        Ok(files) => {
            let forbidden: BTreeSet<String> = files
                .iter()
                .filter_map(|file| {
                    let (prefix, _) = manifest.excluded.find(file, false)?;
                    let directory = prefix != *file;
                    Some(
                        ManifestEntry {
                            path: prefix,
                            directory,
                        }
                        .name(),
                    )
                })
                .collect();
            errors.extend(forbidden.into_iter().map(ManifestError::ForbiddenFileUploaded));
        }
        Err(e) => errors.push(ManifestError::Inspect(e.to_string())),
    }

    if let Some(requirement) = manifest.dependencies() {
        let path = root.join(requirement.file.path());
        if path.is_file() {
            match std::fs::read_to_string(&path) {
                Ok(content) => errors.extend(
                    missing_packages(&content, &requirement.packages)
                        .into_iter()
                        .map(|package| ManifestError::MissingDependency {
                            file: requirement.file.name(),
                            package: package.to_string(),
                        }),
                ),
                Err(e) => errors.push(ManifestError::Inspect(format!(
                    "{}: {e}",
                    path.display()
                ))),
            }
        }
    }

    info!("manifest check found {} violation(s)", errors.len());
    Violations::check(errors)
}
