use crate::checklist::environment::{EnvError, EnvRequirement, validate_environment};
use crate::checklist::manifest::{FileManifest, ManifestError, validate_manifest};
use crate::checklist::path::{PathError, validate_path};
use crate::files::pattern::components;
use crate::files::staging::{StagingError, staged};
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Informational finding that does not fail the checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub resource: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistReport {
    pub root: PathBuf,
    pub settings: BTreeMap<String, String>,
    pub path: Vec<PathError>,
    pub manifest: Vec<ManifestError>,
    pub environment: Vec<EnvError>,
    pub notices: Vec<Notice>,
    #[serde(skip)]
    ignore_file: String,
}

impl ChecklistReport {
    pub fn passed(&self) -> bool {
        self.problem_count() == 0
    }

    pub fn problem_count(&self) -> usize {
        self.path.len() + self.manifest.len() + self.environment.len()
    }

    fn manifest_hint(&self, error: &ManifestError) -> Option<String> {
        match error {
            ManifestError::MissingRequiredFile(_) => {
                Some("add it to the project before uploading".to_string())
            }
            ManifestError::ForbiddenFileUploaded(_) => Some(format!(
                "list it in {} (`predep ignore --write`) or delete it",
                self.ignore_file
            )),
            ManifestError::MissingDependency { file, .. } => {
                Some(format!("add it to {file} and upload again"))
            }
            ManifestError::Inspect(_) => None,
        }
    }

    /// Human-readable rendering with one remediation hint per problem.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "predep checklist for {}", self.root.display());
        for (key, value) in &self.settings {
            let _ = writeln!(out, "  {key}: {value}");
        }

        section(&mut out, "path", &self.path, |_| {
            Some("move or rename the folder so the whole path is ASCII".to_string())
        });
        section(&mut out, "manifest", &self.manifest, |e| self.manifest_hint(e));
        section(&mut out, "environment", &self.environment, |_| {
            Some("set it in the service's environment variables".to_string())
        });

        for notice in &self.notices {
            let _ = writeln!(out, "  note  {}: {}", notice.resource, notice.message);
        }

        if self.passed() {
            let _ = writeln!(out, "ready to deploy");
        } else {
            let _ = writeln!(out, "not ready: {} problem(s)", self.problem_count());
        }
        out
    }
}

fn section<E, F>(out: &mut String, title: &str, errors: &[E], hint: F)
where
    E: std::fmt::Display,
    F: Fn(&E) -> Option<String>,
{
    if errors.is_empty() {
        let _ = writeln!(out, "  ok    {title}");
        return;
    }
    let _ = writeln!(out, "  FAIL  {title}");
    for error in errors {
        let _ = writeln!(out, "        - {error}");
        if let Some(hint) = hint(error) {
            let _ = writeln!(out, "          {hint}");
        }
    }
}

/// The full pre-upload checklist for one project.
#[derive(Debug, Clone)]
pub struct Checklist {
    manifest: FileManifest,
    requirements: Vec<EnvRequirement>,
    settings: BTreeMap<String, String>,
}

impl Checklist {
    pub fn new(manifest: FileManifest, requirements: Vec<EnvRequirement>) -> Self {
        Self {
            manifest,
            requirements,
            settings: BTreeMap::new(),
        }
    }

    /// Service settings echoed in the report.
    pub fn with_settings(mut self, settings: BTreeMap<String, String>) -> Self {
        self.settings = settings;
        self
    }

    pub fn manifest(&self) -> &FileManifest {
        &self.manifest
    }

    pub fn requirements(&self) -> &[EnvRequirement] {
        &self.requirements
    }

    /// Path errors for the root, then one per staged subtree: a non-ASCII
    /// folder is reported once, not once per file below it.
    pub fn path_errors(&self, root: &Path) -> Result<Vec<PathError>, StagingError> {
        let mut errors: Vec<PathError> = validate_path(root).err().into_iter().collect();
        let mut reported = BTreeSet::new();
        for file in staged(root, self.manifest.ignore_file())? {
            let parts = components(&file);
            for depth in 1..=parts.len() {
                let prefix = PathBuf::from(parts[..depth].join("/"));
                if let Err(error) = validate_path(&prefix) {
                    if reported.insert(prefix) {
                        errors.push(error);
                    }
                    break;
                }
            }
        }
        Ok(errors)
    }

    pub fn run(&self, root: &Path, provided: &BTreeMap<String, String>) -> ChecklistReport {
        info!("running checklist for {}", root.display());

        // a staging failure also shows up as a manifest inspect error
        let path = self.path_errors(root).unwrap_or_else(|e| {
            warn!("staged names were not checked: {e}");
            validate_path(root).err().into_iter().collect()
        });
        let manifest = validate_manifest(root, &self.manifest)
            .err()
            .map(|v| v.into_inner())
            .unwrap_or_default();
        let environment = validate_environment(&self.requirements, provided)
            .err()
            .map(|v| v.into_inner())
            .unwrap_or_default();

        let notices = self
            .manifest
            .pending_resources(root)
            .into_iter()
            .map(|resource| Notice {
                message: "not present yet, created automatically on first run".to_string(),
                resource,
            })
            .collect();

        ChecklistReport {
            root: root.to_path_buf(),
            settings: self.settings.clone(),
            path,
            manifest,
            environment,
            notices,
            ignore_file: self.manifest.ignore_file().to_string(),
        }
    }
}
