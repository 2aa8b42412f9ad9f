use crate::checklist::ChecklistReport;
use crate::configuration::dotenv::DEFAULT_ENV_FILE;
use crate::configuration::project::{ConfigurationError, ProjectConfiguration};
use crate::configuration::runtime::{RUNTIME_FILE, RuntimeConfiguration};
use crate::files::pattern::components;
use crate::files::staging::{StagingError, staged};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum DeploymentArchiveError {
    NotReady(Box<ChecklistReport>),
    ConfigurationError(#[from] ConfigurationError),
    StagingError(#[from] StagingError),
    ZipError(#[from] ZipError),
    RuntimeFileError(#[from] toml::ser::Error),
    CopyError(#[from] io::Error),
}

impl Display for DeploymentArchiveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReady(report) => write!(
                f,
                "project is not ready to upload ({} problem(s))",
                report.problem_count()
            ),
            other => std::fmt::Debug::fmt(other, f),
        }
    }
}

/// A checked project and the files that would be uploaded.
#[derive(Debug)]
pub struct DeploymentSpecs {
    pub project: ProjectConfiguration,
    pub root: PathBuf,
    /// Staged files, relative to `root`.
    pub files: Vec<PathBuf>,
}

impl DeploymentSpecs {
    /// Runs the checklist against `provided` and lists the staged files.
    /// Refuses a project that does not pass.
    ///
    /// The configuration file, the local `.env` and any stale runtime file are
    /// never archived, whatever the ignore file says.
    pub fn prepare(
        project: ProjectConfiguration,
        root: &Path,
        provided: &BTreeMap<String, String>,
    ) -> Result<Self, DeploymentArchiveError> {
        let checklist = project.checklist(root)?;
        let report = checklist.run(root, provided);
        if !report.passed() {
            return Err(DeploymentArchiveError::NotReady(Box::new(report)));
        }

        let private: Vec<PathBuf> = project
            .source_in(root)
            .into_iter()
            .chain([PathBuf::from(DEFAULT_ENV_FILE), PathBuf::from(RUNTIME_FILE)])
            .collect();
        let mut files = staged(root, checklist.manifest().ignore_file())?;
        files.retain(|file| {
            let archived = !private.contains(file);
            if !archived {
                debug!("keeping {} out of the archive", file.display());
            }
            archived
        });
        info!("{} files staged for {}", files.len(), project.service.name);

        Ok(Self {
            project,
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn runtime(&self) -> RuntimeConfiguration {
        RuntimeConfiguration::from(self.project.clone())
    }

    /// Zip the staged files plus the redacted runtime file. Paths in
    /// `excludes` are skipped when they resolve to a staged file.
    pub fn write_archive<T: Write + Seek, P: AsRef<Path>>(
        &self,
        writer: T,
        excludes: Vec<P>,
    ) -> Result<(), DeploymentArchiveError> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default();

        let excludes: Vec<PathBuf> = excludes
            .iter()
            .filter_map(|p| p.as_ref().canonicalize().ok())
            .collect();

        for rel in &self.files {
            let full = self.root.join(rel);
            if let Ok(canonical) = full.canonicalize() {
                if excludes.contains(&canonical) {
                    debug!("not archiving {}", rel.display());
                    continue;
                }
            }

            zip.start_file(components(rel).join("/"), options)?;
            let mut source = File::open(&full)?;
            io::copy(&mut source, &mut zip)?;
        }

        zip.start_file(RUNTIME_FILE, options)?;
        zip.write_all(self.runtime().to_toml_redacted()?.as_bytes())?;

        zip.finish()?;
        Ok(())
    }

    /// Write the archive to `output` through a temporary file.
    pub fn write_archive_to(&self, output: &Path) -> Result<(), DeploymentArchiveError> {
        let archive_tmp_path = std::env::temp_dir()
            .join("predep-archive")
            .join(uuid::Uuid::new_v4().to_string());

        if let Some(parent) = archive_tmp_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let archive_tmp = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&archive_tmp_path)?;

        let written = self.write_archive(archive_tmp, vec![output]);
        let copied = written.and_then(|()| {
            std::fs::copy(&archive_tmp_path, output)?;
            Ok(())
        });
        let _ = std::fs::remove_file(&archive_tmp_path);
        copied?;

        info!("wrote {}", output.display());
        Ok(())
    }
}
