use crate::checklist::Checklist;
use crate::checklist::manifest::ManifestBuildError;
use crate::configuration::deployment::DeploymentConfiguration;
use crate::configuration::service::ServiceConfiguration;
use crate::files::pattern::literal;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PROJECT_FILE: &str = "predep.toml";

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {field} in {}: {reason}", .path.display())]
    Invalid {
        path: PathBuf,
        field: &'static str,
        reason: String,
    },
    #[error("invalid file manifest: {0}")]
    Manifest(#[from] ManifestBuildError),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectConfiguration {
    pub service: ServiceConfiguration,
    pub deployment: DeploymentConfiguration,
    /// The file this configuration was read from.
    #[serde(skip)]
    pub source: PathBuf,
}

impl ProjectConfiguration {
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &content)
    }

    /// Parse `content` as the file at `path`.
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigurationError> {
        let mut configuration =
            toml::from_str::<Self>(content).map_err(|source| ConfigurationError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let invalid = |field, reason: &str| ConfigurationError::Invalid {
            path: path.to_path_buf(),
            field,
            reason: reason.to_string(),
        };
        if configuration.service.name.trim().is_empty() {
            return Err(invalid("service.name", "must not be empty"));
        }
        if configuration.service.branch.trim().is_empty() {
            return Err(invalid("service.branch", "must not be empty"));
        }
        if configuration.deployment.runtime.execute.trim().is_empty() {
            return Err(invalid("deployment.runtime.execute", "start command must not be empty"));
        }
        if configuration
            .deployment
            .build
            .script
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            return Err(invalid("deployment.build.script", "must not be empty when set"));
        }

        configuration.source = path.to_path_buf();
        debug!("loaded project {}", configuration.service.name);
        Ok(configuration)
    }

    /// The configuration file relative to `root`, when it lives under it.
    /// A relative source is taken as relative to `root` already.
    pub fn source_in(&self, root: &Path) -> Option<PathBuf> {
        if self.source.as_os_str().is_empty() {
            return None;
        }
        if self.source.is_relative() {
            return Some(self.source.clone());
        }
        if let Ok(rel) = self.source.strip_prefix(root) {
            return Some(rel.to_path_buf());
        }
        let source = self.source.canonicalize().ok()?;
        let root = root.canonicalize().ok()?;
        source.strip_prefix(root).ok().map(Path::to_path_buf)
    }

    /// Whether the file stores a non-empty platform variable.
    pub fn holds_secrets(&self) -> bool {
        self.deployment
            .environment_variables
            .values()
            .any(|value| !value.trim().is_empty())
    }

    /// Named settings entered on the hosting platform's service form.
    pub fn settings(&self) -> BTreeMap<String, String> {
        let mut settings = BTreeMap::new();
        settings.insert("service name".to_string(), self.service.name.clone());
        if let Some(region) = &self.service.region {
            settings.insert("region".to_string(), region.clone());
        }
        settings.insert("branch".to_string(), self.service.branch.clone());
        if let Some(script) = &self.deployment.build.script {
            settings.insert("build command".to_string(), script.clone());
        }
        settings.insert(
            "start command".to_string(),
            self.deployment.runtime.execute.clone(),
        );
        settings
    }

    /// The checklist for this project under `root`. A configuration file
    /// holding secrets must itself stay out of the upload.
    pub fn checklist(&self, root: &Path) -> Result<Checklist, ConfigurationError> {
        let mut manifest = self.deployment.manifest_builder();
        if self.holds_secrets() {
            if let Some(rel) = self.source_in(root) {
                debug!("{} holds secrets, excluding it", rel.display());
                manifest = manifest.excluded([literal(&rel)]);
            }
        }
        Ok(
            Checklist::new(manifest.build()?, self.deployment.environment.requirements())
                .with_settings(self.settings()),
        )
    }
}
