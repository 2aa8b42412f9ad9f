use crate::checklist::environment::EnvRequirement;
use crate::checklist::manifest::{FileManifest, ManifestBuildError, ManifestBuilder};
use crate::files::ignore::DEFAULT_IGNORE_FILE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct DeploymentRuntime {
    /// Start command of the web service.
    pub execute: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct DeploymentBuild {
    /// Build command, run once before the start command.
    #[serde(default)]
    pub script: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeploymentFiles {
    #[serde(default = "DeploymentFiles::default_required")]
    pub required: Vec<String>,
    #[serde(default = "DeploymentFiles::default_excluded")]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub cogs: Vec<String>,
    #[serde(default = "DeploymentFiles::default_generated")]
    pub generated: Vec<String>,
    #[serde(rename = "ignore-file", default = "DeploymentFiles::default_ignore_file")]
    pub ignore_file: String,
}

impl Default for DeploymentFiles {
    fn default() -> Self {
        Self {
            required: Self::default_required(),
            excluded: Self::default_excluded(),
            cogs: Vec::new(),
            generated: Self::default_generated(),
            ignore_file: Self::default_ignore_file(),
        }
    }
}

impl DeploymentFiles {
    fn default_required() -> Vec<String> {
        strings(&["main.py", "requirements.txt", "database.py", "cogs/"])
    }

    fn default_excluded() -> Vec<String> {
        strings(&[
            "*.bak",
            "*.backup",
            "*.bat",
            "*.cmd",
            "__pycache__/",
            "logs/",
            "*.log",
            "data/",
            ".env",
        ])
    }

    fn default_generated() -> Vec<String> {
        strings(&["logs/", "data/"])
    }

    fn default_ignore_file() -> String {
        DEFAULT_IGNORE_FILE.to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeploymentDependencies {
    #[serde(default = "DeploymentDependencies::default_file")]
    pub file: String,
    #[serde(default)]
    pub packages: Vec<String>,
}

impl Default for DeploymentDependencies {
    fn default() -> Self {
        Self {
            file: Self::default_file(),
            packages: Vec::new(),
        }
    }
}

impl DeploymentDependencies {
    fn default_file() -> String {
        "requirements.txt".to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeploymentEnvironment {
    #[serde(default = "DeploymentEnvironment::default_required")]
    pub required: Vec<String>,
    #[serde(default = "DeploymentEnvironment::default_aliases")]
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Default for DeploymentEnvironment {
    fn default() -> Self {
        Self {
            required: Self::default_required(),
            aliases: Self::default_aliases(),
        }
    }
}

impl DeploymentEnvironment {
    fn default_required() -> Vec<String> {
        strings(&["DISCORD_TOKEN"])
    }

    fn default_aliases() -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([(
            "DISCORD_TOKEN".to_string(),
            strings(&["TOKEN", "BOT_TOKEN", "DISCORD_BOT_TOKEN"]),
        )])
    }

    pub fn requirements(&self) -> Vec<EnvRequirement> {
        self.required
            .iter()
            .map(|name| {
                EnvRequirement::new(name.as_str())
                    .with_aliases(self.aliases.get(name).cloned().unwrap_or_default())
            })
            .collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeploymentConfiguration {
    pub runtime: DeploymentRuntime,
    #[serde(default)]
    pub build: DeploymentBuild,
    #[serde(default)]
    pub files: DeploymentFiles,
    #[serde(default)]
    pub dependencies: DeploymentDependencies,
    #[serde(default)]
    pub environment: DeploymentEnvironment,
    /// Values configured on the hosting platform.
    #[serde(rename = "environment-variables", default)]
    pub environment_variables: BTreeMap<String, String>,
}

impl DeploymentConfiguration {
    pub fn manifest(&self) -> Result<FileManifest, ManifestBuildError> {
        self.manifest_builder().build()
    }

    pub fn manifest_builder(&self) -> ManifestBuilder {
        let mut builder = FileManifest::builder()
            .required(&self.files.required)
            .excluded(&self.files.excluded)
            .cogs(&self.files.cogs)
            .generated(&self.files.generated)
            .ignore_file(&self.files.ignore_file);
        if !self.dependencies.packages.is_empty() {
            builder =
                builder.dependencies(&self.dependencies.file, self.dependencies.packages.clone());
        }
        builder
    }
}
