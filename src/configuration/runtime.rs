use crate::checklist::environment::EnvRequirement;
use crate::configuration::project::{ConfigurationError, ProjectConfiguration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const RUNTIME_FILE: &str = "predep-runtime.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RuntimeBuildConfiguration {
    pub script: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RuntimeExecutionConfiguration {
    pub script: String,
}

/// What the service needs at launch, shipped next to the uploaded sources.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfiguration {
    pub build: RuntimeBuildConfiguration,
    pub execution: RuntimeExecutionConfiguration,
    #[serde(rename = "environment-variables", default)]
    pub environment_variables: BTreeMap<String, String>,
    #[serde(rename = "required-environment", default)]
    pub required_environment: Vec<EnvRequirement>,
}

impl RuntimeConfiguration {
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigurationError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serialised without secret values, which stay on the hosting platform.
    pub fn to_toml_redacted(&self) -> Result<String, toml::ser::Error> {
        let mut redacted = self.clone();
        redacted.environment_variables.clear();
        toml::to_string(&redacted)
    }
}

impl From<ProjectConfiguration> for RuntimeConfiguration {
    fn from(value: ProjectConfiguration) -> Self {
        Self {
            required_environment: value.deployment.environment.requirements(),
            build: RuntimeBuildConfiguration {
                script: value.deployment.build.script,
            },
            execution: RuntimeExecutionConfiguration {
                script: value.deployment.runtime.execute,
            },
            environment_variables: value.deployment.environment_variables,
        }
    }
}
