use crate::checklist::Violations;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "kebab-case")]
pub enum EnvError {
    #[error("environment variable {0} is not set")]
    MissingEnvVar(String),
}

/// A variable the application reads at startup.
///
/// Any alias with a non-empty value satisfies the requirement; errors always
/// name the primary variable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnvRequirement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl EnvRequirement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// The name whose value satisfies this requirement, primary name first.
    pub fn satisfied_by<'a>(&'a self, provided: &BTreeMap<String, String>) -> Option<&'a str> {
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .find(|name| provided.get(*name).is_some_and(|v| !v.trim().is_empty()))
            .map(String::as_str)
    }
}

impl From<&str> for EnvRequirement {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Checks that every required variable has a non-empty value in `provided`.
pub fn validate_environment(
    required: &[EnvRequirement],
    provided: &BTreeMap<String, String>,
) -> Result<(), Violations<EnvError>> {
    let errors = required
        .iter()
        .filter(|requirement| match requirement.satisfied_by(provided) {
            Some(found) => {
                debug!("{} satisfied by {found}", requirement.name);
                false
            }
            None => true,
        })
        .map(|requirement| EnvError::MissingEnvVar(requirement.name.clone()))
        .collect();
    Violations::check(errors)
}
