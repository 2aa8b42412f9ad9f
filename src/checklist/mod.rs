//! Pre-upload checks: project path, file manifest and environment.

pub mod dependencies;
pub mod environment;
pub mod manifest;
pub mod path;
pub mod report;

pub use environment::{EnvError, EnvRequirement, validate_environment};
pub use manifest::{FileManifest, ManifestError, validate_manifest};
pub use path::{PathError, validate_path};
pub use report::{Checklist, ChecklistReport, Notice};

use serde::Serialize;
use std::fmt::{Debug, Display, Formatter};

/// Every error a validator found, in report order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations<E>(Vec<E>);

impl<E> Violations<E> {
    /// `Ok` when `errors` is empty.
    pub fn check(errors: Vec<E>) -> Result<(), Self> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self(errors))
        }
    }

    pub fn errors(&self) -> &[E] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<E> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<E: Display> Display for Violations<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl<E: Debug + Display> std::error::Error for Violations<E> {}
