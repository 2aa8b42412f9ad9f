use crate::checklist::environment::{EnvError, validate_environment};
use crate::checklist::Violations;
use crate::configuration::dotenv::merge;
use crate::configuration::runtime::RuntimeConfiguration;
use log::{info, warn};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("refusing to start:\n{0}")]
    Environment(#[from] Violations<EnvError>),
    #[error("failed to spawn `{script}`: {source}")]
    Spawn { script: String, source: io::Error },
    #[error("build script exited with {}", describe(.0))]
    BuildFailed(Option<i32>),
}

fn describe(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Runs one shell script to completion and returns its exit code.
pub trait CommandRunner {
    fn run(&mut self, script: &str, environment: &BTreeMap<String, String>)
    -> io::Result<Option<i32>>;
}

/// Runs scripts through `sh -c` with inherited stdio, in `directory` when set
/// and in the current directory otherwise.
#[derive(Debug, Default)]
pub struct ShellRunner {
    directory: Option<PathBuf>,
}

impl ShellRunner {
    pub fn in_directory(directory: &Path) -> Self {
        Self {
            directory: Some(directory.to_path_buf()),
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(
        &mut self,
        script: &str,
        environment: &BTreeMap<String, String>,
    ) -> io::Result<Option<i32>> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script).envs(environment);
        if let Some(directory) = &self.directory {
            command.current_dir(directory);
        }
        Ok(command.status()?.code())
    }
}

/// Launches a service from its runtime configuration: environment check,
/// then build, then start.
pub struct Runtime<R = ShellRunner> {
    configuration: RuntimeConfiguration,
    runner: R,
}

impl Runtime<ShellRunner> {
    pub fn new(configuration: RuntimeConfiguration) -> Self {
        Self::with_runner(configuration, ShellRunner::default())
    }
}

impl<R: CommandRunner> Runtime<R> {
    pub fn with_runner(configuration: RuntimeConfiguration, runner: R) -> Self {
        Self {
            configuration,
            runner,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Configured variables overridden by `process`.
    pub fn environment(&self, process: BTreeMap<String, String>) -> BTreeMap<String, String> {
        merge([self.configuration.environment_variables.clone(), process])
    }

    /// Nothing is spawned unless every required variable is present. Returns
    /// the start command's exit code.
    pub fn launch(&mut self, process: BTreeMap<String, String>) -> Result<Option<i32>, RuntimeError> {
        let environment = self.environment(process);
        validate_environment(&self.configuration.required_environment, &environment)?;

        if let Some(script) = &self.configuration.build.script {
            info!("build: {script}");
            let code = self
                .runner
                .run(script, &environment)
                .map_err(|source| RuntimeError::Spawn {
                    script: script.clone(),
                    source,
                })?;
            if code != Some(0) {
                return Err(RuntimeError::BuildFailed(code));
            }
        }

        let script = &self.configuration.execution.script;
        info!("start: {script}");
        let code = self
            .runner
            .run(script, &environment)
            .map_err(|source| RuntimeError::Spawn {
                script: script.clone(),
                source,
            })?;
        if code != Some(0) {
            warn!("start command exited with {}", describe(&code));
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::environment::EnvRequirement;
    use crate::configuration::runtime::{RuntimeBuildConfiguration, RuntimeExecutionConfiguration};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, Option<String>)>,
        build_code: Option<i32>,
    }

    impl CommandRunner for Recorder {
        fn run(
            &mut self,
            script: &str,
            environment: &BTreeMap<String, String>,
        ) -> io::Result<Option<i32>> {
            self.calls
                .push((script.to_string(), environment.get("DISCORD_TOKEN").cloned()));
            if script.starts_with("pip") {
                Ok(self.build_code)
            } else {
                Ok(Some(0))
            }
        }
    }

    fn configuration(token: Option<&str>) -> RuntimeConfiguration {
        RuntimeConfiguration {
            build: RuntimeBuildConfiguration {
                script: Some("pip install -r requirements.txt".to_string()),
            },
            execution: RuntimeExecutionConfiguration {
                script: "python main.py".to_string(),
            },
            environment_variables: token
                .map(|t| BTreeMap::from([("DISCORD_TOKEN".to_string(), t.to_string())]))
                .unwrap_or_default(),
            required_environment: vec![EnvRequirement::new("DISCORD_TOKEN")],
        }
    }

    #[test]
    fn missing_variable_spawns_nothing() {
        let mut runtime = Runtime::with_runner(configuration(None), Recorder::default());
        let err = runtime.launch(BTreeMap::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::Environment(_)));
        assert!(err.to_string().contains("DISCORD_TOKEN"));
        assert!(runtime.runner().calls.is_empty());
    }

    #[test]
    fn build_then_start_with_merged_environment() {
        let recorder = Recorder {
            build_code: Some(0),
            ..Default::default()
        };
        let mut runtime = Runtime::with_runner(configuration(Some("config")), recorder);
        let process = BTreeMap::from([("DISCORD_TOKEN".to_string(), "process".to_string())]);

        assert_eq!(runtime.launch(process).unwrap(), Some(0));
        assert_eq!(
            runtime.runner().calls,
            vec![
                (
                    "pip install -r requirements.txt".to_string(),
                    Some("process".to_string())
                ),
                ("python main.py".to_string(), Some("process".to_string())),
            ]
        );
    }

    #[test]
    fn failed_build_stops_before_start() {
        let recorder = Recorder {
            build_code: Some(1),
            ..Default::default()
        };
        let mut runtime = Runtime::with_runner(configuration(Some("config")), recorder);
        let err = runtime.launch(BTreeMap::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::BuildFailed(Some(1))));
        assert_eq!(runtime.runner().calls.len(), 1);
    }
}
