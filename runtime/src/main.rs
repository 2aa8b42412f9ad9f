//! Service entry point on the hosting side: reads `predep-runtime.toml` from
//! the working directory, checks the environment, then builds and starts.

use anyhow::{Context, Result};
use log::error;
use predep::configuration::dotenv;
use predep::configuration::runtime::{RUNTIME_FILE, RuntimeConfiguration};
use predep::runtime::{Runtime, RuntimeError};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn launch() -> Result<ExitCode> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| RUNTIME_FILE.to_string());
    let configuration = RuntimeConfiguration::load(Path::new(&path))?;

    let local = dotenv::load(Path::new(dotenv::DEFAULT_ENV_FILE))
        .context("failed to read .env")?
        .unwrap_or_default();
    let process = dotenv::merge([local, dotenv::process_environment()]);

    match Runtime::new(configuration).launch(process) {
        Ok(Some(0)) => Ok(ExitCode::SUCCESS),
        Ok(Some(code)) => Ok(ExitCode::from(u8::try_from(code).unwrap_or(1))),
        Ok(None) => Ok(ExitCode::FAILURE),
        Err(RuntimeError::Environment(violations)) => {
            error!("{violations}");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    launch().unwrap_or_else(|e| {
        error!("{e:#}");
        ExitCode::FAILURE
    })
}
