//! predep CLI - pre-deployment checklist for hosted bot projects
//!
//! Usage: predep [OPTIONS] <COMMAND>
//!
//! Commands:
//!   check     Run every check and print the checklist
//!   path      Check that the project path is ASCII only
//!   manifest  Check required and excluded files
//!   env       Check required environment variables
//!   ignore    List (or append) excluded patterns missing from the ignore file
//!   package   Write the upload archive
//!   run       Build and start the service locally

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use predep::checklist::{validate_environment, validate_manifest, validate_path};
use predep::configuration::dotenv;
use predep::configuration::project::{DEFAULT_PROJECT_FILE, ProjectConfiguration};
use predep::configuration::runtime::RuntimeConfiguration;
use predep::deployment::{DeploymentArchiveError, DeploymentSpecs};
use predep::files::ignore::IgnoreFile;
use predep::runtime::{Runtime, RuntimeError, ShellRunner};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// predep - check a bot project before uploading and deploying it
#[derive(Parser, Debug)]
#[command(name = "predep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project configuration file, relative to the root
    #[arg(short, long, global = true, default_value = DEFAULT_PROJECT_FILE)]
    config: PathBuf,

    /// Project root directory
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct EnvironmentArgs {
    /// Local .env file, relative to the root
    #[arg(long, default_value = dotenv::DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Do not read variables from the current process environment
    #[arg(long)]
    no_process_env: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every check and print the checklist
    Check(EnvironmentArgs),

    /// Check that the project path is ASCII only
    Path,

    /// Check required and excluded files
    Manifest,

    /// Check required environment variables
    Env(EnvironmentArgs),

    /// List excluded patterns missing from the ignore file
    Ignore {
        /// Append the missing patterns
        #[arg(long)]
        write: bool,
    },

    /// Write the upload archive (staged files plus predep-runtime.toml)
    Package {
        /// Archive path
        #[arg(short, long, default_value = "predep-upload.zip")]
        output: PathBuf,

        #[command(flatten)]
        environment: EnvironmentArgs,
    },

    /// Build and start the service locally
    Run {
        /// Local .env file, relative to the root
        #[arg(long, default_value = dotenv::DEFAULT_ENV_FILE)]
        env_file: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_errors<E: std::fmt::Display>(title: &str, errors: &[E]) {
    if errors.is_empty() {
        println!("ok    {title}");
    } else {
        println!("FAIL  {title}");
        for error in errors {
            println!("      - {error}");
        }
    }
}

fn provided_variables(
    project: &ProjectConfiguration,
    root: &Path,
    args: &EnvironmentArgs,
) -> Result<BTreeMap<String, String>> {
    let env_file = resolve(root, &args.env_file);
    let local = dotenv::load(&env_file)
        .with_context(|| format!("failed to read {}", env_file.display()))?
        .unwrap_or_default();
    let process = if args.no_process_env {
        BTreeMap::new()
    } else {
        dotenv::process_environment()
    };
    Ok(dotenv::merge([
        project.deployment.environment_variables.clone(),
        local,
        process,
    ]))
}

fn check_path(root: &Path, json: bool) -> Result<bool> {
    let errors: Vec<_> = validate_path(root).err().into_iter().collect();
    if json {
        print_json(&errors)?;
    } else {
        print_errors(&format!("path {}", root.display()), &errors);
    }
    Ok(errors.is_empty())
}

/// `Ok(false)` means a check failed; errors are configuration or IO problems.
fn run(cli: Cli) -> Result<bool> {
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("project root {} not found", cli.root.display()))?;

    if matches!(cli.command, Commands::Path) {
        return check_path(&root, cli.json);
    }

    let config_path = resolve(&root, &cli.config);
    let project = ProjectConfiguration::load(&config_path)?;

    match cli.command {
        Commands::Path => check_path(&root, cli.json),
        Commands::Check(args) => {
            let provided = provided_variables(&project, &root, &args)?;
            let report = project.checklist(&root)?.run(&root, &provided);
            if cli.json {
                print_json(&report)?;
            } else {
                print!("{}", report.render());
            }
            Ok(report.passed())
        }
        Commands::Manifest => {
            let checklist = project.checklist(&root)?;
            let manifest = checklist.manifest();
            let errors = validate_manifest(&root, manifest)
                .err()
                .map(|v| v.into_inner())
                .unwrap_or_default();
            if cli.json {
                print_json(&errors)?;
            } else {
                print_errors("manifest", &errors);
                for resource in manifest.pending_resources(&root) {
                    println!("note  {resource}: created automatically on first run");
                }
            }
            Ok(errors.is_empty())
        }
        Commands::Env(args) => {
            let provided = provided_variables(&project, &root, &args)?;
            let errors = validate_environment(&project.deployment.environment.requirements(), &provided)
                .err()
                .map(|v| v.into_inner())
                .unwrap_or_default();
            if cli.json {
                print_json(&errors)?;
            } else {
                print_errors("environment", &errors);
            }
            Ok(errors.is_empty())
        }
        Commands::Ignore { write } => {
            let checklist = project.checklist(&root)?;
            let manifest = checklist.manifest();
            let mut ignore = IgnoreFile::load(&root, manifest.ignore_file())?;
            let listed = ignore.missing(manifest.excluded());

            if cli.json {
                print_json(&listed)?;
            } else if listed.is_empty() {
                println!("{} lists every excluded pattern", ignore.path().display());
            } else {
                let verb = if write { "added to" } else { "missing from" };
                println!("{verb} {}:", ignore.path().display());
                for pattern in &listed {
                    println!("  {pattern}");
                }
            }

            if write {
                ignore.append(&listed)?;
                Ok(true)
            } else {
                Ok(listed.is_empty())
            }
        }
        Commands::Package {
            output,
            environment,
        } => {
            let output = resolve(&root, &output);
            let provided = provided_variables(&project, &root, &environment)?;
            let specs = match DeploymentSpecs::prepare(project, &root, &provided) {
                Ok(specs) => specs,
                Err(DeploymentArchiveError::NotReady(report)) => {
                    if cli.json {
                        print_json(&report)?;
                    } else {
                        print!("{}", report.render());
                    }
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            };
            specs.write_archive_to(&output)?;
            if cli.json {
                print_json(&specs.files)?;
            } else {
                println!(
                    "wrote {} ({} files)",
                    output.display(),
                    specs.files.len()
                );
            }
            Ok(true)
        }
        Commands::Run { env_file } => {
            let env_file = resolve(&root, &env_file);
            let local = dotenv::load(&env_file)
                .with_context(|| format!("failed to read {}", env_file.display()))?
                .unwrap_or_default();
            let process = dotenv::merge([local, dotenv::process_environment()]);

            let mut runtime = Runtime::with_runner(
                RuntimeConfiguration::from(project),
                ShellRunner::in_directory(&root),
            );
            match runtime.launch(process) {
                Ok(code) => Ok(code == Some(0)),
                Err(RuntimeError::Environment(violations)) => {
                    print_errors("environment", violations.errors());
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
