use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const PROJECT: &str = r#"
[service]
name = "vc-bot"

[deployment.runtime]
execute = "python main.py"

[deployment.files]
required = ["main.py", "requirements.txt"]
"#;

fn predep(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_predep"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("DISCORD_TOKEN")
        .env_remove("TOKEN")
        .env_remove("BOT_TOKEN")
        .env_remove("DISCORD_BOT_TOKEN")
        .output()
        .unwrap()
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("predep.toml"), PROJECT).unwrap();
    fs::write(dir.path().join("main.py"), "").unwrap();
    fs::write(dir.path().join("requirements.txt"), "discord.py\n").unwrap();
    fs::write(dir.path().join(".gitignore"), ".env\n").unwrap();
    dir
}

#[test]
fn check_passes_with_token_from_env_file() {
    let dir = project();
    fs::write(dir.path().join(".env"), "DISCORD_TOKEN=\"abc\"\n").unwrap();

    let output = predep(dir.path(), &["check"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "{stdout}");
    assert!(stdout.contains("ready to deploy"));
}

#[test]
fn env_reports_missing_token_as_json() {
    let dir = project();
    let output = predep(dir.path(), &["env", "--json"]);
    assert_eq!(output.status.code(), Some(1));

    let errors: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(errors[0]["kind"], "missing-env-var");
    assert_eq!(errors[0]["name"], "DISCORD_TOKEN");
}

#[test]
fn manifest_flags_backup_file() {
    let dir = project();
    fs::write(dir.path().join("main.py.bak"), "").unwrap();

    let output = predep(dir.path(), &["manifest"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout.contains("main.py.bak"), "{stdout}");
}

#[test]
fn ignore_write_then_list_is_clean() {
    let dir = project();
    let output = predep(dir.path(), &["ignore"]);
    assert_eq!(output.status.code(), Some(1));

    let output = predep(dir.path(), &["ignore", "--write"]);
    assert_eq!(output.status.code(), Some(0));
    let written = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
    assert!(written.starts_with(".env\n"));
    assert!(written.contains("__pycache__/\n"));

    let output = predep(dir.path(), &["ignore"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn missing_configuration_exits_with_two() {
    let dir = TempDir::new().unwrap();
    let output = predep(dir.path(), &["check"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("predep.toml"));
}

#[test]
fn path_needs_no_configuration() {
    let dir = TempDir::new().unwrap();
    let output = predep(dir.path(), &["path"]);
    assert_eq!(output.status.code(), Some(0));
}

fn archive_names(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

#[test]
fn package_writes_archive_without_local_secrets() {
    let dir = project();
    fs::write(dir.path().join(".env"), "DISCORD_TOKEN=abc\n").unwrap();

    let output = predep(dir.path(), &["package"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "{stdout}");

    assert_eq!(
        archive_names(&dir.path().join("predep-upload.zip")),
        vec![".gitignore", "main.py", "requirements.txt", "predep-runtime.toml"]
    );
}

#[test]
fn package_refuses_unready_project() {
    let dir = project();
    let output = predep(dir.path(), &["package"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "{stdout}");
    assert!(stdout.contains("DISCORD_TOKEN"));
    assert!(!dir.path().join("predep-upload.zip").exists());
}

#[test]
fn run_without_token_starts_nothing() {
    let dir = project();
    fs::write(
        dir.path().join("predep.toml"),
        r#"
[service]
name = "vc-bot"

[deployment.build]
script = "touch built"

[deployment.runtime]
execute = "touch started"
"#,
    )
    .unwrap();

    let output = predep(dir.path(), &["run"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "{stdout}");
    assert!(stdout.contains("DISCORD_TOKEN"));
    assert!(!dir.path().join("built").exists());
    assert!(!dir.path().join("started").exists());
}

#[test]
fn run_builds_then_starts_in_the_project_root() {
    let dir = project();
    fs::write(dir.path().join(".env"), "DISCORD_TOKEN=abc\n").unwrap();
    fs::write(
        dir.path().join("predep.toml"),
        r#"
[service]
name = "vc-bot"

[deployment.build]
script = "touch built"

[deployment.runtime]
execute = "test -f built && touch started"
"#,
    )
    .unwrap();

    let output = predep(dir.path(), &["run"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(dir.path().join("started").exists());
}
