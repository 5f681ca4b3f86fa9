use std::path::{Path, PathBuf};

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use updraft::config::GlobalConfig;
use updraft::test_utils::ManifestRepoFixture;

/// Isolated config file and staging directory for one test.
struct CliEnv {
    dir: TempDir,
}

impl CliEnv {
    fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn staging_dir(&self) -> PathBuf {
        self.dir.path().join("staging")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("updraft").unwrap();
        cmd.env("UPDRAFT_CONFIG_PATH", self.config_path())
            .env("UPDRAFT_NO_PROGRESS", "1")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Point the configuration at `site` with a fixed installed version.
    fn configure(&self, site: &str, installed_version: &str) {
        let staging = self.staging_dir().display().to_string();
        for (key, value) in [
            ("update.update_site", site),
            ("update.installed_version", installed_version),
            ("update.runtime_version", "17.0.2"),
            ("update.staging_dir", staging.as_str()),
        ] {
            self.cmd().args(["config", "set", key, value]).assert().success();
        }
    }
}

fn load_config(path: &Path) -> GlobalConfig {
    let content = std::fs::read_to_string(path).unwrap();
    toml::from_str(&content).unwrap()
}

#[test]
fn test_config_set_get_roundtrip() -> Result<()> {
    let env = CliEnv::new()?;

    env.cmd()
        .args(["config", "set", "update.update_site", "https://downloads.example.com/updates/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("update.update_site"));

    env.cmd()
        .args(["config", "get", "update.update_site"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://downloads.example.com/updates/"));

    env.cmd().args(["config", "path"]).assert().success().stdout(predicate::str::contains("config.toml"));
    Ok(())
}

#[test]
fn test_config_set_unknown_key_fails() -> Result<()> {
    let env = CliEnv::new()?;

    env.cmd()
        .args(["config", "set", "update.colour", "blue"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown configuration key"));
    Ok(())
}

#[test]
fn test_check_without_site_suggests_configuration() -> Result<()> {
    let env = CliEnv::new()?;

    env.cmd()
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no update site configured"))
        .stderr(predicate::str::contains("update.update_site"));
    Ok(())
}

#[test]
fn test_check_reports_up_to_date() -> Result<()> {
    let env = CliEnv::new()?;
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("1.0.0", None, None, b"current");
    env.configure(&repo.uri(), "1.0.0");

    env.cmd()
        .arg("check")
        .assert()
        .success()
        .stderr(predicate::str::contains("No updates available"));
    Ok(())
}

#[test]
fn test_silent_check_prints_nothing_when_up_to_date() -> Result<()> {
    let env = CliEnv::new()?;
    let repo = ManifestRepoFixture::new();
    env.configure(&repo.uri(), "1.0.0");

    env.cmd()
        .args(["--quiet", "check", "--silent"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No updates available").not());
    Ok(())
}

#[test]
fn test_check_installs_and_defers_restart() -> Result<()> {
    let env = CliEnv::new()?;
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("2.0.0", Some("Shiny new things"), Some("21.0"), b"release 2.0.0");
    env.configure(&repo.uri(), "1.0.0");

    env.cmd()
        .arg("check")
        .write_stdin("y\nn\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Update available"))
        .stderr(predicate::str::contains("requires a newer runtime"))
        .stderr(predicate::str::contains("Shiny new things"))
        .stdout(predicate::str::contains("Update 2.0.0 installed"));

    let staged = env.staging_dir().join("pending-update.json");
    assert!(staged.exists(), "pending update record should be written");

    env.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Staged update:"))
        .stdout(predicate::str::contains("2.0.0"));
    Ok(())
}

#[test]
fn test_check_declined_installs_nothing() -> Result<()> {
    let env = CliEnv::new()?;
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("2.0.0", None, None, b"release 2.0.0");
    env.configure(&repo.uri(), "1.0.0");

    env.cmd()
        .arg("check")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("was not installed"));

    assert!(!env.staging_dir().join("pending-update.json").exists());
    Ok(())
}

#[test]
fn test_prompt_toggles_check_on_startup() -> Result<()> {
    let env = CliEnv::new()?;
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("2.0.0", None, None, b"release 2.0.0");
    env.configure(&repo.uri(), "1.0.0");
    assert!(!load_config(&env.config_path()).update.check_on_startup);

    env.cmd()
        .arg("check")
        .write_stdin("t\nn\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Check for updates on startup: on"));

    assert!(load_config(&env.config_path()).update.check_on_startup);
    Ok(())
}

#[test]
fn test_startup_does_nothing_when_disabled() -> Result<()> {
    let env = CliEnv::new()?;
    let mut repo = ManifestRepoFixture::new();
    repo.add_update("2.0.0", None, None, b"release 2.0.0");
    env.configure(&repo.uri(), "1.0.0");

    env.cmd()
        .arg("startup")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Update available").not());
    Ok(())
}

#[test]
fn test_startup_failure_is_not_fatal() -> Result<()> {
    let env = CliEnv::new()?;
    let repo = ManifestRepoFixture::new();
    repo.write_raw_manifest("not json at all");
    env.configure(&repo.uri(), "1.0.0");
    env.cmd().args(["config", "set", "update.check_on_startup", "true"]).assert().success();

    env.cmd().arg("startup").assert().success();
    Ok(())
}

#[test]
fn test_status_without_configuration() -> Result<()> {
    let env = CliEnv::new()?;
    let staging = env.staging_dir().display().to_string();
    env.cmd().args(["config", "set", "update.staging_dir", &staging]).assert().success();

    env.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not configured"))
        .stdout(predicate::str::contains("Staged update:     none"));
    Ok(())
}

#[test]
fn test_status_flags_invalid_site() -> Result<()> {
    let env = CliEnv::new()?;
    let staging = env.staging_dir().display().to_string();
    // Written by hand; `config set` would reject the site
    std::fs::write(
        env.config_path(),
        format!("[update]\nupdate_site = \"not a uri\"\nstaging_dir = {staging:?}\n"),
    )?;

    env.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not a uri"))
        .stdout(predicate::str::contains("Invalid"))
        .stdout(predicate::str::contains("not configured").not());
    Ok(())
}
