#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn charm_ft(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("charm-ft").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("JUJU_MODEL")
        .env_remove("JUJU_BINARY")
        .env_remove("CHARM_FT_CONFIG")
        .env("JUJU_REPOSITORY", dir.path());
    cmd
}

/// Write an executable stand-in for `juju` that reports `app_status` for a
/// one-unit gitlab application and answers `juju run` with `echo test`.
#[cfg(unix)]
fn fake_juju(dir: &TempDir, app_status: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        r#"#!/bin/sh
case "$1" in
  status)
    cat <<'JSON'
{{"model": {{"name": "ci"}}, "applications": {{"gitlab-bionic-local": {{
  "charm": "local:bionic/gitlab-0",
  "application-status": {{"current": "{app_status}"}},
  "units": {{"gitlab-bionic-local/0": {{
    "workload-status": {{"current": "{app_status}"}},
    "juju-status": {{"current": "idle"}}
  }}}}
}}}}}}
JSON
    ;;
  run)
    cat <<'JSON'
[{{"UnitId": "gitlab-bionic-local/0", "ReturnCode": 0, "Stdout": "test"}}]
JSON
    ;;
  *)
    exit 0
    ;;
esac
"#
    );
    let path = dir.path().join("juju");
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn write_config(dir: &TempDir, yaml: &str) -> PathBuf {
    let path = dir.path().join("charm-ft.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ---------------------------------------------------------------------------
// charm-ft scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenarios_lists_all_in_order() {
    let dir = TempDir::new().unwrap();
    let output = charm_ft(&dir).arg("scenarios").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();

    let deploy = stdout.find("deploy-status").unwrap();
    let unrelate = stdout.find("postgresql-unrelate").unwrap();
    let mysql = stdout.find("mysql-relate").unwrap();
    assert!(deploy < unrelate && unrelate < mysql);
    assert!(stdout.contains("xfail"));
}

#[test]
fn scenarios_json() {
    let dir = TempDir::new().unwrap();
    let output = charm_ft(&dir)
        .args(["scenarios", "--json"])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    let list = value.as_array().unwrap();
    assert_eq!(list.len(), 13);
    assert_eq!(list[0]["scenario"], "deploy");
    assert_eq!(list[7]["scenario"], "upgrade");
    assert_eq!(list[7]["skip"], "local_variant");
    assert_eq!(list[12]["expectation"], "fail");
}

// ---------------------------------------------------------------------------
// charm-ft matrix
// ---------------------------------------------------------------------------

#[test]
fn matrix_defaults_to_local_bionic() {
    let dir = TempDir::new().unwrap();
    charm_ft(&dir)
        .args(["--repository", "/srv/charms/", "matrix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gitlab-bionic-local"))
        .stdout(predicate::str::contains("/srv/charms/builds/gitlab"));
}

#[test]
fn matrix_uses_repository_env() {
    let dir = TempDir::new().unwrap();
    let output = charm_ft(&dir)
        .args(["matrix", "-j"])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    let expected = format!("{}/builds/gitlab", dir.path().display());
    assert_eq!(value["local_build"], expected.as_str());
    assert_eq!(value["cases"][0]["application"], "gitlab-bionic-local");
    assert_eq!(value["cases"][0]["location"], expected.as_str());
}

#[test]
fn matrix_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
series:
  - name: bionic
  - name: cosmic
    canary: true
sources:
  - kind: local
  - kind: jujucharms
    location: cs:~pirate-charmers/gitlab
"#,
    );
    let output = charm_ft(&dir)
        .args(["--config", arg(&config), "matrix", "--json"])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    let cases = value["cases"].as_array().unwrap();
    assert_eq!(cases.len(), 4);
    assert_eq!(cases[1]["application"], "gitlab-bionic-jujucharms");
    assert_eq!(cases[1]["location"], "cs:~pirate-charmers/gitlab");
    assert_eq!(cases[3]["expected_failure"], true);
}

#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "sources:\n  - kind: jujucharms\n");
    charm_ft(&dir)
        .args(["--config", arg(&config), "matrix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires a location"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    charm_ft(&dir)
        .args(["--config", "nope.yaml", "matrix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

// ---------------------------------------------------------------------------
// charm-ft run
// ---------------------------------------------------------------------------

#[test]
fn run_rejects_unknown_scenario() {
    let dir = TempDir::new().unwrap();
    charm_ft(&dir)
        .args(["run", "--only", "teardown"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown scenario"));
}

#[test]
fn run_rejects_unknown_series() {
    let dir = TempDir::new().unwrap();
    charm_ft(&dir)
        .args(["--juju", "/bin/true", "run", "--series", "xenial"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown series 'xenial'"));
}

#[test]
fn keep_model_requires_temp_model() {
    let dir = TempDir::new().unwrap();
    charm_ft(&dir)
        .args(["run", "--keep-model"])
        .assert()
        .failure();
}

#[test]
fn run_fails_when_juju_cannot_start() {
    let dir = TempDir::new().unwrap();
    charm_ft(&dir)
        .args(["--juju", "/nonexistent/juju", "run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to connect to model"));
}

#[cfg(unix)]
#[test]
fn run_command_scenario_passes_against_fake_juju() {
    let dir = TempDir::new().unwrap();
    let juju = fake_juju(&dir, "blocked");
    charm_ft(&dir)
        .args(["--juju", arg(&juju), "run", "--only", "run-command", "--timeout", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("run-command"))
        .stdout(predicate::str::contains("1 passed in model ci"));
}

#[cfg(unix)]
#[test]
fn run_json_report() {
    let dir = TempDir::new().unwrap();
    let juju = fake_juju(&dir, "blocked");
    let output = charm_ft(&dir)
        .args([
            "--juju",
            arg(&juju),
            "--json",
            "run",
            "--only",
            "deploy-status",
            "--only",
            "upgrade",
            "--timeout",
            "1",
        ])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(value["model"], "ci");
    let results = value["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["scenario"], "deploy-status");
    assert_eq!(results[0]["outcome"], "passed");
    assert_eq!(results[1]["outcome"], "skipped");
}

#[cfg(unix)]
#[test]
fn run_exits_non_zero_when_application_is_in_error() {
    let dir = TempDir::new().unwrap();
    let juju = fake_juju(&dir, "error");
    charm_ft(&dir)
        .args(["--juju", arg(&juju), "run", "--only", "deploy-status", "--timeout", "1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("application gitlab-bionic-local is in error"))
        .stderr(predicate::str::contains("1 scenario(s) failed"));
}
