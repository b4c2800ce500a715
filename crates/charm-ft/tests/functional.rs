//! Live runs against a real Juju controller.
//!
//! These need `juju` on PATH, a bootstrapped controller and a built charm
//! under `$JUJU_REPOSITORY/builds/gitlab`. Run with:
//!
//! ```text
//! cargo test -p charm-ft --test functional -- --ignored
//! ```
#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;

fn charm_ft() -> Command {
    Command::cargo_bin("charm-ft").unwrap()
}

#[test]
#[ignore = "requires a bootstrapped Juju controller"]
fn full_suite_in_temporary_model() {
    charm_ft()
        .args(["run", "--temp-model", "--check-invocations"])
        .timeout(std::time::Duration::from_secs(3 * 60 * 60))
        .assert()
        .success()
        .stdout(predicate::str::contains("in model charm-ft-"));
}

#[test]
#[ignore = "requires a bootstrapped Juju controller"]
fn deploy_only_json_report() {
    let output = charm_ft()
        .args([
            "--json",
            "run",
            "--temp-model",
            "--only",
            "deploy",
            "--only",
            "deploy-status",
        ])
        .timeout(std::time::Duration::from_secs(60 * 60))
        .assert()
        .success();
    let report: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r["outcome"] == "passed"));
}
