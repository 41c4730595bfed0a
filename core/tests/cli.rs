use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn help_shows_usage() {
    let mut cmd = Command::cargo_bin("proofai").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ProofAI client"))
        .stdout(predicate::str::contains("submit"));
}

#[test]
fn version_shows_version() {
    let mut cmd = Command::cargo_bin("proofai").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn create_config_writes_toml() {
    let temp = tempdir().unwrap();
    let output = temp.path().join("proofai.toml");
    let mut cmd = Command::cargo_bin("proofai").unwrap();
    cmd.arg("create-config")
        .arg("--output")
        .arg(output.to_str().unwrap())
        .arg("--env")
        .arg("production")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("api_base_url"));
    assert!(written.contains("request_timeout_secs = 120"));
}

#[test]
fn submit_requires_both_cids() {
    let mut cmd = Command::cargo_bin("proofai").unwrap();
    cmd.arg("submit")
        .arg("--model-cid")
        .arg("QmModel")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dataset-cid"));
}

#[test]
fn malformed_service_address_fails() {
    let temp = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("proofai").unwrap();
    cmd.current_dir(temp.path())
        .arg("--data-dir")
        .arg(temp.path().join("data").to_str().unwrap())
        .arg("--service-addr")
        .arg("not-an-address")
        .arg("mining")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid service address"));
}
