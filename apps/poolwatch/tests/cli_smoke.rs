use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("poolwatch"));
    cmd.env_remove("POOLWATCH_PG_URL")
        .env_remove("POOLWATCH_LEDGER_URL")
        .env_remove("POOLWATCH_ORACLE_URL")
        .env_remove("POOLWATCH_SUBNET_NAME")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_command_groups() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validator"))
        .stdout(predicate::str::contains("ledger"))
        .stdout(predicate::str::contains("archive"));
}

#[test]
fn identity_show_is_stable_across_invocations() {
    let dir = tempdir().unwrap();
    let state_dir = dir.path().join("state");

    let first = cmd()
        .arg("--state-dir")
        .arg(&state_dir)
        .args(["identity", "show"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let second = cmd()
        .arg("--state-dir")
        .arg(&state_dir)
        .args(["identity", "show"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let first: serde_json::Value = serde_json::from_slice(&first).unwrap();
    let second: serde_json::Value = serde_json::from_slice(&second).unwrap();
    assert_eq!(first["identity_key"], second["identity_key"]);
    assert_eq!(first["identity_key"].as_str().unwrap().len(), 64);
    assert!(state_dir.join("validator_seed.hex").exists());
}

#[test]
fn config_show_applies_file_env_and_flag_overrides() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("poolwatch.json");
    fs::write(&config, r#"{"subnet_name":"pools","sample_size":3}"#).unwrap();

    let out = cmd()
        .env("POOLWATCH_ORACLE_URL", "http://oracle.test:9000")
        .arg("--config")
        .arg(&config)
        .args(["--pg-url", "postgres://flag:s3cret@db/pw", "config", "show"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let settings: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(settings["subnet_name"], "pools");
    assert_eq!(settings["sample_size"], 3);
    assert_eq!(settings["max_allowed_weights"], 420);
    assert_eq!(settings["oracle_url"], "http://oracle.test:9000");
    assert_eq!(settings["database_url"], "postgres://flag:***@db/pw");
    assert!(!String::from_utf8_lossy(&out).contains("s3cret"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();
    cmd()
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.json"));
}

#[test]
fn unknown_event_kind_is_rejected_by_the_parser() {
    cmd()
        .args(["archive", "count", "0xa", "0xb", "500", "--kind", "flash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("flash"));
}

#[test]
fn ledger_commands_report_unreachable_database() {
    cmd()
        .args(["--pg-url", "postgres://postgres@127.0.0.1:1/none", "ledger", "windows"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("connect postgres"));
}
