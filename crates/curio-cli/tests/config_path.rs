use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use curio_core::config::Config;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("curio")
        .env("CURIO_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("curio")
        .env("CURIO_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("[auth]"));

    // The written template is exactly the built-in defaults.
    assert_eq!(Config::load_from(&config_path).unwrap(), Config::default());
}

#[test]
fn test_config_path_follows_curio_home() {
    let dir = tempdir().unwrap();
    let home = dir.path().join("nested").join("curio");
    let expected = home.join("config.toml");

    cargo_bin_cmd!("curio")
        .env("CURIO_HOME", &home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));

    assert!(expected.exists());
    assert!(!home.join("config.toml.tmp").exists());
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "# existing config").unwrap();

    cargo_bin_cmd!("curio")
        .env("CURIO_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "[auth\nurl = ").unwrap();

    cargo_bin_cmd!("curio")
        .env("CURIO_HOME", dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("load config"));
}
