use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn depsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("depsync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("DEPSYNC_AIRTABLE_TOKEN")
        .env_remove("DEPSYNC_AIRTABLE_BASE_ID")
        .env_remove("RUST_LOG");
    cmd
}

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/graph.json")
}

#[test]
fn graph_dump_keeps_only_targeted_issues() {
    let home = TempDir::new().expect("home");

    let assert = depsync_cmd(home.path())
        .args(["graph", "dump", "moul/depviz", "--graph"])
        .arg(fixture())
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let issues: serde_json::Value = serde_json::from_str(&stdout).expect("dump is json");

    let urls: Vec<&str> = issues
        .as_array()
        .expect("array of issues")
        .iter()
        .filter_map(|i| i["url"].as_str())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://github.com/moul/depviz/issues/1",
            "https://github.com/moul/depviz/issues/2",
        ]
    );
}

#[test]
fn graph_dump_rejects_an_empty_target() {
    let home = TempDir::new().expect("home");
    depsync_cmd(home.path())
        .args(["graph", "dump", "", "--graph"])
        .arg(fixture())
        .assert()
        .failure()
        .stderr(contains("invalid target"));
}

#[test]
fn sync_without_credentials_fails_before_reading_the_graph() {
    let home = TempDir::new().expect("home");
    depsync_cmd(home.path())
        .args(["sync", "--graph", "/nonexistent/graph.json"])
        .assert()
        .failure()
        .stderr(contains("missing airtable base id"));
}

#[test]
fn sync_takes_the_token_from_the_environment() {
    let home = TempDir::new().expect("home");
    depsync_cmd(home.path())
        .env("DEPSYNC_AIRTABLE_TOKEN", "pat123")
        .args(["sync", "--airtable-base-id", "appXYZ", "--graph", "/nonexistent/graph.json"])
        .assert()
        .failure()
        .stderr(contains("failed to load graph").and(contains("missing airtable").not()));
}

#[test]
fn config_init_writes_defaults_once() {
    let home = TempDir::new().expect("home");
    let path = home.path().join(".depsync").join("config.yaml");

    depsync_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(contains("Wrote default config"));
    let written = fs::read_to_string(&path).expect("config written");
    assert!(written.contains("Issues and PRs"));
    assert!(written.contains("destroy_invalid_records: false"));

    depsync_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(contains("--force"));
}

#[test]
fn config_show_redacts_the_token() {
    let home = TempDir::new().expect("home");
    let path = home.path().join("custom.yaml");
    fs::write(
        &path,
        "airtable:\n  base_id: appXYZ\n  token: super-secret\n  tables:\n    issues: Tickets\n",
    )
    .expect("write config");

    depsync_cmd(home.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            contains("base_id: appXYZ")
                .and(contains("issues: Tickets"))
                .and(contains("super-secret").not()),
        );
}
