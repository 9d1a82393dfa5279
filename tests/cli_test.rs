// End-to-end tests for the declgraph binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// The binary with a scratch cache and no config file
fn declgraph(scratch: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("declgraph").unwrap();
    cmd.arg("--config")
        .arg(scratch.path().join("declgraph.toml"))
        .arg("--cache-dir")
        .arg(scratch.path().join("cache"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version() {
    let scratch = TempDir::new().unwrap();
    declgraph(&scratch)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("declgraph "));
}

#[test]
fn test_build_summary() {
    let scratch = TempDir::new().unwrap();
    declgraph(&scratch)
        .arg("build")
        .arg(fixtures_path("two_modules/a.py"))
        .arg(fixtures_path("two_modules/b.py"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 2 modules"))
        .stdout(predicate::str::contains("Unresolved").not());
}

#[test]
fn test_build_requires_paths() {
    let scratch = TempDir::new().unwrap();
    declgraph(&scratch).arg("build").assert().failure();
}

#[test]
fn test_build_syntax_error_fails_outside_silent_mode() {
    let scratch = TempDir::new().unwrap();
    let bad = scratch.path().join("bad.py");
    std::fs::write(&bad, "def broken(:\n").unwrap();

    declgraph(&scratch)
        .arg("build")
        .arg(&bad)
        .assert()
        .success()
        .stdout(predicate::str::contains("Failures (1)"));

    declgraph(&scratch)
        .args(["--follow-imports", "normal", "build"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("syntax error at line 1"));
}

#[test]
fn test_snapshot_then_load_against_previous() {
    let scratch = TempDir::new().unwrap();
    let a_json = scratch.path().join("a.json");
    let b_json = scratch.path().join("out/b.json");

    declgraph(&scratch)
        .args(["--follow-imports", "skip", "snapshot"])
        .arg(fixtures_path("two_modules/a.py"))
        .arg("-o")
        .arg(&a_json)
        .assert()
        .success()
        .stdout(predicate::str::contains("Snapshot written to"));

    declgraph(&scratch)
        .args(["--follow-imports", "skip", "snapshot"])
        .arg(fixtures_path("two_modules/b.py"))
        .arg("-o")
        .arg(&b_json)
        .assert()
        .success();
    assert!(b_json.is_file());

    // b on its own cannot see a.Base
    declgraph(&scratch)
        .arg("load")
        .arg(&b_json)
        .assert()
        .success()
        .stdout(predicate::str::contains("b: b.Child -> a.Base"));

    declgraph(&scratch)
        .arg("load")
        .arg(&b_json)
        .arg("--previous")
        .arg(&a_json)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 1 modules"))
        .stdout(predicate::str::contains("Unresolved").not());
}

#[test]
fn test_load_missing_snapshot() {
    let scratch = TempDir::new().unwrap();
    declgraph(&scratch)
        .arg("load")
        .arg(scratch.path().join("nothing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_docstrings() {
    let scratch = TempDir::new().unwrap();
    declgraph(&scratch)
        .arg("docstrings")
        .arg(fixtures_path("docs.py"))
        .args(["--module", "docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"docs.C.m\""))
        .stdout(predicate::str::contains("\"docs.f\": \"Function doc.\""))
        .stdout(predicate::str::contains("\"docs.C\":").not());
}

#[test]
fn test_lookup_found_and_missing() {
    let scratch = TempDir::new().unwrap();
    declgraph(&scratch)
        .arg("lookup")
        .arg(fixtures_path("two_modules/a.py"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"fullname\": \"a.Base\""));

    declgraph(&scratch)
        .arg("lookup")
        .arg(fixtures_path("two_modules/nope.py"))
        .assert()
        .success()
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn test_incremental_build_uses_cache() {
    let scratch = TempDir::new().unwrap();
    for expected in ["(0 from cache)", "(2 from cache)"] {
        declgraph(&scratch)
            .arg("--incremental")
            .arg("build")
            .arg(fixtures_path("two_modules/a.py"))
            .arg(fixtures_path("two_modules/b.py"))
            .assert()
            .success()
            .stdout(predicate::str::contains(expected));
    }
}
