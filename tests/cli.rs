//! CLI integration tests for `scopegate init` and `scopegate import`.
//!
//! Each test uses an isolated temp directory, ensuring tests can run in
//! parallel safely. Imports run with `--dry-run` so no service is needed.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("scopegate").expect("failed to find binary");
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_init_creates_database_and_secret() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().to_string_lossy().to_string();

    cmd()
        .args(["init", "--data-dir", &data_dir])
        .assert()
        .success()
        .stdout(predicate::str::contains("Token secret written to"));

    temp.child("scopegate.db").assert(predicate::path::exists());
    temp.child(".jwt_secret").assert(predicate::path::is_file());

    cmd()
        .args(["init", "--data-dir", &data_dir])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_serve_requires_init() {
    let temp = TempDir::new().unwrap();

    cmd()
        .args(["serve", "--data-dir"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run 'scopegate init' first"));
}

#[test]
fn test_dry_run_groups_by_nearest_marker() {
    let temp = TempDir::new().unwrap();
    temp.child("root.perms").write_str("g1\ng2\n").unwrap();
    temp.child("a.txt").write_str("a").unwrap();
    temp.child("b.md").write_str("b").unwrap();
    temp.child("~$lock.docx").write_str("x").unwrap();
    temp.child("skip.exe").write_str("x").unwrap();
    temp.child("team/team.perms").write_str("g3\n").unwrap();
    temp.child("team/c.pdf").write_str("c").unwrap();
    temp.child("team/deep/d.txt").write_str("d").unwrap();

    cmd()
        .args(["import", "--dry-run", "--folders"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("(4 files)"))
        .stdout(predicate::str::contains("scopes: g1, g2"))
        .stdout(predicate::str::contains("scopes: g3"))
        .stdout(predicate::str::contains("files: 2, batches: 1 [2]").count(2));
}

#[test]
fn test_dry_run_batches_by_count() {
    let temp = TempDir::new().unwrap();
    let config = temp.child("import.toml");
    config.write_str("max_files = 2\n").unwrap();
    let docs = temp.child("docs");
    docs.child("access.perms").write_str("g1\n").unwrap();
    for name in ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"] {
        docs.child(name).write_str("x").unwrap();
    }

    cmd()
        .args(["import", "--dry-run", "--config"])
        .arg(config.path())
        .arg("--folders")
        .arg(docs.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("files: 5, batches: 3 [2, 2, 1]"));
}

#[test]
fn test_folder_without_marker_fails() {
    let temp = TempDir::new().unwrap();
    temp.child("a.txt").write_str("a").unwrap();

    cmd()
        .args(["import", "--dry-run", "--folders"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not contain a .perms file"));
}

#[test]
fn test_files_default_to_global_scope() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("notes.txt");
    file.write_str("hello").unwrap();

    cmd()
        .args(["import", "--dry-run", "--files"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "scopes: 00000000-0000-0000-0000-000000000000",
        ));

    cmd()
        .args(["import", "--dry-run", "--scope-id", "chat-1", "--files"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("scopes: chat-1"));
}

#[test]
fn test_missing_file_aborts() {
    let temp = TempDir::new().unwrap();

    cmd()
        .args(["import", "--dry-run", "--files"])
        .arg(temp.path().join("missing.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_nothing_to_import() {
    cmd()
        .args(["import", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to import"));
}
