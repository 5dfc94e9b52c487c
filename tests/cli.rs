// E2E tests for the icloudsort CLI
use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

mod common;
use common::setup_export;

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Process and organize iCloud Photos archives"));
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_source_is_required() {
    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_missing_photos_dir() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    temp_dir.child("not-an-export").create_dir_all().unwrap();

    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--source")
        .arg(temp_dir.child("not-an-export").path())
        .arg("--skip-metadata")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Catalog directory not found"));
}

#[test]
fn test_invalid_date_format() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let export = setup_export(&temp_dir);

    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--source")
        .arg(export.path())
        .arg("--skip-metadata")
        .arg("--date-format")
        .arg("../year")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid output date pattern"));
}

#[test]
fn test_dry_run_without_output() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let export = setup_export(&temp_dir);

    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--source")
        .arg(export.path())
        .arg("--skip-metadata")
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN] Would copy:"))
        .stdout(predicate::str::contains("Personal/2023/08/IMG_0001.HEIC"))
        .stdout(predicate::str::contains("Shared/2021/03/IMG_0002.JPG"))
        .stdout(predicate::str::contains("files would be copied"));

    // Nothing is written next to the export
    let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_copy_into_output() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let export = setup_export(&temp_dir);
    let output = temp_dir.child("output");

    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--source")
        .arg(export.path())
        .arg("--output")
        .arg(output.path())
        .arg("--skip-metadata")
        .assert()
        .success()
        .stdout(predicate::str::contains("files copied"));

    output
        .child("Personal/2023/08/IMG_0001.HEIC")
        .assert(predicate::path::is_file());
    output
        .child("Shared/2021/03/IMG_0002.JPG")
        .assert("jpeg bytes");
    // Deleted catalog rows are never copied
    assert!(!output.child("Personal/2023/01/IMG_0003.MOV").exists());
}

#[test]
fn test_skip_shared_library() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let export = setup_export(&temp_dir);
    let output = temp_dir.child("output");

    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--source")
        .arg(export.path())
        .arg("--output")
        .arg(output.path())
        .arg("--skip-metadata")
        .arg("--skip-shared-library")
        .assert()
        .success();

    output
        .child("Personal/2023/08/IMG_0001.HEIC")
        .assert(predicate::path::is_file());
    assert!(!output.child("Shared").exists());
}

#[test]
fn test_existing_destination_is_kept_without_overwrite() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let export = setup_export(&temp_dir);
    let output = temp_dir.child("output");
    let existing = output.child("Personal/2023/08/IMG_0001.HEIC");
    existing.write_str("already sorted").unwrap();

    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--source")
        .arg(export.path())
        .arg("--output")
        .arg(output.path())
        .arg("--skip-metadata")
        .assert()
        .success()
        .stdout(predicate::str::contains("already present"));
    existing.assert("already sorted");

    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--source")
        .arg(export.path())
        .arg("--output")
        .arg(output.path())
        .arg("--skip-metadata")
        .arg("--overwrite")
        .assert()
        .success();
    existing.assert("heic bytes");
}

#[test]
fn test_custom_date_format() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let export = setup_export(&temp_dir);
    let output = temp_dir.child("output");

    let mut cmd = Command::cargo_bin("icloudsort").unwrap();
    cmd.arg("--source")
        .arg(export.path())
        .arg("--output")
        .arg(output.path())
        .arg("--skip-metadata")
        .arg("--date-format")
        .arg("year/month/day")
        .assert()
        .success();

    output
        .child("Personal/2023/08/13/IMG_0001.HEIC")
        .assert(predicate::path::is_file());
}
