// tests/workdir.rs

use serde_json::json;
use upkeep::workdir::{WorkDir, HELPER_FILE_NAME, WORK_DIR_NAME};

#[test]
fn ensure_creates_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = WorkDir::at(dir.path().join(WORK_DIR_NAME));

    assert!(!workdir.root().exists());
    workdir.ensure().unwrap();
    assert!(workdir.root().is_dir());

    // Idempotent.
    workdir.ensure().unwrap();
}

#[test]
fn install_shim_keeps_the_source_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = WorkDir::at(dir.path().join(WORK_DIR_NAME));
    workdir.ensure().unwrap();

    let source = dir.path().join("upkeep-shim.jar");
    std::fs::write(&source, b"shim v1").unwrap();

    let installed = workdir.install_shim(&source).unwrap();
    assert_eq!(installed, workdir.root().join("upkeep-shim.jar"));
    assert_eq!(std::fs::read(&installed).unwrap(), b"shim v1");

    // Reinstalling replaces the copy.
    std::fs::write(&source, b"shim v2").unwrap();
    workdir.install_shim(&source).unwrap();
    assert_eq!(std::fs::read(&installed).unwrap(), b"shim v2");
}

#[test]
fn install_helper_lands_at_the_helper_path() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = WorkDir::at(dir.path().join(WORK_DIR_NAME));
    workdir.ensure().unwrap();

    let source = dir.path().join("some-downloaded-helper");
    std::fs::write(&source, b"helper bytes").unwrap();

    let installed = workdir.install_helper(&source).unwrap();
    assert_eq!(installed, workdir.helper_path());
    assert_eq!(installed.file_name().unwrap(), HELPER_FILE_NAME);
    assert_eq!(std::fs::read(&installed).unwrap(), b"helper bytes");
}

#[test]
fn profiling_snapshots_are_written_as_timestamped_json() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = WorkDir::at(dir.path().join(WORK_DIR_NAME));
    workdir.ensure().unwrap();

    let snapshot = json!({ "threads": [{ "name": "main", "state": "RUNNABLE" }] });
    let path = workdir.write_profiling_snapshot(&snapshot).unwrap();

    assert_eq!(path.parent().unwrap(), workdir.profiling_dir());
    assert_eq!(path.extension().unwrap(), "json");

    // File stem is the unix timestamp in milliseconds.
    let stem = path.file_stem().unwrap().to_string_lossy();
    assert!(stem.parse::<u128>().is_ok(), "unexpected stem: {stem}");

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(written, snapshot);
}
