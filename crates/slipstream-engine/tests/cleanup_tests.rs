//! Dead-version cleanup tests
//!
//! Running-process protection, dead markers and later-pass removal.

#![cfg(unix)]

mod common;

use common::*;
use slipstream_core::PackageVersion;
use slipstream_engine::layout::{is_dead, mark_dead, version_dir};
use slipstream_engine::ApplyEngine;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::process::{Child, Command};

fn version(s: &str) -> PackageVersion {
    PackageVersion::parse(s).unwrap()
}

/// Copy the system sleep binary into `dir` and start it
fn spawn_resident_process(dir: &std::path::Path) -> Child {
    let exe = dir.join("resident");
    fs::copy("/bin/sleep", &exe).unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
    let child = Command::new(&exe).arg("30").spawn().unwrap();
    // Give the scheduler a beat so the process shows up in enumeration.
    std::thread::sleep(std::time::Duration::from_millis(200));
    child
}

#[tokio::test]
async fn directories_backing_running_processes_are_never_deleted() {
    let root = tempfile::tempdir().unwrap();
    let busy = version_dir(root.path(), &version("1.0"));
    fs::create_dir_all(&busy).unwrap();
    let mut child = spawn_resident_process(&busy);

    let engine = ApplyEngine::new(root.path());
    engine
        .clean_dead_versions(Some(&version("2.0")), None, true)
        .await
        .unwrap();
    assert!(busy.exists(), "deleted a directory backing a live process");
    // The survivor is dead from here on: never live, never hooked again.
    assert!(is_dead(&busy), "running-process directory was not marked dead");

    // Once the process is gone a later pass removes the directory.
    child.kill().unwrap();
    child.wait().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(200));

    engine
        .clean_dead_versions(Some(&version("2.0")), None, true)
        .await
        .unwrap();
    assert!(!busy.exists());
}

#[tokio::test]
async fn dead_directories_get_no_hooks_but_are_deleted() {
    let dirs = tempfile::tempdir().unwrap();
    let root = dirs.path().join("install");
    let log = dirs.path().join("hooks.log");

    let old = version_dir(&root, &version("1.0"));
    write_aware_script(&old, "app", &log);
    mark_dead(&old).unwrap();
    assert!(is_dead(&old));

    let engine = ApplyEngine::new(&root);
    engine
        .clean_dead_versions(Some(&version("2.0")), None, false)
        .await
        .unwrap();

    assert!(!old.exists());
    assert!(hook_log_lines(&log).is_empty(), "dead directory received a hook");
}

#[tokio::test]
async fn keep_set_is_preserved_and_the_rest_retired() {
    let dirs = tempfile::tempdir().unwrap();
    let root = dirs.path().join("install");
    let log = dirs.path().join("hooks.log");

    for v in ["1.0", "1.1", "1.2"] {
        let dir = version_dir(&root, &version(v));
        write_aware_script(&dir, "app", &log);
    }

    let engine = ApplyEngine::new(&root);
    engine
        .clean_dead_versions(Some(&version("1.2")), Some(&version("1.1")), false)
        .await
        .unwrap();

    assert!(!version_dir(&root, &version("1.0")).exists());
    assert!(version_dir(&root, &version("1.1")).exists());
    assert!(version_dir(&root, &version("1.2")).exists());

    let lines = hook_log_lines(&log);
    assert_eq!(lines, vec!["app --slipstream-obsolete 1.0"]);
}

#[tokio::test]
async fn forced_cleanup_skips_obsolete_hooks() {
    let dirs = tempfile::tempdir().unwrap();
    let root = dirs.path().join("install");
    let log = dirs.path().join("hooks.log");

    let old = version_dir(&root, &version("1.0"));
    write_aware_script(&old, "app", &log);

    let engine = ApplyEngine::new(&root);
    engine
        .clean_dead_versions(Some(&version("2.0")), None, true)
        .await
        .unwrap();

    assert!(!old.exists());
    assert!(hook_log_lines(&log).is_empty());
}
