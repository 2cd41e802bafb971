//! End-to-end apply tests against a directory-backed feed
//!
//! Exercise the full manager flow in temp directories: initial install,
//! delta update, lifecycle hooks, manifest pruning and version cleanup.

#![cfg(unix)]

mod common;

use common::*;
use slipstream_core::{noop_progress, progress_fn, RELEASES_FILE_NAME};
use slipstream_engine::UpdateManager;
use std::fs;
use std::sync::{Arc, Mutex};

struct World {
    _dirs: tempfile::TempDir,
    root: std::path::PathBuf,
    feed: std::path::PathBuf,
    log: std::path::PathBuf,
    manager: UpdateManager,
}

fn world() -> World {
    let dirs = tempfile::tempdir().unwrap();
    let root = dirs.path().join("install");
    let feed = dirs.path().join("feed");
    let log = dirs.path().join("hooks.log");
    fs::create_dir_all(&feed).unwrap();

    let manager = UpdateManager::new(dir_config(&root, &feed)).unwrap();
    World {
        root,
        feed,
        log,
        manager,
        _dirs: dirs,
    }
}

/// Publish version `version` with an aware `app` script plus extra files
fn publish_full(world: &World, version: &str, extra: &[(&str, &[u8])]) -> std::path::PathBuf {
    let payload = world.feed.join(format!("payload-{version}"));
    write_aware_script(&payload, "app", &world.log);
    write_payload(&payload, extra);
    add_full_package(&world.feed, version, &payload);
    rebuild_feed_manifest(&world.feed);
    payload
}

#[tokio::test]
async fn initial_install_lands_in_a_version_dir_and_runs_install_hooks() {
    let w = world();
    publish_full(&w, "1.0", &[("data.txt", b"one")]);

    let info = w.manager.check_for_update().await.unwrap();
    assert!(info.currently_installed.is_none());
    assert_eq!(info.releases_to_apply.len(), 1);

    w.manager.download_releases(&info, noop_progress()).await.unwrap();
    let version = w.manager.apply_releases(&info, true, noop_progress()).await.unwrap();
    assert_eq!(version.to_string(), "1.0");

    let app_dir = w.root.join("app-1.0");
    assert_eq!(fs::read(app_dir.join("data.txt")).unwrap(), b"one");
    assert_eq!(hook_log_lines(&w.log), vec!["app --slipstream-install 1.0"]);

    // The local manifest reflects exactly the installed package.
    let manifest = fs::read_to_string(w.root.join("packages").join(RELEASES_FILE_NAME)).unwrap();
    assert_eq!(manifest.lines().count(), 1);
    assert!(manifest.contains("MyApp.1.0-full.package"));
}

#[tokio::test]
async fn delta_update_replaces_the_old_version() {
    let w = world();
    let v1_payload = publish_full(&w, "1.0", &[("data.txt", b"one")]);

    let info = w.manager.check_for_update().await.unwrap();
    w.manager.download_releases(&info, noop_progress()).await.unwrap();
    w.manager.apply_releases(&info, true, noop_progress()).await.unwrap();
    fs::remove_file(&w.log).unwrap();

    // Publish 1.1 as both delta and full; the delta must win.
    let v2_payload = w.feed.join("payload-1.1");
    write_aware_script(&v2_payload, "app", &w.log);
    write_payload(&v2_payload, &[("data.txt", b"two!"), ("new.txt", b"fresh")]);
    add_delta_package(&w.feed, "1.1", &v1_payload, &v2_payload);
    add_full_package(&w.feed, "1.1", &v2_payload);
    rebuild_feed_manifest(&w.feed);

    let info = w.manager.check_for_update().await.unwrap();
    assert_eq!(info.releases_to_apply.len(), 1);
    assert!(info.releases_to_apply[0].is_delta);
    assert_eq!(
        info.currently_installed.as_ref().unwrap().version.to_string(),
        "1.0"
    );

    w.manager.download_releases(&info, noop_progress()).await.unwrap();
    let version = w.manager.apply_releases(&info, true, noop_progress()).await.unwrap();
    assert_eq!(version.to_string(), "1.1");

    let app_dir = w.root.join("app-1.1");
    assert_eq!(fs::read(app_dir.join("data.txt")).unwrap(), b"two!");
    assert_eq!(fs::read(app_dir.join("new.txt")).unwrap(), b"fresh");

    // Updated hook ran in the new dir; the previous version survives one
    // more update as the rollback target, so no obsolete hook yet.
    let lines = hook_log_lines(&w.log);
    assert!(lines.contains(&"app --slipstream-updated 1.1".to_string()));
    assert!(!lines.iter().any(|l| l.contains("--slipstream-obsolete")));
    assert!(w.root.join("app-1.0").exists());

    // Packages are pruned to the newly installed (synthesized) full.
    let packages: Vec<_> = fs::read_dir(w.root.join("packages"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|n| n.ends_with(".package"))
        .collect();
    assert_eq!(packages, vec!["MyApp.1.1-full.package"]);
}

#[tokio::test]
async fn the_oldest_version_is_retired_on_the_second_update() {
    let w = world();
    publish_full(&w, "1.0", &[("data.txt", b"one")]);

    let info = w.manager.check_for_update().await.unwrap();
    w.manager.download_releases(&info, noop_progress()).await.unwrap();
    w.manager.apply_releases(&info, true, noop_progress()).await.unwrap();

    for version in ["1.1", "1.2"] {
        publish_full(&w, version, &[("data.txt", version.as_bytes())]);
        let info = w.manager.check_for_update().await.unwrap();
        w.manager.download_releases(&info, noop_progress()).await.unwrap();
        w.manager.apply_releases(&info, true, noop_progress()).await.unwrap();
    }

    // 1.0 fell out of the keep set on the 1.2 install: obsolete hook
    // first, then deletion. 1.1 stays as the rollback target.
    assert!(!w.root.join("app-1.0").exists());
    assert!(w.root.join("app-1.1").exists());
    assert!(w.root.join("app-1.2").exists());
    let lines = hook_log_lines(&w.log);
    assert!(lines.contains(&"app --slipstream-obsolete 1.0".to_string()));
}

#[tokio::test]
async fn up_to_date_apply_is_a_first_run_noop_reporting_100() {
    let w = world();
    publish_full(&w, "1.0", &[("data.txt", b"one")]);

    let info = w.manager.check_for_update().await.unwrap();
    w.manager.download_releases(&info, noop_progress()).await.unwrap();
    w.manager.apply_releases(&info, true, noop_progress()).await.unwrap();

    // Second check: nothing to do, applying still reports completion.
    let info = w.manager.check_for_update().await.unwrap();
    assert!(info.is_up_to_date());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let version = w
        .manager
        .apply_releases(&info, true, progress_fn(move |p| sink.lock().unwrap().push(p)))
        .await
        .unwrap();
    assert_eq!(version.to_string(), "1.0");
    assert_eq!(*seen.lock().unwrap().last().unwrap(), 100);
}

#[tokio::test]
async fn apply_progress_is_monotonic_and_complete() {
    let w = world();
    publish_full(&w, "1.0", &[("data.txt", b"one")]);

    let info = w.manager.check_for_update().await.unwrap();
    w.manager.download_releases(&info, noop_progress()).await.unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    w.manager
        .apply_releases(&info, true, progress_fn(move |p| sink.lock().unwrap().push(p)))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen.last().unwrap(), 100);
    for pair in seen.windows(2) {
        assert!(pair[0] <= pair[1], "progress regressed: {:?}", *seen);
    }
}

#[tokio::test]
async fn interrupted_install_directory_is_recreated() {
    let w = world();
    publish_full(&w, "1.0", &[("data.txt", b"one")]);

    // A half-written directory from a previous crashed run.
    let stale = w.root.join("app-1.0");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("leftover.tmp"), b"junk").unwrap();

    let info = w.manager.check_for_update().await.unwrap();
    w.manager.download_releases(&info, noop_progress()).await.unwrap();
    w.manager.apply_releases(&info, true, noop_progress()).await.unwrap();

    assert!(!stale.join("leftover.tmp").exists());
    assert_eq!(fs::read(stale.join("data.txt")).unwrap(), b"one");
}

#[tokio::test]
async fn full_uninstall_runs_hooks_and_drops_a_dead_marker_or_removes_root() {
    let w = world();
    publish_full(&w, "1.0", &[("data.txt", b"one")]);

    let info = w.manager.check_for_update().await.unwrap();
    w.manager.download_releases(&info, noop_progress()).await.unwrap();
    w.manager.apply_releases(&info, true, noop_progress()).await.unwrap();
    fs::remove_file(&w.log).unwrap();

    w.manager.full_uninstall().await.unwrap();

    let lines = hook_log_lines(&w.log);
    assert!(lines.contains(&"app --slipstream-uninstall 1.0".to_string()));
    // Either the root is gone entirely or it carries the dead marker.
    assert!(!w.root.exists() || w.root.join(".dead").exists());
}
