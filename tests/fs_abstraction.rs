// tests/fs_abstraction.rs
//
// Hashing, glob collection and input planning against the in-memory
// filesystem.

mod common;
use crate::common::builders::TaskConfigBuilder;

use std::path::{Path, PathBuf};

use sitepipe::errors::SitepipeError;
use sitepipe::exec::{Task, plan_task};
use sitepipe::fs::mock::MockFileSystem;
use sitepipe::watch::hash::{compute_aggregate_hash, compute_file_hash};
use sitepipe::watch::{FileSet, collect_matching_files};

fn site_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("./app/index.html", b"<html></html>".to_vec());
    fs.add_file("./app/about.html", b"<html>about</html>".to_vec());
    fs.add_file("./app/scripts/main.js", b"main();".to_vec());
    fs.add_file("./app/scripts/vendor/jquery.js", b"$();".to_vec());
    fs.add_file("./app/scripts/vendor/jquery.min.js", b"$()".to_vec());
    fs.add_file("./dist/index.html", b"old".to_vec());
    fs
}

fn slashed(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn mock_fs_hashing() {
    let fs = MockFileSystem::new();
    fs.add_file("test.txt", b"hello world".to_vec());

    let hash = compute_file_hash(&fs, Path::new("test.txt")).unwrap();
    assert_eq!(hash, "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24");
}

#[test]
fn aggregate_hash_depends_on_paths() {
    let a = compute_aggregate_hash(&[(PathBuf::from("a.css"), "h".to_string())]);
    let b = compute_aggregate_hash(&[(PathBuf::from("b.css"), "h".to_string())]);
    assert_ne!(a, b);
}

#[test]
fn collect_only_walks_matching_roots() {
    let fs = site_fs();
    let set = FileSet::new(&["app/*.html".to_string()]).unwrap();

    let files = collect_matching_files(&fs, Path::new("."), &set).unwrap();
    assert_eq!(slashed(&files), vec!["./app/about.html", "./app/index.html"]);
}

#[test]
fn collect_honours_exclusions() {
    let fs = site_fs();
    let set = FileSet::new(&[
        "app/scripts/**/*.js".to_string(),
        "!app/scripts/**/*.min.js".to_string(),
    ])
    .unwrap();

    let files = collect_matching_files(&fs, Path::new("."), &set).unwrap();
    assert_eq!(
        slashed(&files),
        vec!["./app/scripts/main.js", "./app/scripts/vendor/jquery.js"]
    );
}

#[test]
fn plan_makes_inputs_relative_to_base() {
    let fs = site_fs();
    let cfg = TaskConfigBuilder::copy("app/scripts/**/*.js", "dist/scripts").build();
    let task = Task::from_config("scripts", &cfg).unwrap();

    let plan = plan_task(&fs, Path::new("."), &task).unwrap();
    let relative: Vec<PathBuf> = plan.inputs.iter().map(|s| s.relative.clone()).collect();

    assert_eq!(
        relative,
        vec![
            PathBuf::from("main.js"),
            PathBuf::from("vendor/jquery.js"),
            PathBuf::from("vendor/jquery.min.js"),
        ]
    );
    assert_eq!(plan.skipped, 0);
}

#[test]
fn plan_rejects_missing_plain_source() {
    let fs = site_fs();
    let cfg = TaskConfigBuilder::copy("app/robots.txt", "dist").build();
    let task = Task::from_config("robots", &cfg).unwrap();

    let err = plan_task(&fs, Path::new("."), &task).unwrap_err();
    assert!(matches!(err, SitepipeError::FileSystem(_)));
}

#[test]
fn plan_of_unmatched_glob_is_empty() {
    let fs = site_fs();
    let cfg = TaskConfigBuilder::copy("app/fonts/**/*", "dist/fonts").build();
    let task = Task::from_config("fonts", &cfg).unwrap();

    let plan = plan_task(&fs, Path::new("."), &task).unwrap();
    assert!(plan.inputs.is_empty());
}
