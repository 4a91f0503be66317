// tests/input_planning.rs
//
// Input resolution against the real filesystem: `only_newer` and directory
// walking.

mod common;
use crate::common::builders::TaskConfigBuilder;
use crate::common::write;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sitepipe::exec::{Task, plan_task};
use sitepipe::fs::RealFileSystem;

type TestResult = Result<(), Box<dyn Error>>;

fn set_mtime(path: &Path, age: Duration) -> std::io::Result<()> {
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_modified(SystemTime::now() - age)
}

fn relative_inputs(root: &Path, task: &Task) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let plan = plan_task(&RealFileSystem, root, task)?;
    Ok(plan.inputs.into_iter().map(|s| s.relative).collect())
}

#[test]
fn only_newer_skips_inputs_with_fresh_outputs() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(root, "app/fonts/a.woff2", "a");
    write(root, "app/fonts/b.woff2", "b");
    write(root, "app/fonts/c.woff2", "c");
    write(root, "dist/fonts/a.woff2", "old a");
    write(root, "dist/fonts/b.woff2", "old b");

    // a: output newer than input. b: output older (stale). c: no output.
    set_mtime(&root.join("app/fonts/a.woff2"), Duration::from_secs(3600))?;
    set_mtime(&root.join("dist/fonts/b.woff2"), Duration::from_secs(3600))?;

    let cfg = TaskConfigBuilder::copy("app/fonts/**/*", "dist/fonts")
        .only_newer(true)
        .build();
    let task = Task::from_config("fonts", &cfg)?;

    let plan = plan_task(&RealFileSystem, root, &task)?;
    let relative: Vec<PathBuf> = plan.inputs.iter().map(|s| s.relative.clone()).collect();

    assert_eq!(relative, vec![PathBuf::from("b.woff2"), PathBuf::from("c.woff2")]);
    assert_eq!(plan.skipped, 1);
    Ok(())
}

#[test]
fn only_newer_compares_against_the_mapped_extension() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(root, "app/images/logo.png", "png");
    write(root, "app/images/hero.png", "png");
    write(root, "dist/images/logo.webp", "webp");
    // Same stem, wrong extension: does not count as hero's output.
    write(root, "dist/images/hero.png", "png");
    set_mtime(&root.join("app/images/logo.png"), Duration::from_secs(3600))?;
    set_mtime(&root.join("app/images/hero.png"), Duration::from_secs(3600))?;

    let cfg = TaskConfigBuilder::command("app/images/*.png", "dist/images", "cwebp {input} -o {output}")
        .per_file(Some("webp"))
        .only_newer(true)
        .build();
    let task = Task::from_config("images_webp", &cfg)?;

    assert_eq!(relative_inputs(root, &task)?, vec![PathBuf::from("hero.png")]);
    Ok(())
}

#[test]
fn without_only_newer_every_input_is_planned() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(root, "app/fonts/a.woff2", "a");
    write(root, "dist/fonts/a.woff2", "a");
    set_mtime(&root.join("app/fonts/a.woff2"), Duration::from_secs(3600))?;

    let cfg = TaskConfigBuilder::copy("app/fonts/**/*", "dist/fonts").build();
    let task = Task::from_config("fonts", &cfg)?;

    let plan = plan_task(&RealFileSystem, root, &task)?;
    assert_eq!(plan.inputs.len(), 1);
    assert_eq!(plan.skipped, 0);
    Ok(())
}

#[cfg(unix)]
#[test]
fn symlink_loops_are_walked_once() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(root, "app/scripts/main.js", "main();");
    std::os::unix::fs::symlink(root.join("app"), root.join("app/scripts/back"))?;

    let cfg = TaskConfigBuilder::copy("app/**/*.js", "dist/scripts").build();
    let task = Task::from_config("scripts", &cfg)?;

    assert_eq!(relative_inputs(root, &task)?, vec![PathBuf::from("scripts/main.js")]);
    Ok(())
}
