// tests/clean_output.rs

mod common;
use crate::common::{init_tracing, read_tree, write};

use std::error::Error;
use std::path::Path;

use sitepipe::config::ProjectSection;
use sitepipe::errors::SitepipeError;
use sitepipe::fs::RealFileSystem;
use sitepipe::fs::mock::MockFileSystem;
use sitepipe::output::{CleanReport, OutputLayout, clean_output};

type TestResult = Result<(), Box<dyn Error>>;

fn layout(root: &Path) -> OutputLayout {
    OutputLayout::from_config(root, &ProjectSection::default())
}

#[test]
fn clean_removes_everything_but_keep_markers() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write(dir.path(), "dist/.gitkeep", "");
    write(dir.path(), "dist/index.html", "<html></html>");
    write(dir.path(), "dist/styles/main.css", "a {}");
    write(dir.path(), "dist/maps/main.css.map", "{}");

    let report = clean_output(&RealFileSystem, &layout(dir.path()))?;

    assert_eq!(report, CleanReport { removed: 3, kept: 1 });
    let left: Vec<String> = read_tree(&dir.path().join("dist")).into_keys().collect();
    assert_eq!(left, vec![".gitkeep"]);
    Ok(())
}

#[test]
fn clean_of_missing_root_is_a_no_op() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let report = clean_output(&RealFileSystem, &layout(dir.path()))?;

    assert_eq!(report, CleanReport::default());
    assert!(!dir.path().join("dist").exists());
    Ok(())
}

#[test]
fn clean_of_already_clean_root_changes_nothing() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write(dir.path(), "dist/.gitkeep", "marker");
    let before = read_tree(&dir.path().join("dist"));

    let report = clean_output(&RealFileSystem, &layout(dir.path()))?;

    assert_eq!(report.removed, 0);
    assert_eq!(read_tree(&dir.path().join("dist")), before);
    Ok(())
}

#[test]
fn clean_rejects_an_output_root_that_is_a_file() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write(dir.path(), "dist", "not a directory");

    let err = clean_output(&RealFileSystem, &layout(dir.path())).unwrap_err();
    assert!(matches!(err, SitepipeError::FileSystem(_)));
    Ok(())
}

#[test]
fn clean_on_mock_fs_honours_custom_keep_list() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("./public/.keep", "");
    fs.add_file("./public/CNAME", "example.org");
    fs.add_file("./public/js/app.js", "console.log(1)");

    let project = ProjectSection {
        output: "public".to_string(),
        keep: vec![".keep".to_string(), "CNAME".to_string()],
        maps: "maps".to_string(),
    };
    let layout = OutputLayout::from_config(Path::new("."), &project);

    let report = clean_output(&fs, &layout)?;

    assert_eq!(report, CleanReport { removed: 1, kept: 2 });
    let files: Vec<String> = fs
        .files()
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["./public/.keep", "./public/CNAME"]);
    Ok(())
}
