// tests/config_errors.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, GroupConfigBuilder, TaskConfigBuilder};
use crate::common::write;

use sitepipe::config::{load_and_validate, load_from_path};
use sitepipe::errors::SitepipeError;
use sitepipe::types::CompositeMode;

fn copy_task() -> sitepipe::config::TaskConfig {
    TaskConfigBuilder::copy("app/*.html", "dist").build()
}

#[test]
fn config_without_tasks_is_rejected() {
    let err = ConfigFileBuilder::new().try_build().unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(_)));
}

#[test]
fn unknown_build_step_is_reported() {
    let err = ConfigFileBuilder::new()
        .with_task("markup", copy_task())
        .build_steps(&["markup", "stylez"])
        .try_build()
        .unwrap_err();

    match err {
        SitepipeError::StepNotFound(msg) => assert!(msg.contains("stylez")),
        other => panic!("expected StepNotFound, got {other:?}"),
    }
}

#[test]
fn unknown_group_member_is_reported() {
    let err = ConfigFileBuilder::new()
        .with_task("markup", copy_task())
        .with_group("fonts", GroupConfigBuilder::sequential(&["markup", "ghost"]).build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::StepNotFound(ref m) if m.contains("ghost")));
}

#[test]
fn unknown_extra_watch_step_is_reported() {
    let err = ConfigFileBuilder::new()
        .with_task("markup", copy_task())
        .extra_watch_steps(&["images"])
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::StepNotFound(_)));
}

#[test]
fn group_cycles_are_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("markup", copy_task())
        .with_group("a", GroupConfigBuilder::sequential(&["markup", "b"]).build())
        .with_group("b", GroupConfigBuilder::concurrent(&["a"]).build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::GraphCycle(_)));
}

#[test]
fn group_containing_itself_is_a_cycle() {
    let err = ConfigFileBuilder::new()
        .with_task("markup", copy_task())
        .with_group("loop", GroupConfigBuilder::new(CompositeMode::Sequential, &["loop"]).build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::GraphCycle(_)));
}

#[test]
fn empty_group_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("markup", copy_task())
        .with_group("nothing", GroupConfigBuilder::concurrent(&[]).build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(_)));
}

#[test]
fn dest_outside_output_root_is_rejected() {
    for dest in ["public", "dist/../public", "../dist"] {
        let err = ConfigFileBuilder::new()
            .with_task("markup", TaskConfigBuilder::copy("app/*.html", dest).build())
            .try_build()
            .unwrap_err();
        assert!(
            matches!(err, SitepipeError::ConfigError(ref m) if m.contains("outside the output root")),
            "dest {dest:?} should be rejected, got {err:?}"
        );
    }
}

#[test]
fn dest_equal_to_output_root_is_accepted() {
    ConfigFileBuilder::new()
        .with_task("markup", TaskConfigBuilder::copy("app/*.html", "./dist").build())
        .try_build()
        .unwrap();
}

#[test]
fn task_and_group_names_must_differ() {
    let err = ConfigFileBuilder::new()
        .with_task("fonts", copy_task())
        .with_group("fonts", GroupConfigBuilder::sequential(&["fonts"]).build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(_)));
}

#[test]
fn invalid_glob_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("markup", TaskConfigBuilder::copy("app/[*.html", "dist").build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(ref m) if m.contains("invalid `src`")));
}

#[test]
fn only_negated_sources_are_rejected() {
    let mut task = copy_task();
    task.src = vec!["!app/*.psd".to_string()];
    let err = ConfigFileBuilder::new()
        .with_task("images", task)
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(_)));
}

#[test]
fn empty_command_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("scripts", TaskConfigBuilder::command("app/**/*.js", "dist/js", "  ").build())
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(ref m) if m.contains("empty command")));
}

#[test]
fn zero_queue_length_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("markup", copy_task())
        .queue_length(0)
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(_)));
}

#[test]
fn toml_round_trip_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "Sitepipe.toml",
        r#"
[project]
output = "dist"

[build]
steps = ["markup", "fonts"]

[watch]
extra_steps = ["images"]
debounce_ms = 50

[task.markup]
src = ["app/*.html"]
dest = "dist"
transform = { kind = "copy" }

[task.fonts_copy]
src = ["app/fonts/**/*"]
dest = "dist/fonts"
transform = { kind = "copy" }

[task.images]
src = ["app/images/**/*", "!app/images/**/*.psd"]
dest = "dist/images"
transform = { kind = "command", command = "cp {input} {output}", per_file = true }

[group.fonts]
mode = "sequential"
steps = ["fonts_copy"]
"#,
    );

    let cfg = load_and_validate(dir.path().join("Sitepipe.toml")).unwrap();
    assert_eq!(cfg.build().steps, vec!["markup", "fonts"]);
    assert_eq!(cfg.watched_steps(), vec!["markup", "fonts", "images"]);
    assert_eq!(cfg.watch().debounce_ms, 50);
    assert!(cfg.serve().enabled);
    assert_eq!(cfg.project().keep, vec![".gitkeep"]);
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Sitepipe.toml", "[task.markup\nsrc = 1");

    let err = load_from_path(dir.path().join("Sitepipe.toml")).unwrap_err();
    assert!(matches!(err, SitepipeError::TomlError(_)));
}

#[test]
fn unknown_transform_kind_is_a_toml_error() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "Sitepipe.toml",
        r#"
[task.markup]
src = ["app/*.html"]
dest = "dist"
transform = { kind = "minify" }
"#,
    );

    let err = load_from_path(dir.path().join("Sitepipe.toml")).unwrap_err();
    assert!(matches!(err, SitepipeError::TomlError(_)));
}
