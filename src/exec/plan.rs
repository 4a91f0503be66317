// src/exec/plan.rs

//! Input resolution for a task: expand its globs, map each input into the
//! destination tree and drop inputs whose output is already up to date.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use tracing::debug;

use crate::errors::{Result, SitepipeError};
use crate::exec::task::Task;
use crate::fs::FileSystem;
use crate::watch::patterns::collect_matching_files;

/// One resolved input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as found on disk (project root joined with the relative path).
    pub path: PathBuf,
    /// Path relative to the task's `base`.
    pub relative: PathBuf,
}

/// Inputs a task will hand to its transform.
#[derive(Debug, Clone, Default)]
pub struct TaskPlan {
    pub inputs: Vec<SourceFile>,
    /// Inputs dropped by `only_newer`.
    pub skipped: usize,
}

/// Resolve the inputs of `task` under `root`.
///
/// A plain (non-glob) `src` path that does not exist is an error; globs that
/// match nothing simply yield no inputs.
pub fn plan_task(fs: &dyn FileSystem, root: &Path, task: &Task) -> Result<TaskPlan> {
    for singular in task.src.singular_paths() {
        let path = root.join(&singular);
        if !fs.is_file(&path) {
            return Err(SitepipeError::FileSystem(anyhow!(
                "task '{}': source file {:?} not found",
                task.name,
                path
            )));
        }
    }

    let files = collect_matching_files(fs, root, &task.src).map_err(SitepipeError::FileSystem)?;
    let base_dir = root.join(&task.base);

    let mut plan = TaskPlan::default();
    for path in files {
        let relative = match path.strip_prefix(&base_dir) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => path.strip_prefix(root).unwrap_or(&path).to_path_buf(),
        };

        if task.only_newer && is_up_to_date(fs, &path, &root.join(task.output_for(&relative))) {
            debug!(task = %task.name, ?path, "output newer than input; skipping");
            plan.skipped += 1;
            continue;
        }

        plan.inputs.push(SourceFile { path, relative });
    }

    Ok(plan)
}

fn is_up_to_date(fs: &dyn FileSystem, input: &Path, output: &Path) -> bool {
    match (fs.modified(input), fs.modified(output)) {
        (Some(src), Some(out)) => out >= src,
        _ => false,
    }
}
