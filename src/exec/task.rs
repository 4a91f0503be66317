// src/exec/task.rs

use std::path::PathBuf;

use crate::config::{TaskConfig, TransformSpec};
use crate::errors::{Result, SitepipeError};
use crate::types::StepName;
use crate::watch::patterns::{FileSet, glob_base};

/// A single unit of work: one transform over one input file set.
///
/// Built once from `[task.<name>]` and shared as `Arc<Task>`; nothing in the
/// pipeline mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: StepName,
    /// Input patterns (with `!` exclusions).
    pub src: FileSet,
    /// Base directory input paths are made relative to, relative to the
    /// project root.
    pub base: PathBuf,
    /// Output directory, relative to the project root.
    pub dest: PathBuf,
    pub transform: TransformSpec,
    pub only_newer: bool,
    pub sourcemaps: bool,
    /// Patterns that re-run this task in watch mode.
    pub watch: FileSet,
}

impl Task {
    pub fn from_config(name: &str, cfg: &TaskConfig) -> Result<Self> {
        let src = FileSet::new(&cfg.src).map_err(|e| {
            SitepipeError::ConfigError(format!("task '{name}' has an invalid `src`: {e:#}"))
        })?;

        let watch = match &cfg.watch {
            Some(patterns) => FileSet::new(patterns).map_err(|e| {
                SitepipeError::ConfigError(format!("task '{name}' has an invalid `watch`: {e:#}"))
            })?,
            None => src.clone(),
        };

        let base = match &cfg.base {
            Some(base) => PathBuf::from(base),
            None => cfg
                .src
                .iter()
                .find(|p| !p.starts_with('!'))
                .map(|p| PathBuf::from(glob_base(p)))
                .unwrap_or_default(),
        };

        Ok(Self {
            name: name.to_string(),
            src,
            base,
            dest: PathBuf::from(&cfg.dest),
            transform: cfg.transform.clone(),
            only_newer: cfg.only_newer,
            sourcemaps: cfg.sourcemaps,
            watch,
        })
    }

    /// Destination of one input, given its path relative to `base`.
    ///
    /// The transform's `extension`, if any, replaces the input's.
    pub fn output_for(&self, relative: &std::path::Path) -> PathBuf {
        let mut out = self.dest.join(relative);
        if let Some(ext) = self.transform.output_extension() {
            out.set_extension(ext.trim_start_matches('.'));
        }
        out
    }
}
