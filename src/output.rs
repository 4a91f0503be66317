// src/output.rs

//! The output root: where it lives, what survives a clean, and the clean
//! operation itself.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ProjectSection;
use crate::errors::{Result, SitepipeError};
use crate::fs::FileSystem;

/// Resolved output-root layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Output root, already joined onto the project root.
    pub root: PathBuf,
    /// Top-level entry names that `clean` leaves in place.
    pub keep: Vec<String>,
    /// Directory source maps are written to.
    pub maps_dir: PathBuf,
}

impl OutputLayout {
    pub fn from_config(project_root: &Path, project: &ProjectSection) -> Self {
        let root = project_root.join(&project.output);
        let maps_dir = root.join(&project.maps);
        Self {
            root,
            keep: project.keep.clone(),
            maps_dir,
        }
    }

    fn is_kept(&self, entry: &Path) -> bool {
        entry
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.keep.iter().any(|k| k == name))
    }
}

/// What a clean pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: usize,
    pub kept: usize,
}

/// Remove every entry of the output root except the keep markers.
///
/// A missing output root counts as already clean.
pub fn clean_output(fs: &dyn FileSystem, layout: &OutputLayout) -> Result<CleanReport> {
    let root = &layout.root;

    if !fs.exists(root) {
        debug!(?root, "output root missing; nothing to clean");
        return Ok(CleanReport::default());
    }
    if !fs.is_dir(root) {
        return Err(SitepipeError::FileSystem(anyhow::anyhow!(
            "output root {:?} exists but is not a directory",
            root
        )));
    }

    let mut report = CleanReport::default();
    for entry in fs.read_dir(root).map_err(SitepipeError::FileSystem)? {
        if layout.is_kept(&entry) {
            report.kept += 1;
            continue;
        }

        let removed = if fs.is_dir(&entry) {
            fs.remove_dir_all(&entry)
        } else {
            fs.remove_file(&entry)
        };
        removed.map_err(SitepipeError::FileSystem)?;
        report.removed += 1;
    }

    info!(
        ?root,
        removed = report.removed,
        kept = report.kept,
        "cleaned output root"
    );
    Ok(report)
}
