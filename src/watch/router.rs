// src/watch/router.rs

//! Turns a debounced batch of changed paths into binding triggers and reload
//! notifications.
//!
//! The router is pure: no channels, no filesystem. The watcher loop feeds it
//! classified paths and forwards its decisions to the runtime.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, trace};

use crate::types::StepName;
use crate::watch::bindings::WatchBinding;
use crate::watch::path_utils::relative_str;

/// Directory (relative to the project root) holding sitepipe's own state.
const STATE_DIR: &str = ".sitepipe";

/// A changed path, relative and `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangedPath {
    /// Relative to the project root.
    Source(String),
    /// Relative to the output root.
    Output(String),
}

/// Classify an absolute path from the watcher.
///
/// The output root is checked first: it usually lives inside the project
/// root, and its files must never count as sources. Returns `None` for
/// paths outside both roots and for sitepipe's state directory.
pub fn classify(root: &Path, output_root: &Path, path: &Path) -> Option<ChangedPath> {
    if let Some(rel) = relative_str(output_root, path) {
        return Some(ChangedPath::Output(rel));
    }

    let rel = relative_str(root, path)?;
    if rel == STATE_DIR || rel.starts_with(&format!("{STATE_DIR}/")) {
        trace!(path = %rel, "ignoring state directory change");
        return None;
    }
    Some(ChangedPath::Source(rel))
}

/// What one batch asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutedBatch {
    /// Bindings to trigger, each at most once, in declaration order.
    pub bindings: Vec<StepName>,
    /// True if anything under the output root changed.
    pub reload: bool,
}

impl RoutedBatch {
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && !self.reload
    }
}

#[derive(Debug, Clone)]
pub struct WatchRouter {
    bindings: Vec<WatchBinding>,
}

impl WatchRouter {
    pub fn new(bindings: Vec<WatchBinding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    pub fn binding(&self, name: &str) -> Option<&WatchBinding> {
        self.bindings.iter().find(|b| b.name() == name)
    }

    /// Route one batch.
    ///
    /// Every binding whose file set matches at least one source path fires
    /// once. Bindings with overlapping file sets fire independently.
    pub fn route(&self, batch: &[ChangedPath]) -> RoutedBatch {
        let mut sources = BTreeSet::new();
        let mut reload = false;

        for changed in batch {
            match changed {
                ChangedPath::Source(rel) => {
                    sources.insert(rel.as_str());
                }
                ChangedPath::Output(_) => reload = true,
            }
        }

        let bindings: Vec<StepName> = self
            .bindings
            .iter()
            .filter(|b| sources.iter().any(|rel| b.matches(rel)))
            .map(|b| b.name().to_string())
            .collect();

        if !bindings.is_empty() || reload {
            debug!(?bindings, reload, paths = batch.len(), "routed change batch");
        }

        RoutedBatch { bindings, reload }
    }
}
