// src/transform/mod.rs

//! Transform collaborators.
//!
//! A collaborator turns a task's resolved inputs into files under the
//! task's destination. The pipeline never looks inside: it only awaits the
//! returned future and passes failures on unchanged.
//!
//! - [`command`] runs an external tool through the platform shell.
//! - [`copy`] copies inputs into the destination tree.
//! - [`concat`] joins inputs into a single output file.
//!
//! [`TransformRegistry`] maps a task's `transform` table to a collaborator,
//! creating each one the first time its task runs.

pub mod command;
pub mod concat;
pub mod copy;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::config::TransformSpec;
use crate::errors::Result;
use crate::exec::plan::SourceFile;
use crate::exec::task::Task;
use crate::fs::FileSystem;
use crate::types::StepName;

pub use command::CommandTransform;
pub use concat::ConcatTransform;
pub use copy::CopyTransform;

/// Future returned by [`Transform::render`]; resolves to the written paths.
pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<PathBuf>>> + Send + 'a>>;

/// Everything a collaborator may need besides the input list.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub task: Arc<Task>,
    /// Project root; commands run with this as their working directory.
    pub root: PathBuf,
    /// `root` joined with the task's `dest`.
    pub out_dir: PathBuf,
    /// `root` joined with the task's `base`.
    pub base_dir: PathBuf,
    pub maps_dir: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

impl RenderContext {
    /// Where a per-file collaborator should write the output for `input`.
    pub fn output_path(&self, input: &SourceFile) -> PathBuf {
        self.root.join(self.task.output_for(&input.relative))
    }
}

/// An opaque content transformation.
pub trait Transform: Send + Sync + fmt::Debug {
    fn render<'a>(&'a self, ctx: &'a RenderContext, inputs: &'a [SourceFile]) -> RenderFuture<'a>;
}

/// Build the collaborator described by `spec`.
pub fn build_transform(spec: &TransformSpec) -> Result<Arc<dyn Transform>> {
    let transform: Arc<dyn Transform> = match spec {
        TransformSpec::Command {
            command, per_file, ..
        } => Arc::new(CommandTransform::new(command, *per_file)?),
        TransformSpec::Copy => Arc::new(CopyTransform),
        TransformSpec::Concat { output, separator } => Arc::new(ConcatTransform::new(
            output,
            separator.clone().unwrap_or_else(|| "\n".to_string()),
        )),
    };
    Ok(transform)
}

/// Lazily-populated map from task name to its collaborator.
#[derive(Default)]
pub struct TransformRegistry {
    resolved: Mutex<HashMap<StepName, Arc<dyn Transform>>>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("TransformRegistry")
            .field("resolved", &resolved.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collaborator for `task`, created on first request.
    pub fn resolve(&self, task: &Task) -> Result<Arc<dyn Transform>> {
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = resolved.get(&task.name) {
            return Ok(Arc::clone(existing));
        }

        let transform = build_transform(&task.transform)?;
        debug!(task = %task.name, kind = task.transform.kind(), "initialised transform");
        resolved.insert(task.name.clone(), Arc::clone(&transform));
        Ok(transform)
    }

    /// Number of collaborators created so far.
    pub fn len(&self) -> usize {
        self.resolved.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
