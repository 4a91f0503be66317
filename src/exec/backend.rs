// src/exec/backend.rs

//! Pluggable task executor.
//!
//! The graph runner hands every task to a `TaskExecutor` and awaits the
//! returned future. [`RealExecutor`] plans inputs and calls the task's
//! transform collaborator; tests substitute an executor that records calls
//! and fails on demand.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::errors::{Result, SitepipeError};
use crate::exec::plan::plan_task;
use crate::exec::task::Task;
use crate::fs::FileSystem;
use crate::output::OutputLayout;
use crate::transform::{RenderContext, TransformRegistry};
use crate::types::StepName;

/// Handle for one task execution; resolves once the transform is done.
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + 'a>>;

/// What a finished task did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub task: StepName,
    /// Inputs handed to the transform.
    pub inputs: usize,
    /// Inputs dropped because their output was up to date.
    pub skipped: usize,
    /// Files the transform reported writing.
    pub outputs: Vec<PathBuf>,
}

/// Trait abstracting how a single task is executed.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Arc<Task>) -> TaskFuture<'_>;
}

/// Production executor: resolve inputs, then run the transform.
#[derive(Debug)]
pub struct RealExecutor {
    root: PathBuf,
    layout: Arc<OutputLayout>,
    fs: Arc<dyn FileSystem>,
    registry: TransformRegistry,
}

impl RealExecutor {
    pub fn new(root: PathBuf, layout: Arc<OutputLayout>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root,
            layout,
            fs,
            registry: TransformRegistry::new(),
        }
    }

    async fn run(&self, task: Arc<Task>) -> Result<TaskReport> {
        let started = Instant::now();

        let plan = {
            let fs = Arc::clone(&self.fs);
            let root = self.root.clone();
            let task = Arc::clone(&task);
            tokio::task::spawn_blocking(move || plan_task(fs.as_ref(), &root, &task))
                .await
                .map_err(|e| SitepipeError::Other(e.into()))??
        };

        let mut report = TaskReport {
            task: task.name.clone(),
            inputs: plan.inputs.len(),
            skipped: plan.skipped,
            outputs: Vec::new(),
        };

        if plan.inputs.is_empty() {
            info!(task = %task.name, skipped = plan.skipped, "no inputs to process");
            return Ok(report);
        }

        if task.sourcemaps {
            self.fs
                .create_dir_all(&self.layout.maps_dir)
                .map_err(SitepipeError::FileSystem)?;
        }

        let transform = self.registry.resolve(&task)?;
        let ctx = RenderContext {
            task: Arc::clone(&task),
            root: self.root.clone(),
            out_dir: self.root.join(&task.dest),
            base_dir: self.root.join(&task.base),
            maps_dir: self.layout.maps_dir.clone(),
            fs: Arc::clone(&self.fs),
        };

        debug!(task = %task.name, inputs = plan.inputs.len(), "handing inputs to transform");
        report.outputs = transform.render(&ctx, &plan.inputs).await?;

        info!(
            task = %task.name,
            inputs = report.inputs,
            skipped = report.skipped,
            outputs = report.outputs.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "task finished"
        );
        Ok(report)
    }
}

impl TaskExecutor for RealExecutor {
    fn execute(&self, task: Arc<Task>) -> TaskFuture<'_> {
        Box::pin(self.run(task))
    }
}
