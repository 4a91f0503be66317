// src/graph/runner.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::errors::{Result, SitepipeError};
use crate::exec::TaskExecutor;
use crate::fs::FileSystem;
use crate::graph::node::Node;
use crate::output::{OutputLayout, clean_output};

type NodeFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Executes task graph nodes.
///
/// - Sequential composites run children in order and stop at the first
///   failure; later children never start.
/// - Concurrent composites spawn every child on the runtime and wait for
///   all of them, whether or not a sibling failed. Written output is never
///   rolled back.
///
/// Cloning is cheap; every field is shared.
#[derive(Clone)]
pub struct Runner {
    executor: Arc<dyn TaskExecutor>,
    fs: Arc<dyn FileSystem>,
    layout: Arc<OutputLayout>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(
        executor: Arc<dyn TaskExecutor>,
        fs: Arc<dyn FileSystem>,
        layout: Arc<OutputLayout>,
    ) -> Self {
        Self {
            executor,
            fs,
            layout,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Run `node` to completion.
    pub fn run<'a>(&'a self, node: &'a Node) -> NodeFuture<'a> {
        Box::pin(async move {
            match node {
                Node::Clean => self.run_clean().await,
                Node::Task(task) => {
                    self.executor.execute(Arc::clone(task)).await?;
                    Ok(())
                }
                Node::Sequential { children, .. } => {
                    debug!(node = %node.label(), children = children.len(), "running sequential group");
                    self.run_sequential(children).await
                }
                Node::Concurrent { children, .. } => {
                    debug!(node = %node.label(), children = children.len(), "running concurrent group");
                    self.run_concurrent(children).await
                }
            }
        })
    }

    /// Run `nodes` one at a time; the first failure skips the rest.
    pub async fn run_sequential(&self, nodes: &[Node]) -> Result<()> {
        for (i, node) in nodes.iter().enumerate() {
            if let Err(err) = self.run(node).await {
                let skipped: Vec<String> = nodes[i + 1..].iter().map(Node::label).collect();
                if !skipped.is_empty() {
                    debug!(failed = %node.label(), ?skipped, "sequence halted; skipping remaining steps");
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Run `nodes` concurrently and wait for all of them.
    ///
    /// A single failure is returned as is; several are bundled into
    /// `SitepipeError::Concurrent`.
    pub async fn run_concurrent(&self, nodes: &[Node]) -> Result<()> {
        let mut set = JoinSet::new();
        for node in nodes {
            let runner = self.clone();
            let node = node.clone();
            set.spawn(async move {
                let label = node.label();
                let result = runner.run(&node).await;
                (label, result)
            });
        }

        let mut errors = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((label, Err(err))) => {
                    debug!(node = %label, error = %err, "concurrent step failed");
                    errors.push(err);
                }
                Err(join_err) => {
                    errors.push(SitepipeError::Other(anyhow::anyhow!(
                        "concurrent step panicked: {join_err}"
                    )));
                }
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(SitepipeError::Concurrent(errors)),
        }
    }

    async fn run_clean(&self) -> Result<()> {
        let fs = Arc::clone(&self.fs);
        let layout = Arc::clone(&self.layout);
        tokio::task::spawn_blocking(move || clean_output(fs.as_ref(), &layout))
            .await
            .map_err(|e| SitepipeError::Other(e.into()))??;
        Ok(())
    }

    /// Run `node` and log the outcome with timing.
    pub async fn run_logged(&self, node: &Node) -> Result<()> {
        let started = Instant::now();
        let label = node.label();
        info!(node = %label, "starting");

        let result = self.run(node).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => info!(node = %label, elapsed_ms, "finished"),
            Err(err) => error!(node = %label, elapsed_ms, error = %err, "failed"),
        }
        result
    }
}
