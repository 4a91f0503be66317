// src/orchestrator.rs

//! The three entry points: `clean`, `build` and `default`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ConfigFile;
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::{Result, SitepipeError};
use crate::exec::{RealExecutor, TaskExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::{GraphBuilder, Pipeline, Runner};
use crate::output::{CleanReport, OutputLayout, clean_output};
use crate::serve::{LiveReload, spawn_server};
use crate::watch::{WatchBinding, WatchOptions, spawn_watcher};

const RUNTIME_CHANNEL_CAPACITY: usize = 64;

/// One per process. Owns the assembled pipeline and everything needed to
/// run it.
#[derive(Debug)]
pub struct Orchestrator {
    root: PathBuf,
    config: ConfigFile,
    fs: Arc<dyn FileSystem>,
    layout: Arc<OutputLayout>,
    runner: Runner,
    pipeline: Pipeline,
    reload: LiveReload,
}

impl Orchestrator {
    /// Production setup: real filesystem and transform collaborators.
    pub fn new(root: impl Into<PathBuf>, config: ConfigFile) -> Result<Self> {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let layout = Arc::new(OutputLayout::from_config(&root, config.project()));
        let executor = Arc::new(RealExecutor::new(root.clone(), layout, Arc::clone(&fs)));
        Self::with_parts(root, config, fs, executor)
    }

    /// Setup with an explicit filesystem and executor.
    pub fn with_parts(
        root: impl Into<PathBuf>,
        config: ConfigFile,
        fs: Arc<dyn FileSystem>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Self> {
        let root = root.into();
        let layout = Arc::new(OutputLayout::from_config(&root, config.project()));
        let pipeline = GraphBuilder::new(&config)?.assemble()?;
        let runner = Runner::new(executor, Arc::clone(&fs), Arc::clone(&layout));

        Ok(Self {
            root,
            config,
            fs,
            layout,
            runner,
            pipeline,
            reload: LiveReload::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.pipeline.bindings
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Hub that watch mode notifies when the output root changes.
    pub fn live_reload(&self) -> &LiveReload {
        &self.reload
    }

    /// Empty the output root except the keep markers.
    pub async fn clean(&self) -> Result<CleanReport> {
        let fs = Arc::clone(&self.fs);
        let layout = Arc::clone(&self.layout);
        tokio::task::spawn_blocking(move || clean_output(fs.as_ref(), &layout))
            .await
            .map_err(|e| SitepipeError::Other(e.into()))?
    }

    /// Clean, then every build step in declared order.
    pub async fn build(&self) -> Result<()> {
        self.runner.run_logged(&self.pipeline.build).await
    }

    /// Build, then serve and watch until Ctrl-C.
    ///
    /// A failed build is returned before anything starts watching.
    pub async fn run_default(&self) -> Result<()> {
        self.build().await?;
        self.watch_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve the output root (if enabled) and react to changes until
    /// `shutdown` resolves.
    pub async fn watch_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let serve = self.config.serve();
        let _server = if serve.enabled {
            let addr = tokio::net::lookup_host((serve.host.as_str(), serve.port))
                .await?
                .next()
                .ok_or_else(|| {
                    SitepipeError::ConfigError(format!("cannot resolve serve host '{}'", serve.host))
                })?;
            Some(spawn_server(addr, self.layout.root.clone(), self.reload.clone()).await?)
        } else {
            None
        };

        let (tx, rx) = mpsc::channel::<RuntimeEvent>(RUNTIME_CHANNEL_CAPACITY);

        let options = WatchOptions::from_config(self.config.watch());
        let bindings = self.pipeline.bindings.clone();
        let _watcher = spawn_watcher(
            self.root.clone(),
            self.layout.root.clone(),
            bindings.clone(),
            tx.clone(),
            options,
            Arc::clone(&self.fs),
        )?;

        {
            let tx = tx.clone();
            tokio::spawn(async move {
                shutdown.await;
                info!("shutdown requested");
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            });
        }

        let names = bindings.iter().map(|b| b.name().to_string()).collect();
        let core = CoreRuntime::new(
            names,
            self.config.watch().queue_length,
            RuntimeOptions::for_debounce(options.debounce),
        );
        let runtime = Runtime::new(core, rx, tx, self.runner.clone(), &bindings, Some(self.reload.clone()));
        runtime.run().await
    }
}
