// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::graph::node::Node;
use crate::graph::runner::Runner;
use crate::serve::LiveReload;
use crate::types::StepName;
use crate::watch::bindings::WatchBinding;

use super::core::CoreRuntime;
use super::{BindingOutcome, CoreCommand, RuntimeEvent};

/// Async IO shell around [`CoreRuntime`].
///
/// Reads events, feeds them to the core, and carries out the resulting
/// commands: bound nodes run on spawned tasks that report back with
/// `BindingFinished`, and reloads go out through the [`LiveReload`] hub.
pub struct Runtime {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    runner: Runner,
    nodes: HashMap<StepName, Node>,
    reload: Option<LiveReload>,
    in_flight: JoinSet<()>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("bindings", &self.nodes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        runner: Runner,
        bindings: &[WatchBinding],
        reload: Option<LiveReload>,
    ) -> Self {
        let nodes = bindings
            .iter()
            .map(|b| (b.name().to_string(), b.node().clone()))
            .collect();
        Self {
            core,
            event_rx,
            event_tx,
            runner,
            nodes,
            reload,
            in_flight: JoinSet::new(),
        }
    }

    /// Main event loop. Returns on shutdown, when the event channel closes,
    /// or (with `exit_when_idle`) once nothing is running.
    pub async fn run(mut self) -> Result<()> {
        info!(bindings = self.nodes.len(), "watching for changes");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command);
            }

            // Reap finished run handles so the set does not grow unbounded.
            while self.in_flight.try_join_next().is_some() {}

            if !step.keep_running {
                info!("stopping runtime");
                break;
            }
        }

        // Dropping the set aborts runs still in flight.
        info!(reloads = self.core.reloads(), "runtime exiting");
        Ok(())
    }

    fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::RunBinding(name) => self.spawn_binding(name),
            CoreCommand::NotifyReload => match &self.reload {
                Some(hub) => {
                    hub.notify();
                }
                None => debug!("output changed; live reload disabled"),
            },
            CoreCommand::ScheduleSettle { generation, after } => {
                let tx = self.event_tx.clone();
                self.in_flight.spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(RuntimeEvent::ReloadSettled { generation }).await;
                });
            }
            CoreCommand::RequestExit => debug!("core issued RequestExit"),
        }
    }

    fn spawn_binding(&mut self, name: StepName) {
        let Some(node) = self.nodes.get(&name).cloned() else {
            warn!(binding = %name, "no node bound to binding");
            return;
        };

        let runner = self.runner.clone();
        let tx = self.event_tx.clone();
        self.in_flight.spawn(async move {
            // Failures are logged by `run_logged`; watching continues.
            let outcome = match runner.run_logged(&node).await {
                Ok(()) => BindingOutcome::Success,
                Err(_) => BindingOutcome::Failed,
            };
            if tx
                .send(RuntimeEvent::BindingFinished {
                    binding: name.clone(),
                    outcome,
                })
                .await
                .is_err()
            {
                debug!(binding = %name, "runtime gone before run finished");
            }
        });
    }
}
