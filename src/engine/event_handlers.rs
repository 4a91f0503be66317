// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::queue::RerunQueue;
use crate::engine::{BindingOutcome, RuntimeOptions};
use crate::types::StepName;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Run this binding's node.
    RunBinding(StepName),
    /// Tell connected browsers to reload.
    NotifyReload,
    /// Send `ReloadSettled { generation }` back after `after`.
    ScheduleSettle { generation: u64, after: Duration },
    /// Request that the runtime exits (only with `exit_when_idle`).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn keep(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

pub fn handle_binding_trigger(
    queue: &mut RerunQueue,
    known: &[StepName],
    binding: StepName,
) -> CoreStep {
    if !known.contains(&binding) {
        warn!(binding = %binding, "trigger for unknown binding ignored");
        return CoreStep::keep(Vec::new());
    }

    debug!(binding = %binding, "binding triggered");
    if queue.trigger(&binding) {
        CoreStep::keep(vec![CoreCommand::RunBinding(binding)])
    } else {
        CoreStep::keep(Vec::new())
    }
}

pub fn handle_binding_finished(
    queue: &mut RerunQueue,
    options: &RuntimeOptions,
    binding: StepName,
    outcome: BindingOutcome,
) -> CoreStep {
    debug!(binding = %binding, ?outcome, "binding finished");

    let mut commands = Vec::new();
    if queue.finish(&binding) {
        commands.push(CoreCommand::RunBinding(binding));
    }

    let mut keep_running = true;
    if options.exit_when_idle && queue.is_idle() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
