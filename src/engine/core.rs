// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! Consumes [`RuntimeEvent`]s and produces commands for the IO shell
//! (`engine::runtime::Runtime`). No Tokio types, channels or filesystem, so
//! it can be unit tested directly.

use tracing::debug;

use crate::engine::event_handlers::{CoreCommand, CoreStep, handle_binding_finished, handle_binding_trigger};
use crate::engine::queue::RerunQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::types::StepName;

/// Reloads follow runs, not individual writes:
///
/// - Output changes seen while any binding is running or queued only mark a
///   reload as pending. It goes out once, when the last run finishes.
/// - Output changes seen while idle reload right away.
/// - Every reload opens a settle window (`reload_settle`) in which further
///   output changes are absorbed; the watcher reports a run's last writes
///   one debounce window after they happen.
#[derive(Debug)]
pub struct CoreRuntime {
    bindings: Vec<StepName>,
    queue: RerunQueue,
    options: RuntimeOptions,
    reloads: usize,
    reload_pending: bool,
    settling: Option<u64>,
    generation: u64,
}

impl CoreRuntime {
    pub fn new(bindings: Vec<StepName>, queue_length: usize, options: RuntimeOptions) -> Self {
        Self {
            bindings,
            queue: RerunQueue::new(queue_length),
            options,
            reloads: 0,
            reload_pending: false,
            settling: None,
            generation: 0,
        }
    }

    /// No binding running or queued.
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    pub fn is_running(&self, binding: &str) -> bool {
        self.queue.is_running(binding)
    }

    /// Reload notifications issued so far.
    pub fn reloads(&self) -> usize {
        self.reloads
    }

    /// A reload is waiting for running bindings to finish.
    pub fn reload_pending(&self) -> bool {
        self.reload_pending
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::BindingTriggered { binding } => {
                handle_binding_trigger(&mut self.queue, &self.bindings, binding)
            }
            RuntimeEvent::BindingFinished { binding, outcome } => {
                let mut step = handle_binding_finished(&mut self.queue, &self.options, binding, outcome);
                if self.queue.is_idle() && self.reload_pending {
                    self.reload_pending = false;
                    let mut commands = self.reload();
                    commands.append(&mut step.commands);
                    step.commands = commands;
                }
                step
            }
            RuntimeEvent::OutputChanged => {
                if !self.queue.is_idle() {
                    debug!("output changed while bindings run; reload deferred");
                    self.reload_pending = true;
                    CoreStep::keep(Vec::new())
                } else if self.settling.is_some() {
                    debug!("output change absorbed by settle window");
                    CoreStep::keep(Vec::new())
                } else {
                    CoreStep::keep(self.reload())
                }
            }
            RuntimeEvent::ReloadSettled { generation } => {
                if self.settling == Some(generation) {
                    self.settling = None;
                }
                CoreStep::keep(Vec::new())
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn reload(&mut self) -> Vec<CoreCommand> {
        self.reloads += 1;
        self.generation += 1;
        self.settling = Some(self.generation);
        vec![
            CoreCommand::NotifyReload,
            CoreCommand::ScheduleSettle {
                generation: self.generation,
                after: self.options.reload_settle,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::engine::BindingOutcome;

    fn core() -> CoreRuntime {
        CoreRuntime::new(
            vec!["styles".to_string(), "scripts".to_string()],
            1,
            RuntimeOptions::default(),
        )
    }

    fn trigger(name: &str) -> RuntimeEvent {
        RuntimeEvent::BindingTriggered {
            binding: name.to_string(),
        }
    }

    fn finished(name: &str) -> RuntimeEvent {
        RuntimeEvent::BindingFinished {
            binding: name.to_string(),
            outcome: BindingOutcome::Success,
        }
    }

    #[test]
    fn trigger_while_running_queues_one_rerun() {
        let mut core = core();

        let step = core.step(trigger("styles"));
        assert_eq!(step.commands, vec![CoreCommand::RunBinding("styles".into())]);

        assert!(core.step(trigger("styles")).commands.is_empty());
        assert!(core.step(trigger("styles")).commands.is_empty());

        let step = core.step(finished("styles"));
        assert_eq!(step.commands, vec![CoreCommand::RunBinding("styles".into())]);

        let step = core.step(finished("styles"));
        assert!(step.commands.is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn failed_run_keeps_the_loop_alive() {
        let mut core = core();
        core.step(trigger("scripts"));
        let step = core.step(RuntimeEvent::BindingFinished {
            binding: "scripts".into(),
            outcome: BindingOutcome::Failed,
        });
        assert!(step.keep_running);
        assert!(!core.is_running("scripts"));
    }

    #[test]
    fn unknown_binding_is_ignored() {
        let mut core = core();
        let step = core.step(trigger("nope"));
        assert!(step.commands.is_empty());
        assert!(step.keep_running);
    }

    fn settle(generation: u64) -> CoreCommand {
        CoreCommand::ScheduleSettle {
            generation,
            after: RuntimeOptions::default().reload_settle,
        }
    }

    #[test]
    fn output_change_while_idle_reloads_at_once() {
        let mut core = core();
        let step = core.step(RuntimeEvent::OutputChanged);
        assert_eq!(step.commands, vec![CoreCommand::NotifyReload, settle(1)]);
        assert_eq!(core.reloads(), 1);
    }

    #[test]
    fn output_change_during_run_waits_for_finish() {
        let mut core = core();
        core.step(trigger("styles"));

        // First stylesheet written, source map still to come.
        assert!(core.step(RuntimeEvent::OutputChanged).commands.is_empty());
        assert!(core.step(RuntimeEvent::OutputChanged).commands.is_empty());
        assert!(core.reload_pending());
        assert_eq!(core.reloads(), 0);

        let step = core.step(finished("styles"));
        assert_eq!(step.commands, vec![CoreCommand::NotifyReload, settle(1)]);

        // The watcher reports the last write after the run finished.
        assert!(core.step(RuntimeEvent::OutputChanged).commands.is_empty());
        assert_eq!(core.reloads(), 1);
    }

    #[test]
    fn reload_waits_for_queued_rerun() {
        let mut core = core();
        core.step(trigger("styles"));
        core.step(trigger("styles"));
        core.step(RuntimeEvent::OutputChanged);

        let step = core.step(finished("styles"));
        assert_eq!(step.commands, vec![CoreCommand::RunBinding("styles".into())]);

        let step = core.step(finished("styles"));
        assert_eq!(step.commands, vec![CoreCommand::NotifyReload, settle(1)]);
    }

    #[test]
    fn reload_waits_for_other_bindings() {
        let mut core = core();
        core.step(trigger("styles"));
        core.step(trigger("scripts"));
        core.step(RuntimeEvent::OutputChanged);

        assert!(core.step(finished("styles")).commands.is_empty());
        let step = core.step(finished("scripts"));
        assert_eq!(step.commands, vec![CoreCommand::NotifyReload, settle(1)]);
    }

    #[test]
    fn finished_run_without_output_does_not_reload() {
        let mut core = core();
        core.step(trigger("styles"));
        assert!(core.step(finished("styles")).commands.is_empty());
        assert_eq!(core.reloads(), 0);
    }

    #[test]
    fn settle_window_closes_on_matching_generation() {
        let mut core = core();
        core.step(RuntimeEvent::OutputChanged);
        core.step(RuntimeEvent::OutputChanged);
        assert_eq!(core.reloads(), 1);

        core.step(RuntimeEvent::ReloadSettled { generation: 0 });
        assert!(core.step(RuntimeEvent::OutputChanged).commands.is_empty());

        core.step(RuntimeEvent::ReloadSettled { generation: 1 });
        let step = core.step(RuntimeEvent::OutputChanged);
        assert_eq!(step.commands, vec![CoreCommand::NotifyReload, settle(2)]);
    }

    #[test]
    fn settle_window_follows_configured_debounce() {
        let options = RuntimeOptions::for_debounce(Duration::from_millis(100));
        assert_eq!(options.reload_settle, Duration::from_millis(250));
        assert!(!options.exit_when_idle);
    }

    #[test]
    fn exit_when_idle_requests_exit_after_last_run() {
        let mut core = CoreRuntime::new(
            vec!["styles".to_string()],
            1,
            RuntimeOptions {
                exit_when_idle: true,
                ..RuntimeOptions::default()
            },
        );
        core.step(trigger("styles"));
        let step = core.step(finished("styles"));
        assert!(!step.keep_running);
        assert_eq!(step.commands, vec![CoreCommand::RequestExit]);
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = core();
        assert!(!core.step(RuntimeEvent::ShutdownRequested).keep_running);
    }
}
