// src/engine/mod.rs

//! Watch-mode engine.
//!
//! This module ties together:
//! - the rerun queue (what happens when a binding fires while it runs)
//! - the main runtime event loop that reacts to:
//!   - file-watch triggers
//!   - binding completion
//!   - output changes (live reload, held back while bindings run)
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::types::StepName;

/// Outcome of one bound node run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOutcome {
    Success,
    Failed,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Exit once no binding is running or queued. `default` never sets
    /// this; tests do.
    pub exit_when_idle: bool,
    /// After a run's reload goes out, output changes arriving within this
    /// window belong to that run and are absorbed. Should cover the
    /// watcher's debounce window.
    pub reload_settle: Duration,
}

impl RuntimeOptions {
    /// Settle window for a watcher debouncing over `debounce`.
    pub fn for_debounce(debounce: Duration) -> Self {
        Self {
            reload_settle: debounce * 2 + SETTLE_MARGIN,
            ..Self::default()
        }
    }
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            exit_when_idle: false,
            reload_settle: Duration::from_millis(250),
        }
    }
}

const SETTLE_MARGIN: Duration = Duration::from_millis(50);

/// Events flowing into the runtime from the watcher, bound runs and signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A binding's file set changed.
    BindingTriggered { binding: StepName },
    /// A bound node run settled.
    BindingFinished {
        binding: StepName,
        outcome: BindingOutcome,
    },
    /// Something under the output root changed.
    OutputChanged,
    /// The settle window opened by `CoreCommand::ScheduleSettle` elapsed.
    ReloadSettled { generation: u64 },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::RerunQueue;
pub use runtime::Runtime;
