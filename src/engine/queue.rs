// src/engine/queue.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::types::StepName;

/// Tracks which bindings are running and how many re-runs each has pending.
///
/// Semantics:
/// - A binding triggered while idle starts right away.
/// - A binding triggered while it is already running gets one more pending
///   run, up to `max_pending` (the `[watch].queue_length`, default 1).
///   Further triggers are dropped; the pending run will see their changes.
/// - When a run finishes, one pending run (if any) is started.
///
/// Different bindings never wait for each other.
#[derive(Debug)]
pub struct RerunQueue {
    max_pending: usize,
    running: BTreeSet<StepName>,
    pending: BTreeMap<StepName, usize>,
}

impl RerunQueue {
    /// `max_pending` is clamped to at least 1.
    pub fn new(max_pending: usize) -> Self {
        Self {
            max_pending: max_pending.max(1),
            running: BTreeSet::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn is_running(&self, binding: &str) -> bool {
        self.running.contains(binding)
    }

    pub fn pending_for(&self, binding: &str) -> usize {
        self.pending.get(binding).copied().unwrap_or(0)
    }

    /// No binding running and nothing queued.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.pending.is_empty()
    }

    /// Record a trigger. Returns true if the binding should start now.
    pub fn trigger(&mut self, binding: &str) -> bool {
        if !self.running.contains(binding) {
            self.running.insert(binding.to_string());
            return true;
        }

        let count = self.pending.entry(binding.to_string()).or_insert(0);
        if *count < self.max_pending {
            *count += 1;
            debug!(binding = %binding, pending = *count, "binding busy; queued re-run");
        } else {
            warn!(
                binding = %binding,
                max_pending = self.max_pending,
                "re-run queue full; dropping trigger"
            );
        }
        false
    }

    /// Record completion. Returns true if a queued re-run should start now;
    /// the binding then stays marked as running.
    pub fn finish(&mut self, binding: &str) -> bool {
        match self.pending.get_mut(binding) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.pending.remove(binding);
                }
                debug!(binding = %binding, "starting queued re-run");
                true
            }
            _ => {
                self.pending.remove(binding);
                self.running.remove(binding);
                false
            }
        }
    }
}
