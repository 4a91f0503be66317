use std::fmt;

use serde::Deserialize;

/// Canonical name of a task, group or watch binding.
pub type StepName = String;

/// How the children of a group are composed.
///
/// - `Sequential`: one at a time, in listed order, stopping at the first
///   failure.
/// - `Concurrent`: all at once; the group fails if any child fails, after
///   every child has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeMode {
    Sequential,
    Concurrent,
}

impl Default for CompositeMode {
    fn default() -> Self {
        CompositeMode::Sequential
    }
}

impl fmt::Display for CompositeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeMode::Sequential => f.write_str("sequential"),
            CompositeMode::Concurrent => f.write_str("concurrent"),
        }
    }
}

/// Mode for storing watch-binding content hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStorageMode {
    /// Store hashes in a file (`.sitepipe/hashes`).
    File,
    /// Store hashes in memory only (lost on restart).
    Memory,
}

impl Default for HashStorageMode {
    fn default() -> Self {
        HashStorageMode::Memory
    }
}
