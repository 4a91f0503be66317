// src/watch/bindings.rs

use crate::graph::node::Node;
use crate::types::StepName;
use crate::watch::patterns::FileSet;

/// A watched file set bound to one step.
///
/// The file set is kept as a list rather than merged, so exclusions declared
/// by one task never hide files another task in the same step watches.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    name: StepName,
    sets: Vec<FileSet>,
    node: Node,
}

impl WatchBinding {
    pub fn new(name: impl Into<StepName>, sets: Vec<FileSet>, node: Node) -> Self {
        Self {
            name: name.into(),
            sets,
            node,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sets(&self) -> &[FileSet] {
        &self.sets
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// True if any of the binding's file sets matches `rel_path`.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.sets.iter().any(|set| set.matches(rel_path))
    }

    /// Every declared pattern, for display.
    pub fn patterns(&self) -> Vec<&str> {
        self.sets
            .iter()
            .flat_map(|s| s.patterns().iter().map(String::as_str))
            .collect()
    }
}
