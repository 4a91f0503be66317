// src/graph/node.rs

use std::fmt::{self, Write as _};
use std::sync::Arc;

use crate::exec::task::Task;
use crate::types::{CompositeMode, StepName};
use crate::watch::patterns::FileSet;

/// A node of the task graph.
///
/// Composites carry the group name they were built from (if any) so logs
/// and the dry-run tree can refer to them.
#[derive(Debug, Clone)]
pub enum Node {
    /// Empty the output root.
    Clean,
    Task(Arc<Task>),
    Sequential {
        name: Option<StepName>,
        children: Vec<Node>,
    },
    Concurrent {
        name: Option<StepName>,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn task(task: Task) -> Self {
        Node::Task(Arc::new(task))
    }

    pub fn sequential(children: Vec<Node>) -> Self {
        Node::Sequential {
            name: None,
            children,
        }
    }

    pub fn concurrent(children: Vec<Node>) -> Self {
        Node::Concurrent {
            name: None,
            children,
        }
    }

    pub fn composite(mode: CompositeMode, name: Option<StepName>, children: Vec<Node>) -> Self {
        match mode {
            CompositeMode::Sequential => Node::Sequential { name, children },
            CompositeMode::Concurrent => Node::Concurrent { name, children },
        }
    }

    /// Name used in logs.
    pub fn label(&self) -> String {
        match self {
            Node::Clean => "clean".to_string(),
            Node::Task(task) => task.name.clone(),
            Node::Sequential { name, .. } => {
                name.clone().unwrap_or_else(|| "<sequential>".to_string())
            }
            Node::Concurrent { name, .. } => {
                name.clone().unwrap_or_else(|| "<concurrent>".to_string())
            }
        }
    }

    /// Every task below this node, depth first, in declared order.
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        let mut out = Vec::new();
        self.collect_tasks(&mut out);
        out
    }

    fn collect_tasks(&self, out: &mut Vec<Arc<Task>>) {
        match self {
            Node::Clean => {}
            Node::Task(task) => out.push(Arc::clone(task)),
            Node::Sequential { children, .. } | Node::Concurrent { children, .. } => {
                for child in children {
                    child.collect_tasks(out);
                }
            }
        }
    }

    /// Watch sets of every task below this node.
    pub fn watch_sets(&self) -> Vec<FileSet> {
        self.tasks().iter().map(|t| t.watch.clone()).collect()
    }

    /// Indented, human-readable tree (used by `--dry-run`).
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = match self {
            Node::Clean => writeln!(out, "{indent}- clean"),
            Node::Task(task) => writeln!(
                out,
                "{indent}- task {} [{}] {:?} -> {}",
                task.name,
                task.transform.kind(),
                task.src.patterns(),
                task.dest.display()
            ),
            Node::Sequential { children, .. } | Node::Concurrent { children, .. } => {
                let mode = if matches!(self, Node::Sequential { .. }) {
                    CompositeMode::Sequential
                } else {
                    CompositeMode::Concurrent
                };
                let r = writeln!(out, "{indent}- {} ({mode})", self.label());
                for child in children {
                    child.render_into(out, depth + 1);
                }
                r
            }
        };
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_tree())
    }
}
