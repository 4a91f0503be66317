// src/graph/builder.rs

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ConfigFile;
use crate::errors::{Result, SitepipeError};
use crate::exec::task::Task;
use crate::graph::node::Node;
use crate::types::StepName;
use crate::watch::bindings::WatchBinding;
use crate::watch::patterns::FileSet;

/// The assembled graph: the build pipeline plus the watch bindings that
/// `default` registers.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// `Sequential([Clean, step_1, ..., step_n])`.
    pub build: Node,
    pub bindings: Vec<WatchBinding>,
}

/// Builds nodes from a validated [`ConfigFile`].
///
/// Validation already guarantees that every referenced step exists and that
/// group nesting is acyclic, so recursion here terminates.
#[derive(Debug)]
pub struct GraphBuilder<'a> {
    cfg: &'a ConfigFile,
    tasks: HashMap<StepName, Arc<Task>>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(cfg: &'a ConfigFile) -> Result<Self> {
        let mut tasks = HashMap::new();
        for (name, tc) in cfg.tasks() {
            tasks.insert(name.clone(), Arc::new(Task::from_config(name, tc)?));
        }
        Ok(Self { cfg, tasks })
    }

    /// Node for a task or group name.
    pub fn step(&self, name: &str) -> Result<Node> {
        if let Some(task) = self.tasks.get(name) {
            return Ok(Node::Task(Arc::clone(task)));
        }

        let group = self
            .cfg
            .groups()
            .get(name)
            .ok_or_else(|| SitepipeError::StepNotFound(name.to_string()))?;

        let children = group
            .steps
            .iter()
            .map(|child| self.step(child))
            .collect::<Result<Vec<_>>>()?;

        Ok(Node::composite(group.mode, Some(name.to_string()), children))
    }

    /// Clean followed by every `[build].steps` entry, in order.
    pub fn build_pipeline(&self) -> Result<Node> {
        let mut children = vec![Node::Clean];
        for step in &self.cfg.build().steps {
            children.push(self.step(step)?);
        }
        Ok(Node::Sequential {
            name: Some("build".to_string()),
            children,
        })
    }

    /// One binding per watched step.
    ///
    /// A group's explicit `watch` wins; otherwise the binding matches
    /// whatever any member task watches.
    pub fn watch_bindings(&self) -> Result<Vec<WatchBinding>> {
        let mut bindings = Vec::new();
        for step in self.cfg.watched_steps() {
            let node = self.step(&step)?;

            let explicit = self.cfg.groups().get(&step).and_then(|g| g.watch.as_ref());
            let sets = match explicit {
                Some(patterns) => vec![FileSet::new(patterns).map_err(|e| {
                    SitepipeError::ConfigError(format!("group '{step}' has an invalid `watch`: {e:#}"))
                })?],
                None => node.watch_sets(),
            };

            bindings.push(WatchBinding::new(step, sets, node));
        }
        Ok(bindings)
    }

    pub fn assemble(&self) -> Result<Pipeline> {
        Ok(Pipeline {
            build: self.build_pipeline()?,
            bindings: self.watch_bindings()?,
        })
    }
}
