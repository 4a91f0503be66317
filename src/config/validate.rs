// src/config/validate.rs

use std::path::Path;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, TransformSpec};
use crate::errors::{Result, SitepipeError};
use crate::watch::path_utils::normalize_lexically;
use crate::watch::patterns::FileSet;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitepipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_project(cfg)?;
    validate_watch_section(cfg)?;
    validate_names_disjoint(cfg)?;
    validate_step_references(cfg)?;
    validate_groups_acyclic(cfg)?;
    validate_tasks(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(SitepipeError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    let output = normalize_lexically(Path::new(&cfg.project.output));
    if output.as_os_str().is_empty() {
        return Err(SitepipeError::ConfigError(
            "[project].output must name a directory below the project root".to_string(),
        ));
    }
    for keep in &cfg.project.keep {
        if keep.is_empty() || keep.contains('/') || keep.contains('\\') {
            return Err(SitepipeError::ConfigError(format!(
                "[project].keep entries must be plain file names (got '{keep}')"
            )));
        }
    }
    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.queue_length == 0 {
        return Err(SitepipeError::ConfigError(
            "[watch].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_names_disjoint(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.group.keys() {
        if cfg.task.contains_key(name) {
            return Err(SitepipeError::ConfigError(format!(
                "'{name}' is declared both as a task and as a group"
            )));
        }
    }
    Ok(())
}

fn step_exists(cfg: &RawConfigFile, name: &str) -> bool {
    cfg.task.contains_key(name) || cfg.group.contains_key(name)
}

fn validate_step_references(cfg: &RawConfigFile) -> Result<()> {
    for step in cfg.build.steps.iter() {
        if !step_exists(cfg, step) {
            return Err(SitepipeError::StepNotFound(format!(
                "[build].steps references unknown step '{step}'"
            )));
        }
    }

    for step in cfg.watch.extra_steps.iter() {
        if !step_exists(cfg, step) {
            return Err(SitepipeError::StepNotFound(format!(
                "[watch].extra_steps references unknown step '{step}'"
            )));
        }
    }

    for (name, group) in cfg.group.iter() {
        if group.steps.is_empty() {
            return Err(SitepipeError::ConfigError(format!(
                "group '{name}' must list at least one step"
            )));
        }
        for step in group.steps.iter() {
            if step == name {
                return Err(SitepipeError::GraphCycle(format!(
                    "group '{name}' cannot contain itself"
                )));
            }
            if !step_exists(cfg, step) {
                return Err(SitepipeError::StepNotFound(format!(
                    "group '{name}' references unknown step '{step}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_groups_acyclic(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: group -> member.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys().chain(cfg.group.keys()) {
        graph.add_node(name.as_str());
    }

    for (name, group) in cfg.group.iter() {
        for step in group.steps.iter() {
            graph.add_edge(name.as_str(), step.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SitepipeError::GraphCycle(format!(
            "cycle detected in group nesting involving '{}'",
            cycle.node_id()
        ))),
    }
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    let output = normalize_lexically(Path::new(&cfg.project.output));

    for (name, task) in cfg.task.iter() {
        if !task.src.iter().any(|p| !p.starts_with('!')) {
            return Err(SitepipeError::ConfigError(format!(
                "task '{name}' needs at least one non-negated `src` pattern"
            )));
        }

        FileSet::new(&task.src).map_err(|e| {
            SitepipeError::ConfigError(format!("task '{name}' has an invalid `src`: {e:#}"))
        })?;

        if let Some(watch) = &task.watch {
            FileSet::new(watch).map_err(|e| {
                SitepipeError::ConfigError(format!("task '{name}' has an invalid `watch`: {e:#}"))
            })?;
        }

        let dest = normalize_lexically(Path::new(&task.dest));
        if !dest.starts_with(&output) {
            return Err(SitepipeError::ConfigError(format!(
                "task '{name}' writes to '{}', outside the output root '{}'",
                task.dest, cfg.project.output
            )));
        }

        match &task.transform {
            TransformSpec::Command { command, .. } if command.trim().is_empty() => {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{name}' has an empty command"
                )));
            }
            TransformSpec::Concat { output, .. } if output.trim().is_empty() => {
                return Err(SitepipeError::ConfigError(format!(
                    "task '{name}' concat transform needs an `output` file name"
                )));
            }
            _ => {}
        }
    }

    for (name, group) in cfg.group.iter() {
        if let Some(watch) = &group.watch {
            FileSet::new(watch).map_err(|e| {
                SitepipeError::ConfigError(format!("group '{name}' has an invalid `watch`: {e:#}"))
            })?;
        }
    }

    Ok(())
}
