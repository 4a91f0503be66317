#![allow(dead_code)]

use std::collections::BTreeMap;

use sitepipe::config::{
    BuildSection, ConfigFile, GroupConfig, ProjectSection, RawConfigFile, ServeSection, TaskConfig,
    TransformSpec, WatchSection,
};
use sitepipe::errors::Result;
use sitepipe::types::{CompositeMode, HashStorageMode};

/// Builder for `ConfigFile` to simplify test setup.
///
/// The live-reload server starts disabled so tests never bind a port unless
/// they ask for one.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                project: ProjectSection::default(),
                serve: ServeSection {
                    enabled: false,
                    ..ServeSection::default()
                },
                watch: WatchSection::default(),
                build: BuildSection::default(),
                task: BTreeMap::new(),
                group: BTreeMap::new(),
            },
        }
    }

    pub fn output(mut self, dir: &str) -> Self {
        self.config.project.output = dir.to_string();
        self
    }

    pub fn keep(mut self, names: &[&str]) -> Self {
        self.config.project.keep = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_group(mut self, name: &str, group: GroupConfig) -> Self {
        self.config.group.insert(name.to_string(), group);
        self
    }

    pub fn build_steps(mut self, steps: &[&str]) -> Self {
        self.config.build.steps = steps.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn extra_watch_steps(mut self, steps: &[&str]) -> Self {
        self.config.watch.extra_steps = steps.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn queue_length(mut self, n: usize) -> Self {
        self.config.watch.queue_length = n;
        self
    }

    pub fn use_hash(mut self, val: bool, storage: HashStorageMode) -> Self {
        self.config.watch.use_hash = val;
        self.config.watch.hash_storage = storage;
        self
    }

    pub fn serve(mut self, host: &str, port: u16) -> Self {
        self.config.serve = ServeSection {
            enabled: true,
            host: host.to_string(),
            port,
        };
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    fn with_transform(src: &str, dest: &str, transform: TransformSpec) -> Self {
        Self {
            task: TaskConfig {
                src: vec![src.to_string()],
                base: None,
                dest: dest.to_string(),
                transform,
                watch: None,
                only_newer: false,
                sourcemaps: false,
            },
        }
    }

    pub fn copy(src: &str, dest: &str) -> Self {
        Self::with_transform(src, dest, TransformSpec::Copy)
    }

    pub fn concat(src: &str, dest: &str, output: &str) -> Self {
        Self::with_transform(
            src,
            dest,
            TransformSpec::Concat {
                output: output.to_string(),
                separator: None,
            },
        )
    }

    pub fn command(src: &str, dest: &str, command: &str) -> Self {
        Self::with_transform(
            src,
            dest,
            TransformSpec::Command {
                command: command.to_string(),
                per_file: false,
                extension: None,
            },
        )
    }

    pub fn per_file(mut self, extension: Option<&str>) -> Self {
        if let TransformSpec::Command {
            per_file,
            extension: ext,
            ..
        } = &mut self.task.transform
        {
            *per_file = true;
            *ext = extension.map(str::to_string);
        }
        self
    }

    pub fn separator(mut self, sep: &str) -> Self {
        if let TransformSpec::Concat { separator, .. } = &mut self.task.transform {
            *separator = Some(sep.to_string());
        }
        self
    }

    /// Add another `src` pattern (prefix with `!` to exclude).
    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn base(mut self, base: &str) -> Self {
        self.task.base = Some(base.to_string());
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.task
            .watch
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    pub fn only_newer(mut self, val: bool) -> Self {
        self.task.only_newer = val;
        self
    }

    pub fn sourcemaps(mut self, val: bool) -> Self {
        self.task.sourcemaps = val;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `GroupConfig`.
pub struct GroupConfigBuilder {
    group: GroupConfig,
}

impl GroupConfigBuilder {
    pub fn new(mode: CompositeMode, steps: &[&str]) -> Self {
        Self {
            group: GroupConfig {
                mode,
                steps: steps.iter().map(|s| s.to_string()).collect(),
                watch: None,
            },
        }
    }

    pub fn sequential(steps: &[&str]) -> Self {
        Self::new(CompositeMode::Sequential, steps)
    }

    pub fn concurrent(steps: &[&str]) -> Self {
        Self::new(CompositeMode::Concurrent, steps)
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.group
            .watch
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    pub fn build(self) -> GroupConfig {
        self.group
    }
}
