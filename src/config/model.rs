// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{CompositeMode, HashStorageMode, StepName};

/// Top-level configuration exactly as read from `Sitepipe.toml`.
///
/// ```toml
/// [project]
/// output = "dist"
///
/// [build]
/// steps = ["markup", "styles"]
///
/// [task.markup]
/// src = ["app/*.html"]
/// dest = "dist"
/// transform = { kind = "copy" }
/// ```
///
/// Everything except `[task.*]` has defaults. Use [`ConfigFile::try_from`]
/// to obtain a validated config.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub build: BuildSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<StepName, TaskConfig>,

    /// All groups from `[group.<name>]`.
    #[serde(default)]
    pub group: BTreeMap<StepName, GroupConfig>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see
/// `config::validate`), so holders can rely on every step reference
/// resolving and on group nesting being acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    project: ProjectSection,
    serve: ServeSection,
    watch: WatchSection,
    build: BuildSection,
    task: BTreeMap<StepName, TaskConfig>,
    group: BTreeMap<StepName, GroupConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            serve: raw.serve,
            watch: raw.watch,
            build: raw.build,
            task: raw.task,
            group: raw.group,
        }
    }

    pub fn project(&self) -> &ProjectSection {
        &self.project
    }

    pub fn serve(&self) -> &ServeSection {
        &self.serve
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }

    pub fn build(&self) -> &BuildSection {
        &self.build
    }

    pub fn tasks(&self) -> &BTreeMap<StepName, TaskConfig> {
        &self.task
    }

    pub fn groups(&self) -> &BTreeMap<StepName, GroupConfig> {
        &self.group
    }

    /// Steps bound to the watcher in `default`: the build steps followed by
    /// any watch-only extras, without duplicates.
    pub fn watched_steps(&self) -> Vec<StepName> {
        let mut steps = self.build.steps.clone();
        for extra in &self.watch.extra_steps {
            if !steps.contains(extra) {
                steps.push(extra.clone());
            }
        }
        steps
    }
}

/// `[project]` section: the output root and what survives a clean.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Output root, relative to the config directory.
    #[serde(default = "default_output")]
    pub output: String,

    /// Names of top-level entries in the output root that `clean` keeps.
    #[serde(default = "default_keep")]
    pub keep: Vec<String>,

    /// Source-map directory name, created inside the output root.
    #[serde(default = "default_maps")]
    pub maps: String,
}

fn default_output() -> String {
    "dist".to_string()
}

fn default_keep() -> Vec<String> {
    vec![".gitkeep".to_string()]
}

fn default_maps() -> String {
    "maps".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            output: default_output(),
            keep: default_keep(),
            maps: default_maps(),
        }
    }
}

/// `[serve]` section: the live-reload development server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Window in which rapid filesystem events are coalesced into one batch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of re-runs remembered for a binding that is already
    /// running.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Only re-run a binding when the content of its files changed.
    #[serde(default)]
    pub use_hash: bool,

    #[serde(default)]
    pub hash_storage: HashStorageMode,

    /// Steps that are watched in `default` but not part of `build`.
    #[serde(default)]
    pub extra_steps: Vec<StepName>,
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_queue_length() -> usize {
    1
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            queue_length: default_queue_length(),
            use_hash: false,
            hash_storage: HashStorageMode::default(),
            extra_steps: Vec::new(),
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BuildSection {
    /// Steps run after clean, in this order.
    #[serde(default)]
    pub steps: Vec<StepName>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Input glob patterns, relative to the config directory. A leading `!`
    /// turns a pattern into an exclusion.
    pub src: Vec<String>,

    /// Directory the input paths are made relative to when mapping them into
    /// `dest`. Defaults to the static prefix of the first pattern.
    #[serde(default)]
    pub base: Option<String>,

    /// Output directory; must lie inside `[project].output`.
    pub dest: String,

    pub transform: TransformSpec,

    /// Patterns that re-run this task in watch mode. Defaults to `src`.
    #[serde(default)]
    pub watch: Option<Vec<String>>,

    /// Skip inputs whose output is already up to date (per-file transforms).
    #[serde(default)]
    pub only_newer: bool,

    /// Create the source-map directory before the transform runs.
    #[serde(default)]
    pub sourcemaps: bool,
}

/// `[group.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub mode: CompositeMode,

    /// Tasks or other groups, in order.
    pub steps: Vec<StepName>,

    /// Patterns that re-run this group in watch mode. Defaults to the union
    /// of the member tasks' watch sets.
    #[serde(default)]
    pub watch: Option<Vec<String>>,
}

/// Which collaborator a task hands its inputs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransformSpec {
    /// External tool run through the platform shell.
    Command {
        command: String,
        /// Run once per input file instead of once for the whole set.
        #[serde(default)]
        per_file: bool,
        /// Replacement extension for mapped output paths (per-file mode).
        #[serde(default)]
        extension: Option<String>,
    },
    /// Copy each input into `dest`, keeping its path relative to `base`.
    Copy,
    /// Concatenate every input, in order, into `dest/<output>`.
    Concat {
        output: String,
        #[serde(default)]
        separator: Option<String>,
    },
}

impl TransformSpec {
    /// Short label for logs and dry-run output.
    pub fn kind(&self) -> &'static str {
        match self {
            TransformSpec::Command { .. } => "command",
            TransformSpec::Copy => "copy",
            TransformSpec::Concat { .. } => "concat",
        }
    }

    /// Extension that per-file outputs are rewritten to, if any.
    pub fn output_extension(&self) -> Option<&str> {
        match self {
            TransformSpec::Command { extension, .. } => extension.as_deref(),
            _ => None,
        }
    }
}
