// src/transform/command.rs

//! External-tool collaborator.
//!
//! The command line is a template; these placeholders are substituted with
//! shell-quoted paths before it runs:
//!
//! | placeholder  | value |
//! |--------------|-------|
//! | `{input}`    | current input (per-file) or first input (batch) |
//! | `{inputs}`   | every input, space separated |
//! | `{output}`   | mapped output path of `{input}` |
//! | `{out_dir}`  | the task's destination directory |
//! | `{maps_dir}` | the source-map directory |
//! | `{base}`     | the task's base directory |

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use regex::{Captures, Regex};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{Result, SitepipeError};
use crate::exec::plan::SourceFile;
use crate::transform::{RenderContext, RenderFuture, Transform};

const PLACEHOLDER_PATTERN: &str = r"\{(input|inputs|output|out_dir|maps_dir|base)\}";

#[derive(Debug, Clone)]
pub struct CommandTransform {
    template: String,
    per_file: bool,
    placeholder: Regex,
}

impl CommandTransform {
    pub fn new(template: &str, per_file: bool) -> Result<Self> {
        let placeholder = Regex::new(PLACEHOLDER_PATTERN)
            .context("compiling command placeholder pattern")?;
        Ok(Self {
            template: template.to_string(),
            per_file,
            placeholder,
        })
    }

    /// Substitute placeholders for one invocation.
    pub fn expand(
        &self,
        ctx: &RenderContext,
        current: Option<&SourceFile>,
        inputs: &[SourceFile],
    ) -> String {
        let output = current.map(|input| ctx.output_path(input));

        self.placeholder
            .replace_all(&self.template, |caps: &Captures| match &caps[1] {
                "input" => current.map(|i| quote(&i.path)).unwrap_or_default(),
                "inputs" => inputs
                    .iter()
                    .map(|i| quote(&i.path))
                    .collect::<Vec<_>>()
                    .join(" "),
                "output" => output.as_deref().map(quote).unwrap_or_default(),
                "out_dir" => quote(&ctx.out_dir),
                "maps_dir" => quote(&ctx.maps_dir),
                "base" => quote(&ctx.base_dir),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }

    async fn render_all(&self, ctx: &RenderContext, inputs: &[SourceFile]) -> Result<Vec<PathBuf>> {
        ctx.fs
            .create_dir_all(&ctx.out_dir)
            .map_err(SitepipeError::FileSystem)?;

        if !self.per_file {
            let line = self.expand(ctx, inputs.first(), inputs);
            run_shell(ctx, &line).await?;
            return Ok(Vec::new());
        }

        let mut written = Vec::with_capacity(inputs.len());
        for input in inputs {
            let target = ctx.output_path(input);
            if let Some(parent) = target.parent() {
                ctx.fs
                    .create_dir_all(parent)
                    .map_err(SitepipeError::FileSystem)?;
            }
            let line = self.expand(ctx, Some(input), inputs);
            run_shell(ctx, &line).await?;
            written.push(target);
        }
        Ok(written)
    }
}

impl Transform for CommandTransform {
    fn render<'a>(&'a self, ctx: &'a RenderContext, inputs: &'a [SourceFile]) -> RenderFuture<'a> {
        Box::pin(self.render_all(ctx, inputs))
    }
}

/// Quote a path for the platform shell.
fn quote(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// Run `line` through the platform shell in the project root.
///
/// A non-zero exit becomes `TransformFailed` carrying the tool's stderr (or
/// stdout, if stderr is empty) as-is.
async fn run_shell(ctx: &RenderContext, line: &str) -> Result<()> {
    let task = &ctx.task.name;

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    };

    cmd.current_dir(&ctx.root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    info!(task = %task, cmd = %line, "running transform command");

    let output = cmd
        .output()
        .await
        .with_context(|| format!("spawning shell for task '{task}'"))?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        debug!(task = %task, "stdout: {}", line);
    }

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let message = if !stderr.is_empty() {
        stderr
    } else if !stdout.is_empty() {
        stdout
    } else {
        match output.status.code() {
            Some(code) => format!("command exited with status {code}"),
            None => "command terminated by signal".to_string(),
        }
    };

    Err(SitepipeError::TransformFailed {
        task: task.clone(),
        message,
    })
}
