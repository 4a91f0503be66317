// src/cli.rs

//! CLI argument parsing using `clap`.

use std::fmt;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build static-site assets in a fixed pipeline, then watch and live-reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Entry point to run.
    #[arg(value_enum, default_value_t = EntryPoint::Default)]
    pub entry: EntryPoint,

    /// Path to the config file (TOML).
    ///
    /// Relative paths inside the config are resolved against this file's
    /// directory.
    #[arg(long, value_name = "PATH", default_value = "Sitepipe.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the pipeline and watch bindings, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// The three externally invocable entry points.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum EntryPoint {
    /// Empty the output root, keeping marker files.
    Clean,
    /// Clean, then run every build step once.
    Build,
    /// Build, then watch sources and serve the output root with live reload.
    Default,
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryPoint::Clean => "clean",
            EntryPoint::Build => "build",
            EntryPoint::Default => "default",
        };
        f.write_str(s)
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
