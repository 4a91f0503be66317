// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitepipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Cycle detected in step groups: {0}")]
    GraphCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A transform collaborator rejected its input. `message` is the
    /// collaborator's own report, passed through untouched.
    #[error("task '{task}' failed: {message}")]
    TransformFailed { task: String, message: String },

    #[error("file system error: {0:#}")]
    FileSystem(anyhow::Error),

    /// More than one sibling of a concurrent group failed.
    #[error("{} concurrent steps failed: {}", .0.len(), join_errors(.0))]
    Concurrent(Vec<SitepipeError>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SitepipeError {
    /// True for failures reported by a transform collaborator, as opposed to
    /// configuration or filesystem problems.
    pub fn is_transform_failure(&self) -> bool {
        match self {
            SitepipeError::TransformFailed { .. } => true,
            SitepipeError::Concurrent(errs) => errs.iter().all(|e| e.is_transform_failure()),
            _ => false,
        }
    }
}

fn join_errors(errs: &[SitepipeError]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitepipeError>;
