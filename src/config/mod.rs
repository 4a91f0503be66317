// src/config/mod.rs

//! Configuration loading and validation for sitepipe.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: step references, group cycles, globs and output paths.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, load_and_validate, load_from_path};
pub use model::{
    BuildSection, ConfigFile, GroupConfig, ProjectSection, RawConfigFile, ServeSection,
    TaskConfig, TransformSpec, WatchSection,
};
