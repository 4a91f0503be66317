// src/graph/mod.rs

//! Task graph: nodes, assembly from config, and execution.
//!
//! - [`node`] holds the `Node` tree (clean, task, sequential, concurrent).
//! - [`builder`] turns a validated config into the build pipeline and the
//!   watch bindings.
//! - [`runner`] executes nodes.

pub mod builder;
pub mod node;
pub mod runner;

pub use builder::{GraphBuilder, Pipeline};
pub use node::Node;
pub use runner::Runner;
