// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`task`] defines the immutable `Task` built from `[task.<name>]`.
//! - [`plan`] resolves a task's globs into concrete inputs.
//! - [`backend`] provides the `TaskExecutor` trait and the production
//!   `RealExecutor`, which tests replace with a fake.

pub mod backend;
pub mod plan;
pub mod task;

pub use backend::{RealExecutor, TaskExecutor, TaskFuture, TaskReport};
pub use plan::{SourceFile, TaskPlan, plan_task};
pub use task::Task;
