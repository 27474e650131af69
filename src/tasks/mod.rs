//! # Task abstractions and descriptors.
//!
//! This module provides the task-related types:
//! - [`Task`] - trait implemented by every unit of work
//! - [`TaskDescriptor`] - declaration of a task kind (name, deps, mode, options)
//! - [`TaskContext`] - what a task sees during `init`
//! - [`TaskFn`] - closure-backed looping task

mod context;
mod descriptor;
mod task;
mod task_fn;

pub use context::TaskContext;
pub use descriptor::{INTERVAL_OPTION, TaskDescriptor, TaskMode};
pub use task::{AsAny, Task, TaskRef};
pub use task_fn::TaskFn;
