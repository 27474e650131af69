//! # Task abstraction.
//!
//! A [`Task`] is driven through four hooks:
//!
//! ```text
//! init(&mut self, ctx)   once, in dependency order, on the orchestrator's flow
//! step(&self, token)     repeatedly, on the task's own tokio task (looping only)
//! on_stop(&self)         advisory "please stop", never blocks
//! teardown(&self)        once, after the loop exited (or at join for loopless)
//! ```
//!
//! All hooks have defaults, so a request-driven task can be as small as
//! `impl Task for Handler {}`.
//!
//! Lookup by kind is an explicit capability: every `Task` is also [`AsAny`],
//! which lets the orchestrator hand out `Arc<T>` for a concrete task type.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::context::TaskContext;

/// Conversion of a task into a type-erased `Any` handle.
///
/// Implemented for every `Send + Sync + 'static` type; never implement it by hand.
pub trait AsAny: Any + Send + Sync {
    /// Converts a shared task into a shared `Any` for downcasting.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// # Unit of work managed by a service.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use servisor::{Task, TaskContext, TaskError};
///
/// #[derive(Default)]
/// struct Counter {
///     ticks: AtomicU64,
/// }
///
/// #[async_trait]
/// impl Task for Counter {
///     async fn init(&mut self, ctx: &TaskContext) -> Result<(), TaskError> {
///         if ctx.config().dryrun {
///             return Err(TaskError::skip("dryrun"));
///         }
///         Ok(())
///     }
///
///     async fn step(&self, token: &CancellationToken) -> Result<(), TaskError> {
///         tokio::select! {
///             _ = token.cancelled() => Err(TaskError::Canceled),
///             _ = tokio::time::sleep(Duration::from_millis(50)) => {
///                 self.ticks.fetch_add(1, Ordering::Relaxed);
///                 Ok(())
///             }
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Task: AsAny {
    /// Prepares the task. Runs once, after every dependency initialized.
    ///
    /// Return [`TaskError::Skip`] to leave the running set without failing the
    /// service; any other error is collected and fails service creation.
    async fn init(&mut self, ctx: &TaskContext) -> Result<(), TaskError> {
        let _ = ctx;
        Ok(())
    }

    /// One iteration of a looping task.
    ///
    /// Implementations must observe `token` at least once per call so that
    /// shutdown stays prompt. The default idles until cancelled.
    async fn step(&self, token: &CancellationToken) -> Result<(), TaskError> {
        token.cancelled().await;
        Err(TaskError::Canceled)
    }

    /// Called when the orchestrator requests a stop. Must not block.
    fn on_stop(&self) {}

    /// Releases resources after the task stopped running.
    async fn teardown(&self) {}
}

/// Shared, type-erased task handle.
pub type TaskRef = Arc<dyn Task>;
