//! # Function-backed looping task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut` and calls it
//! once per loop iteration. Each call produces a fresh future; shared state
//! belongs in an `Arc<...>` captured by the closure.
//!
//! Use [`TaskDescriptor::from_fn`] to declare one. The closure is cloned for
//! every service instance, so a restart starts from the captured state.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use servisor::{TaskDescriptor, TaskError};
//!
//! let heartbeat = TaskDescriptor::from_fn("Heartbeat", |token: CancellationToken| async move {
//!     if token.is_cancelled() {
//!         return Err(TaskError::Canceled);
//!     }
//!     tracing::debug!("beat");
//!     Ok(())
//! })
//! .with_interval(Duration::from_secs(5));
//!
//! assert_eq!(heartbeat.name(), "Heartbeat");
//! ```

use std::borrow::Cow;
use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::descriptor::TaskDescriptor;
use crate::tasks::task::Task;

/// Looping task whose step is a closure.
#[derive(Debug, Clone)]
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn step(&self, token: &CancellationToken) -> Result<(), TaskError> {
        (self.f)(token.clone()).await
    }
}

impl TaskDescriptor {
    /// Declares a looping task whose step is `f`.
    pub fn from_fn<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        TaskDescriptor::new(name, move || TaskFn::new(f.clone()))
    }
}
