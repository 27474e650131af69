//! # Non-owning back-reference to a service instance.
//!
//! Tasks receive a [`ServiceHandle`] through their
//! [`TaskContext`](crate::TaskContext). It holds a `Weak` pointer, so a task
//! keeping the handle never keeps the instance alive. Once the instance is
//! dropped every lookup reports [`RuntimeError::TaskNotFound`] and requests
//! become no-ops.

use std::sync::{Arc, Weak};

use crate::core::instance::Shared;
use crate::core::registry::TaskState;
use crate::error::RuntimeError;
use crate::tasks::{Task, TaskRef};

/// Weak handle to a running service instance. Cheap to clone.
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Weak<Shared>,
}

impl ServiceHandle {
    pub(crate) fn new(shared: &Arc<Shared>) -> Self {
        Self {
            inner: Arc::downgrade(shared),
        }
    }

    /// Returns `true` while the instance is alive.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Looks up an initialized task by name.
    pub fn get(&self, name: &str) -> Result<TaskRef, RuntimeError> {
        match self.inner.upgrade() {
            Some(shared) => shared.get(name),
            None => Err(RuntimeError::TaskNotFound { name: name.into() }),
        }
    }

    /// Looks up the first initialized task of type `T`.
    pub fn require<T: Task>(&self) -> Result<Arc<T>, RuntimeError> {
        match self.inner.upgrade() {
            Some(shared) => shared.require::<T>(),
            None => Err(RuntimeError::TaskNotFound {
                name: std::any::type_name::<T>().into(),
            }),
        }
    }

    /// Lifecycle state of a selected task. `None` once the instance is gone.
    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.inner.upgrade()?.state_of(name)
    }

    /// Asks the instance to stop. Returns immediately.
    pub fn request_shutdown(&self) {
        if let Some(shared) = self.inner.upgrade() {
            shared.request_shutdown();
        }
    }

    /// Asks the instance to stop and the outer run loop to build a new one.
    pub fn request_restart(&self) {
        if let Some(shared) = self.inner.upgrade() {
            shared.request_restart();
        }
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
