//! # Task table: live tasks of one service instance.
//!
//! [`TaskTable`] holds the initialized tasks in resolved order. It is appended
//! to while the instance is being created (so a task's `init` can look up the
//! tasks initialized before it) and is read-only afterwards.
//!
//! Each entry is a [`TaskSlot`]: the task value, its lifecycle state and, for
//! looping tasks, the join handle plus cancellation token of its driver.
//!
//! ## Stop / join
//! ```text
//! stop():  Ready|Running ──CAS──► Stopping → on_stop() → token.cancel() → TaskStopRequested
//! join():  timeout(grace, handle)
//!            ├─ Ok           → (loop already ran teardown)
//!            ├─ panic        → error! + TaskJoinFailed
//!            └─ grace hit    → abort() + error! + TaskJoinFailed
//!          loopless          → teardown()
//!          ───────────────► Stopped → TaskStopped
//! ```
//!
//! A panic in `on_stop` or in a loopless `teardown` is caught and reported as
//! `TaskJoinFailed`; the slot still reaches `Stopped`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error};

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;
use crate::tasks::{TaskMode, TaskRef};

/// Lifecycle state of a task within one service instance.
///
/// Transitions are forward only:
/// ```text
/// Created → Initializing → Skipped
///                        → Failed
///                        → Ready → Running → Stopping → Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Initializing,
    Skipped,
    Failed,
    Ready,
    Running,
    Stopping,
    Stopped,
}

impl TaskState {
    /// Returns `true` once the task reached a state it never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Skipped | TaskState::Failed | TaskState::Stopped)
    }
}

/// One initialized task bound to a service instance.
pub(crate) struct TaskSlot {
    name: Arc<str>,
    task: TaskRef,
    mode: TaskMode,
    interval: Option<Duration>,
    backoff: BackoffPolicy,
    span: Span,
    state: Mutex<TaskState>,
    token: CancellationToken,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    pub(crate) fn new(
        name: Arc<str>,
        task: TaskRef,
        mode: TaskMode,
        interval: Option<Duration>,
        backoff: BackoffPolicy,
        span: Span,
    ) -> Self {
        Self {
            name,
            task,
            mode,
            interval,
            backoff,
            span,
            state: Mutex::new(TaskState::Ready),
            token: CancellationToken::new(),
            driver: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn task(&self) -> &TaskRef {
        &self.task
    }

    pub(crate) fn mode(&self) -> TaskMode {
        self.mode
    }

    pub(crate) fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub(crate) fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub(crate) fn state(&self) -> TaskState {
        *self.state.lock()
    }

    /// Moves `Ready` to `Running`. Returns `false` if the slot left `Ready`.
    pub(crate) fn mark_running(&self) -> bool {
        let mut state = self.state.lock();
        if *state == TaskState::Ready {
            *state = TaskState::Running;
            true
        } else {
            false
        }
    }

    /// Stores the driver of a looping task.
    pub(crate) fn attach(&self, handle: JoinHandle<()>) {
        *self.driver.lock() = Some(handle);
    }

    /// Requests the task to stop. Returns `false` if a stop was already requested.
    pub(crate) fn stop(&self, bus: &Bus) -> bool {
        {
            let mut state = self.state.lock();
            match *state {
                TaskState::Ready | TaskState::Running => *state = TaskState::Stopping,
                _ => return false,
            }
        }

        debug!(parent: &self.span, "stop requested");
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| self.task.on_stop())) {
            self.report_panic("on_stop", panic_message(panic), bus);
        }
        self.token.cancel();
        bus.publish(Event::new(EventKind::TaskStopRequested).with_task(self.name.clone()));
        true
    }

    /// Waits for the task to finish, at most `grace` for a looping driver.
    pub(crate) async fn join(&self, grace: Duration, bus: &Bus) {
        let driver = self.driver.lock().take();

        match driver {
            Some(mut handle) => match time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_panic() => {
                    self.report_panic("loop", panic_message(e.into_panic()), bus);
                }
                Ok(Err(_)) => {}
                Err(_elapsed) => {
                    handle.abort();
                    let err = RuntimeError::GraceExceeded {
                        task: self.name.to_string(),
                        grace,
                    };
                    error!(parent: &self.span, grace = ?grace, "{err}; aborting");
                    bus.publish(
                        Event::new(EventKind::TaskJoinFailed)
                            .with_task(self.name.clone())
                            .with_reason(err.to_string()),
                    );
                }
            },
            None if self.mode == TaskMode::Loopless => {
                let teardown = self.task.teardown().instrument(self.span.clone());
                if let Err(panic) = AssertUnwindSafe(teardown).catch_unwind().await {
                    self.report_panic("teardown", panic_message(panic), bus);
                }
            }
            None => {}
        }

        *self.state.lock() = TaskState::Stopped;
        debug!(parent: &self.span, "stopped");
        bus.publish(Event::new(EventKind::TaskStopped).with_task(self.name.clone()));
    }

    fn report_panic(&self, hook: &str, reason: String, bus: &Bus) {
        error!(parent: &self.span, hook, panic = %reason, "task panicked");
        bus.publish(
            Event::new(EventKind::TaskJoinFailed)
                .with_task(self.name.clone())
                .with_reason(reason),
        );
    }
}

/// Initialized tasks of one instance, in resolved order.
#[derive(Default)]
pub(crate) struct TaskTable {
    slots: RwLock<Vec<Arc<TaskSlot>>>,
}

impl TaskTable {
    pub(crate) fn push(&self, slot: Arc<TaskSlot>) {
        self.slots.write().push(slot);
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<TaskSlot>> {
        self.slots
            .read()
            .iter()
            .find(|slot| &**slot.name() == name)
            .cloned()
    }

    /// Snapshot of every slot in resolved order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<TaskSlot>> {
        self.slots.read().clone()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.slots
            .read()
            .iter()
            .map(|slot| slot.name().to_string())
            .collect()
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
