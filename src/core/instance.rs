//! # ServiceInstance: one run of a service.
//!
//! An instance owns the initialized tasks of one create → start → join cycle.
//! A restart drops it and builds a fresh one from the same declarations and
//! the same `Arc<ServiceConfig>`.
//!
//! ## Phases
//! ```text
//! create()  select → instantiate → init (resolved order) → Creation::Ready
//!                                                        → Err(InitFailed)
//! start()   spawn TaskActor per looping task, mark loopless running,
//!           spawn signal listener (optional)
//! join()    wait in ≤100ms slices until the stop flag is set → shutdown()
//! shutdown() stop flag → reverse order { stop(); join(grace) } → ServiceStopped
//! ```
//!
//! ## Rules
//! - No loop is spawned before every `init` completed
//! - Stop/join run **exactly once**, however many callers ask for it
//! - Shutdown-path problems are logged and never interrupt the pass

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::core::actor::TaskActor;
use crate::core::config::ServiceConfig;
use crate::core::handle::ServiceHandle;
use crate::core::registry::{TaskSlot, TaskState, TaskTable, panic_message};
use crate::core::shutdown;
use crate::error::{InitFailure, RuntimeError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{INTERVAL_OPTION, Task, TaskContext, TaskDescriptor, TaskMode, TaskRef};

/// Result of [`ServiceInstance::create`].
pub enum Creation {
    /// Every selected task initialized (or skipped itself).
    Ready(ServiceInstance),
    /// The selection was empty: the names of every declared task, in resolved order.
    Listed(Vec<String>),
}

/// State shared between the instance, its handles and the signal listener.
pub(crate) struct Shared {
    name: Arc<str>,
    config: Arc<ServiceConfig>,
    table: TaskTable,
    /// Selected tasks that have no slot: not initialized yet, skipped or failed.
    unslotted: Mutex<Vec<(String, TaskState)>>,
    bus: Bus,
    stop: AtomicBool,
    restart: AtomicBool,
    started: AtomicBool,
    wake: CancellationToken,
    stopped: OnceCell<()>,
    terminated: CancellationToken,
}

impl Shared {
    pub(crate) fn get(&self, name: &str) -> Result<TaskRef, RuntimeError> {
        self.table
            .get(name)
            .map(|slot| slot.task().clone())
            .ok_or_else(|| RuntimeError::TaskNotFound { name: name.into() })
    }

    pub(crate) fn require<T: Task>(&self) -> Result<Arc<T>, RuntimeError> {
        self.table
            .snapshot()
            .into_iter()
            .find_map(|slot| slot.task().clone().into_any_arc().downcast::<T>().ok())
            .ok_or_else(|| RuntimeError::TaskNotFound {
                name: std::any::type_name::<T>().into(),
            })
    }

    /// Lifecycle state of a selected task, slotted or not.
    pub(crate) fn state_of(&self, name: &str) -> Option<TaskState> {
        if let Some(slot) = self.table.get(name) {
            return Some(slot.state());
        }
        self.unslotted
            .lock()
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, state)| *state)
    }

    fn mark_unslotted(&self, name: &str, state: TaskState) {
        let mut unslotted = self.unslotted.lock();
        match unslotted.iter_mut().find(|(n, _)| n.as_str() == name) {
            Some(entry) => entry.1 = state,
            None => unslotted.push((name.to_string(), state)),
        }
    }

    pub(crate) fn request_shutdown(&self) {
        if !self.stop.swap(true, Ordering::AcqRel) {
            info!(service = %self.name, "Received graceful shutdown request");
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
        }
        self.wake.cancel();
    }

    pub(crate) fn request_restart(&self) {
        if !self.restart.swap(true, Ordering::AcqRel) {
            info!(service = %self.name, "Received graceful restart request");
            self.bus.publish(Event::new(EventKind::RestartRequested));
        }
        self.request_shutdown();
    }

    /// Stops and joins every task in reverse resolved order.
    async fn stop_all(&self) {
        let grace = self.config.grace;
        for slot in self.table.snapshot().into_iter().rev() {
            slot.stop(&self.bus);
            slot.join(grace, &self.bus).await;
        }

        self.terminated.cancel();
        debug!(service = %self.name, "all tasks stopped");
        self.bus.publish(Event::new(EventKind::ServiceStopped));
    }
}

/// A created service instance. Cheap to clone; clones share the same tasks.
#[derive(Clone)]
pub struct ServiceInstance {
    shared: Arc<Shared>,
}

impl ServiceInstance {
    /// Selects, instantiates and initializes tasks.
    ///
    /// `declared` must already be in resolved order. Initialization runs on the
    /// caller's flow, one task at a time; a task's `init` sees every task
    /// initialized before it through its [`ServiceHandle`].
    pub(crate) async fn create(
        name: Arc<str>,
        declared: &[TaskDescriptor],
        config: Arc<ServiceConfig>,
        bus: Bus,
    ) -> Result<Creation, RuntimeError> {
        if config.lists_tasks() {
            let names = declared.iter().map(|d| d.name().to_string()).collect();
            return Ok(Creation::Listed(names));
        }

        if let Some(selected) = &config.tasks {
            for unknown in selected
                .iter()
                .filter(|n| !declared.iter().any(|d| d.name() == n.as_str()))
            {
                warn!(task = %unknown, "selected task is not declared; ignoring");
            }
        }

        let shared = Arc::new(Shared {
            name,
            config: config.clone(),
            table: TaskTable::default(),
            unslotted: Mutex::new(Vec::new()),
            bus,
            stop: AtomicBool::new(false),
            restart: AtomicBool::new(false),
            started: AtomicBool::new(false),
            wake: CancellationToken::new(),
            stopped: OnceCell::new(),
            terminated: CancellationToken::new(),
        });
        let handle = ServiceHandle::new(&shared);

        let pending: Vec<(&TaskDescriptor, Box<dyn Task>)> = declared
            .iter()
            .filter(|d| config.selects(d.name()))
            .map(|d| (d, d.instantiate()))
            .collect();
        for (desc, _) in &pending {
            shared.mark_unslotted(desc.name(), TaskState::Created);
        }

        let mut failures = Vec::new();
        for (desc, mut task) in pending {
            let span = info_span!("task", name = %desc.name());
            shared.mark_unslotted(desc.name(), TaskState::Initializing);
            let ctx = TaskContext::new(desc, handle.clone(), config.clone(), span.clone());

            let outcome = std::panic::AssertUnwindSafe(task.init(&ctx).instrument(span.clone()))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(TaskError::fail(panic_message(panic))));

            match outcome {
                Ok(()) => {
                    let interval = desc.interval().map(|declared| {
                        ctx.option(INTERVAL_OPTION)
                            .and_then(|v| v.as_duration())
                            .unwrap_or(declared)
                    });
                    let slot = TaskSlot::new(
                        Arc::from(desc.name()),
                        Arc::from(task),
                        desc.mode(),
                        interval,
                        desc.backoff(),
                        span.clone(),
                    );
                    shared.unslotted.lock().retain(|(n, _)| n.as_str() != desc.name());
                    shared.table.push(Arc::new(slot));
                    debug!(parent: &span, "initialized");
                    shared
                        .bus
                        .publish(Event::new(EventKind::TaskInitialized).with_task(desc.name()));
                }
                Err(TaskError::Skip { reason }) => {
                    info!(parent: &span, reason = %reason, "Skipping {}", desc.name());
                    shared.mark_unslotted(desc.name(), TaskState::Skipped);
                    shared.bus.publish(
                        Event::new(EventKind::TaskSkipped)
                            .with_task(desc.name())
                            .with_reason(reason),
                    );
                }
                Err(e) => {
                    error!(parent: &span, error = %e, "Error creating task {}", desc.name());
                    shared.mark_unslotted(desc.name(), TaskState::Failed);
                    shared.bus.publish(
                        Event::new(EventKind::TaskInitFailed)
                            .with_task(desc.name())
                            .with_reason(e.to_string()),
                    );
                    failures.push(InitFailure {
                        task: desc.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(RuntimeError::InitFailed {
                count: failures.len(),
                errors: failures,
            });
        }

        Ok(Creation::Ready(ServiceInstance { shared }))
    }

    /// Launches looping tasks and marks loopless tasks running.
    ///
    /// Must be called within a tokio runtime. Fails with
    /// [`RuntimeError::AlreadyStarted`] on a second call.
    pub fn start(&self) -> Result<(), RuntimeError> {
        self.launch(self.shared.config.register_signals)
    }

    /// Starts the tasks; `listen` spawns a signal listener bound to this instance.
    pub(crate) fn launch(&self, listen: bool) -> Result<(), RuntimeError> {
        let shared = &self.shared;
        if shared.started.swap(true, Ordering::AcqRel) {
            return Err(RuntimeError::AlreadyStarted);
        }

        if listen {
            let handle = self.handle();
            let _listener = shutdown::spawn_listener(
                move || handle.request_shutdown(),
                shared.terminated.clone(),
            )?;
        }

        for slot in shared.table.snapshot() {
            if !slot.mark_running() {
                continue;
            }
            match slot.mode() {
                TaskMode::Looping => {
                    let actor = TaskActor::new(slot.clone(), shared.bus.clone());
                    let token = slot.token();
                    slot.attach(tokio::spawn(async move {
                        actor.run(token).await;
                    }));
                }
                TaskMode::Loopless => {
                    shared
                        .bus
                        .publish(Event::new(EventKind::TaskStarted).with_task(slot.name().clone()));
                }
            }
        }

        debug!(service = %shared.name, "All tasks started");
        Ok(())
    }

    /// Waits until a stop is requested, then stops every task.
    pub async fn join(&self) {
        debug!(service = %self.shared.name, "Active. Awaiting graceful shutdown.");
        let slice = self.shared.config.poll_interval_clamped();
        while !self.shared.stop.load(Ordering::Acquire) {
            let _ = time::timeout(slice, self.shared.wake.cancelled()).await;
        }
        self.shutdown().await;
    }

    /// Stops every task in reverse order. Idempotent: later callers wait for
    /// the first pass to complete.
    pub async fn shutdown(&self) {
        self.shared.request_shutdown();
        self.shared
            .stopped
            .get_or_init(|| self.shared.stop_all())
            .await;
    }

    /// Flags a restart, then shuts down.
    pub async fn restart(&self) {
        self.shared.request_restart();
        self.shutdown().await;
    }

    /// Non-blocking shutdown request.
    pub fn request_shutdown(&self) {
        self.shared.request_shutdown();
    }

    /// Non-blocking restart request.
    pub fn request_restart(&self) {
        self.shared.request_restart();
    }

    pub fn get(&self, name: &str) -> Result<TaskRef, RuntimeError> {
        self.shared.get(name)
    }

    /// Returns the first initialized task of type `T`.
    pub fn require<T: Task>(&self) -> Result<Arc<T>, RuntimeError> {
        self.shared.require::<T>()
    }

    /// Names of the initialized tasks, in resolved order.
    pub fn names(&self) -> Vec<String> {
        self.shared.table.names()
    }

    /// Names of the tasks that skipped themselves during `init`.
    pub fn skipped(&self) -> Vec<String> {
        self.shared
            .unslotted
            .lock()
            .iter()
            .filter(|(_, state)| *state == TaskState::Skipped)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Lifecycle state of a selected task of this instance.
    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.shared.state_of(name)
    }

    pub fn stop_requested(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    pub fn restart_requested(&self) -> bool {
        self.shared.restart.load(Ordering::Acquire)
    }

    /// Returns `true` once every task stopped.
    pub fn is_terminated(&self) -> bool {
        self.shared.terminated.is_cancelled()
    }

    pub fn config(&self) -> &Arc<ServiceConfig> {
        &self.shared.config
    }

    /// Weak handle, as given to tasks.
    pub fn handle(&self) -> ServiceHandle {
        ServiceHandle::new(&self.shared)
    }
}

impl std::fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("name", &self.shared.name)
            .field("tasks", &self.names())
            .field("stop", &self.stop_requested())
            .finish()
    }
}
