//! # Task descriptors.
//!
//! A [`TaskDescriptor`] is the declaration-time metadata of a task kind: its
//! name, dependencies, execution mode, options and a factory that produces a
//! fresh task value for every service instance (a restart never reuses task
//! values).
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use servisor::{OptionSpec, Task, TaskDescriptor, TaskMode};
//!
//! #[derive(Default)]
//! struct Db;
//! impl Task for Db {}
//!
//! #[derive(Default)]
//! struct Api;
//! impl Task for Api {}
//!
//! let db = TaskDescriptor::new("Db", Db::default).loopless();
//! let api = TaskDescriptor::new("Api", Api::default)
//!     .depends_on("Db")
//!     .with_option(OptionSpec::new("port", 8080).help("Port to listen on"))
//!     .with_interval(Duration::from_secs(1));
//!
//! assert_eq!(db.mode(), TaskMode::Loopless);
//! assert_eq!(api.dependencies().collect::<Vec<_>>(), vec!["Db"]);
//! assert_eq!(api.options().len(), 2); // port + interval
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::options::{OptionKind, OptionSpec, OptionValue, snake_case};
use crate::policies::BackoffPolicy;
use crate::tasks::task::Task;

/// How a task executes after initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Runs `step` repeatedly on a dedicated tokio task.
    Looping,
    /// No autonomous execution; exists to be looked up by other tasks.
    Loopless,
}

type Factory = Arc<dyn Fn() -> Box<dyn Task> + Send + Sync>;

/// Name of the option registered by [`TaskDescriptor::with_interval`].
pub const INTERVAL_OPTION: &str = "interval";

/// Declaration-time metadata for a task kind.
#[derive(Clone)]
pub struct TaskDescriptor {
    name: Cow<'static, str>,
    deps: Vec<Cow<'static, str>>,
    mode: TaskMode,
    options: Vec<OptionSpec>,
    interval: Option<Duration>,
    backoff: BackoffPolicy,
    factory: Factory,
}

impl TaskDescriptor {
    /// Declares a looping task built by `factory`.
    pub fn new<T, F>(name: impl Into<Cow<'static, str>>, factory: F) -> Self
    where
        T: Task,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            deps: Vec::new(),
            mode: TaskMode::Looping,
            options: Vec::new(),
            interval: None,
            backoff: BackoffPolicy::default(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Task>),
        }
    }

    /// Marks the task as loopless (request-driven).
    pub fn loopless(mut self) -> Self {
        self.mode = TaskMode::Loopless;
        self
    }

    /// Adds a dependency on another declared task.
    pub fn depends_on(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        if !self.deps.contains(&name) {
            self.deps.push(name);
        }
        self
    }

    /// Adds an option declaration.
    pub fn with_option(mut self, spec: OptionSpec) -> Self {
        self.options.retain(|o| o.name() != spec.name());
        self.options.push(spec);
        self
    }

    /// Paces the loop: the driver waits `interval` between successful steps.
    ///
    /// Also declares the `interval` option (seconds) whose default is this value.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self.with_option(
            OptionSpec::derived(INTERVAL_OPTION, OptionKind::Float, |d| {
                OptionValue::Float(d.interval().map_or(0.0, |i| i.as_secs_f64()))
            })
            .help("How often this task should run [seconds]"),
        )
    }

    /// Sets the delay policy applied after a failed step.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dependency names, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(|d| d.as_ref())
    }

    pub fn mode(&self) -> TaskMode {
        self.mode
    }

    pub fn is_loopless(&self) -> bool {
        self.mode == TaskMode::Loopless
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Prefix of this task's option keys.
    pub fn option_prefix(&self) -> String {
        snake_case(&self.name)
    }

    /// Builds a fresh task value.
    pub(crate) fn instantiate(&self) -> Box<dyn Task> {
        (self.factory)()
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("mode", &self.mode)
            .field("options", &self.options)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
