//! Error types used by the servisor runtime and tasks.
//!
//! This module defines three enums:
//!
//! - [`DeclarationError`] raised while a service is being declared (dependency
//!   graph and option namespace problems). Always fatal, never retried.
//! - [`TaskError`] returned by task hooks (`init`, `step`).
//! - [`RuntimeError`] raised by the orchestrator itself.
//!
//! All of them provide `as_label` for stable snake_case identifiers in logs.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while declaring a service.
///
/// These surface from [`ServiceBuilder::build`](crate::ServiceBuilder::build)
/// before any task has been instantiated.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    /// A task depends on a name that was not declared.
    #[error("task {task:?} depends on {missing:?}, which is not declared")]
    MissingDependency {
        /// The dependent task.
        task: String,
        /// The dependency name that could not be found.
        missing: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle: {}", members.join(" -> "))]
    DependencyCycle {
        /// Members of one cycle, in dependency order.
        members: Vec<String>,
    },

    /// Two descriptors share a name.
    #[error("task {name:?} is declared more than once")]
    DuplicateTask {
        /// The duplicated name.
        name: String,
    },

    /// Two options resolve to the same configuration key.
    #[error("option key {key:?} is declared by both {first:?} and {second:?}")]
    DuplicateOption {
        /// The colliding key.
        key: String,
        /// Owner of the first declaration.
        first: String,
        /// Owner of the second declaration.
        second: String,
    },
}

impl DeclarationError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeclarationError::MissingDependency { .. } => "declaration_missing_dependency",
            DeclarationError::DependencyCycle { .. } => "declaration_dependency_cycle",
            DeclarationError::DuplicateTask { .. } => "declaration_duplicate_task",
            DeclarationError::DuplicateOption { .. } => "declaration_duplicate_option",
        }
    }
}

/// # Errors produced by task hooks.
///
/// `init` may return [`TaskError::Skip`] to leave the running set without
/// failing the service. `step` failures are either retried after a backoff
/// ([`TaskError::Fail`]) or end the task's loop ([`TaskError::Fatal`]).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task opts out of this service run.
    #[error("skipped: {reason}")]
    Skip {
        /// Why the task was skipped.
        reason: String,
    },

    /// Non-recoverable error (the loop exits).
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Failure that may succeed on the next step.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The task observed its cancellation token and gave up.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Shorthand for [`TaskError::Skip`].
    pub fn skip(reason: impl Into<String>) -> Self {
        TaskError::Skip {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl ToString) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Shorthand for [`TaskError::Fatal`].
    pub fn fatal(error: impl ToString) -> Self {
        TaskError::Fatal {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use servisor::TaskError;
    ///
    /// assert_eq!(TaskError::skip("no gpu").as_label(), "task_skipped");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Skip { .. } => "task_skipped",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Indicates whether the loop driver should try another step.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. })
    }
}

/// One failed `init` hook, as reported by [`RuntimeError::InitFailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitFailure {
    /// Name of the task whose `init` failed.
    pub task: String,
    /// The error it returned.
    pub error: TaskError,
}

impl std::fmt::Display for InitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.task, self.error)
    }
}

/// # Errors produced by the orchestrator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The service declaration is invalid.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// One or more tasks failed to initialize.
    #[error("unable to start service ({count} task start errors)")]
    InitFailed {
        /// Number of failed tasks.
        count: usize,
        /// Every failure, in initialization order.
        errors: Vec<InitFailure>,
    },

    /// A lookup asked for a task that is not in the active set.
    #[error("task {name} not found in service")]
    TaskNotFound {
        /// The requested name or type name.
        name: String,
    },

    /// `start` was called on an instance that already started.
    #[error("service instance already started")]
    AlreadyStarted,

    /// Registering for OS signals failed.
    #[error("failed to register signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    /// Installing under the process supervisor failed.
    #[error("install failed: {0}")]
    Install(#[from] crate::install::InstallError),

    /// The configuration could not be parsed or applied.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A task did not stop within the grace period.
    #[error("task {task} did not stop within {grace:?}")]
    GraceExceeded {
        /// The stuck task.
        task: String,
        /// The configured grace duration.
        grace: Duration,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use servisor::RuntimeError;
    ///
    /// let err = RuntimeError::TaskNotFound { name: "db".into() };
    /// assert_eq!(err.as_label(), "runtime_task_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Declaration(e) => e.as_label(),
            RuntimeError::InitFailed { .. } => "runtime_init_failed",
            RuntimeError::TaskNotFound { .. } => "runtime_task_not_found",
            RuntimeError::AlreadyStarted => "runtime_already_started",
            RuntimeError::Signals(_) => "runtime_signals",
            RuntimeError::Install(_) => "runtime_install",
            RuntimeError::Config(_) => "runtime_config",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns every underlying cause as a human-readable line.
    ///
    /// Aggregated init failures expand to one line per task.
    pub fn causes(&self) -> Vec<String> {
        match self {
            RuntimeError::InitFailed { errors, .. } => {
                errors.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}
