//! # Lifecycle events emitted by the orchestrator and task loops.
//!
//! [`EventKind`] classifies events in three groups:
//! - **Creation**: per-task init outcomes
//! - **Execution**: loop start, step failures, stop requests, task stopped
//! - **Service**: shutdown/restart requests and final termination
//!
//! Every [`Event`] carries a process-wide monotonic `seq`, so subscribers can
//! restore the exact order of events published from different tokio tasks.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use servisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StepFailed)
//!     .with_task("poller")
//!     .with_reason("connection refused")
//!     .with_delay(Duration::from_millis(500));
//!
//! assert_eq!(ev.task.as_deref(), Some("poller"));
//! assert_eq!(ev.delay_ms, Some(500));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `init` completed; the task is ready.
    ///
    /// Sets: `task`
    TaskInitialized,

    /// `init` asked to skip the task.
    ///
    /// Sets: `task`, `reason`
    TaskSkipped,

    /// `init` failed; collected into the aggregated creation error.
    ///
    /// Sets: `task`, `reason`
    TaskInitFailed,

    /// The task is running (loop launched, or loopless task marked running).
    ///
    /// Sets: `task`
    TaskStarted,

    /// A step returned an error.
    ///
    /// Sets: `task`, `reason`, `attempt` (consecutive failures),
    /// `delay_ms` (when another step is scheduled)
    StepFailed,

    /// Stop was requested for a task.
    ///
    /// Sets: `task`
    TaskStopRequested,

    /// The task's loop exited and was joined.
    ///
    /// Sets: `task`
    TaskStopped,

    /// Joining the task failed (panic or grace exceeded).
    ///
    /// Sets: `task`, `reason`
    TaskJoinFailed,

    /// Graceful shutdown requested (API call or OS signal).
    ShutdownRequested,

    /// Graceful restart requested.
    RestartRequested,

    /// Every task of the instance stopped.
    ServiceStopped,
}

/// Lifecycle event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Process-wide monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    pub kind: EventKind,
    /// Task name, if the event concerns a task.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, skip reasons).
    pub reason: Option<Arc<str>>,
    /// Consecutive failure count.
    pub attempt: Option<u32>,
    /// Delay before the next step, in milliseconds.
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Creates an event stamped with the current time and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            reason: None,
            attempt: None,
            delay_ms: None,
        }
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }
}
