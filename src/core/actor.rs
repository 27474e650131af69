//! # TaskActor: driver of one looping task.
//!
//! Runs on its own tokio task, spawned by [`ServiceInstance::start`](crate::ServiceInstance::start).
//!
//! ## Loop
//! ```text
//! publish TaskStarted
//! loop {
//!   ├─► token cancelled? → break
//!   ├─► step(&token)
//!   │     ├─ Ok        → failures = 0, sleep(interval)        (cancellable)
//!   │     ├─ Fail      → failures += 1, warn!, StepFailed,
//!   │     │              sleep(backoff.next(failures - 1))     (cancellable)
//!   │     ├─ Fatal     → error!, break
//!   │     └─ Canceled  → break
//!   └─► repeat
//! }
//! teardown()
//! ```
//!
//! ## Rules
//! - Steps run **sequentially**, never concurrently for one task
//! - Cancellation is observed by `step` itself and at every wait
//! - `teardown` runs exactly once, after the loop exited
//! - The failure counter **resets on success**

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, warn};

use crate::core::registry::TaskSlot;
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};

/// Drives `step` of one looping task until cancellation or a terminal result.
pub(crate) struct TaskActor {
    slot: Arc<TaskSlot>,
    bus: Bus,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActorExit {
    Cancelled,
    Fatal,
}

impl TaskActor {
    pub(crate) fn new(slot: Arc<TaskSlot>, bus: Bus) -> Self {
        Self { slot, bus }
    }

    /// Runs the loop, then `teardown`, inside the task's span.
    pub(crate) async fn run(self, token: CancellationToken) -> ActorExit {
        let span = self.slot.span().clone();
        async move {
            self.bus
                .publish(Event::new(EventKind::TaskStarted).with_task(self.slot.name().clone()));
            debug!("loop started");

            let exit = self.drive(&token).await;
            debug!(exit = ?exit, "loop exited");

            self.slot.task().teardown().await;
            exit
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, token: &CancellationToken) -> ActorExit {
        let task = self.slot.task();
        let backoff = self.slot.backoff();
        let mut failures: u32 = 0;

        loop {
            if token.is_cancelled() {
                return ActorExit::Cancelled;
            }

            let wait = match task.step(token).await {
                Ok(()) => {
                    failures = 0;
                    self.slot.interval()
                }
                Err(TaskError::Canceled) => return ActorExit::Cancelled,
                Err(TaskError::Skip { reason }) => {
                    debug!(reason = %reason, "step asked to leave the loop");
                    return ActorExit::Cancelled;
                }
                Err(e @ TaskError::Fatal { .. }) => {
                    error!(error = %e, "step failed fatally; loop stops");
                    self.bus.publish(
                        Event::new(EventKind::StepFailed)
                            .with_task(self.slot.name().clone())
                            .with_reason(e.to_string())
                            .with_attempt(failures.saturating_add(1)),
                    );
                    return ActorExit::Fatal;
                }
                Err(e) => {
                    let delay = backoff.next(failures);
                    failures = failures.saturating_add(1);

                    warn!(error = %e, attempt = failures, delay = ?delay, "step failed");
                    self.bus.publish(
                        Event::new(EventKind::StepFailed)
                            .with_task(self.slot.name().clone())
                            .with_reason(e.to_string())
                            .with_attempt(failures)
                            .with_delay(delay),
                    );
                    Some(delay)
                }
            };

            match wait.filter(|d| *d > Duration::ZERO) {
                Some(delay) => select! {
                    _ = time::sleep(delay) => {}
                    _ = token.cancelled() => return ActorExit::Cancelled,
                },
                None => tokio::task::yield_now().await,
            }
        }
    }
}
