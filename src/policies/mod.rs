//! Step retry policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how long a looping task waits after a failed step
//! - [`JitterPolicy`] randomization applied to that wait
//!
//! ## Quick wiring
//! ```text
//! TaskDescriptor.with_backoff(BackoffPolicy)
//!      └─► core::actor::TaskActor
//!           step() → Err(Fail) → backoff.next(consecutive_failures) → cancellable sleep
//! ```

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
