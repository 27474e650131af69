//! Service orchestration: configuration, instances and the run loop.
//!
//! Public entry points are [`Service`] (built through [`ServiceBuilder`]) and
//! the [`ServiceInstance`] it creates.
//!
//! Internal modules:
//! - [`registry`]: task table, per-task slot with stop/join;
//! - [`actor`]: drives `step` of one looping task with interval and backoff;
//! - [`instance`]: create / start / join / shutdown of one instance;
//! - [`shutdown`]: OS signal listener;
//! - [`service`]: the outer run loop and process entry point.

mod actor;
mod background;
mod builder;
mod config;
mod handle;
mod instance;
mod registry;
mod service;
mod shutdown;

pub use background::BackgroundService;
pub use builder::{DEFAULT_BUS_CAPACITY, ServiceBuilder};
pub use config::{MAX_POLL_INTERVAL, ServiceConfig};
pub use handle::ServiceHandle;
pub use instance::{Creation, ServiceInstance};
pub use registry::TaskState;
pub use service::{RunOutcome, Service};
