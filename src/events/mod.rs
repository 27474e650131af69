//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ServiceInstance` (creation, stop, shutdown), `TaskActor`
//!   (loop start, step failures).
//! - **Consumers**: anything holding [`Service::subscribe`](crate::Service::subscribe),
//!   typically tests and embedders.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
