//! # Event bus.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. It belongs to a [`Service`](crate::Service)
//! and outlives individual instances, so a subscriber keeps receiving events
//! across restarts.
//!
//! ## Rules
//! - `publish()` never blocks and never fails; without receivers the event is dropped.
//! - Receivers only see events sent after they subscribed.
//! - A receiver that falls more than `capacity` events behind gets `Lagged(n)`.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus; `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
