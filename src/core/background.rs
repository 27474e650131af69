//! # Embedding a service inside another program.
//!
//! [`BackgroundService`] owns a started [`ServiceInstance`] whose `join` runs
//! on a spawned tokio task, so the embedding program keeps its own control
//! flow and decides when to stop.

use tokio::task::JoinHandle;

use crate::core::instance::ServiceInstance;

/// A started instance joined in the background.
#[derive(Debug)]
pub struct BackgroundService {
    instance: ServiceInstance,
    join: JoinHandle<()>,
}

impl BackgroundService {
    pub(crate) fn spawn(instance: ServiceInstance) -> Self {
        let joined = instance.clone();
        let join = tokio::spawn(async move { joined.join().await });
        Self { instance, join }
    }

    /// The running instance, for lookups and requests.
    pub fn instance(&self) -> &ServiceInstance {
        &self.instance
    }

    /// Shuts the instance down and waits for the background join to finish.
    pub async fn stop(self) {
        self.instance.shutdown().await;
        let _ = self.join.await;
    }

    /// Waits until something else (a task, a signal) stops the instance.
    pub async fn wait(self) {
        let _ = self.join.await;
    }
}
