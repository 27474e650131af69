//! # OS signal listener.
//!
//! [`spawn_listener`] registers for termination signals and spawns a tokio task
//! that runs a callback for every delivery. Signals never run service code
//! directly; repeated signals are absorbed by the stop flag.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by runit/systemd/Kubernetes)
//! - `SIGQUIT`
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! The listener exits when `done` is cancelled.
//!
//! ## Across restarts
//! A started instance alone listens until it terminated. [`Service::run`]
//! instead keeps one listener for the whole run and routes deliveries through a
//! [`SignalLatch`]: a signal that arrives while the next instance is still being
//! created is remembered and stops that instance as soon as it is attached.
//!
//! [`Service::run`]: crate::Service::run

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::handle::ServiceHandle;
use crate::error::RuntimeError;

/// Remembers signal deliveries and forwards them to the current instance.
#[derive(Default)]
pub(crate) struct SignalLatch {
    received: AtomicBool,
    current: Mutex<Option<ServiceHandle>>,
}

impl SignalLatch {
    pub(crate) fn deliver(&self) {
        self.received.store(true, Ordering::SeqCst);
        if let Some(handle) = self.current.lock().as_ref() {
            handle.request_shutdown();
        }
    }

    /// Makes `handle` the delivery target; stops it at once if a signal already arrived.
    pub(crate) fn attach(&self, handle: ServiceHandle) {
        *self.current.lock() = Some(handle.clone());
        if self.received() {
            handle.request_shutdown();
        }
    }

    pub(crate) fn received(&self) -> bool {
        self.received.load(Ordering::SeqCst)
    }
}

/// Registers signal streams and spawns the listener.
///
/// Registration happens before spawning, so failures surface as
/// [`RuntimeError::Signals`]. Must be called within a tokio runtime.
#[cfg(unix)]
pub(crate) fn spawn_listener<F>(
    on_signal: F,
    done: CancellationToken,
) -> Result<JoinHandle<()>, RuntimeError>
where
    F: Fn() + Send + 'static,
{
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).map_err(RuntimeError::Signals)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(RuntimeError::Signals)?;
    let mut sigquit = signal(SignalKind::quit()).map_err(RuntimeError::Signals)?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                _ = done.cancelled() => break,
                _ = sigint.recv() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
                _ = sigquit.recv() => "SIGQUIT",
            };
            info!(signal = name, "received signal");
            on_signal();
        }
    }))
}

/// Registers for Ctrl-C and spawns the listener.
#[cfg(not(unix))]
pub(crate) fn spawn_listener<F>(
    on_signal: F,
    done: CancellationToken,
) -> Result<JoinHandle<()>, RuntimeError>
where
    F: Fn() + Send + 'static,
{
    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = done.cancelled() => break,
                res = tokio::signal::ctrl_c() => {
                    if let Err(e) = res {
                        tracing::error!(error = %e, "ctrl-c listener failed");
                        break;
                    }
                    info!(signal = "CTRL_C", "received signal");
                    on_signal();
                }
            }
        }
    }))
}
