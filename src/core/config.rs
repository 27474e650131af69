//! # Service configuration snapshot.
//!
//! [`ServiceConfig`] is the immutable configuration one service run sees. The
//! orchestrator wraps it in an `Arc` before creating the first instance; a
//! restart hands the same `Arc` to the next instance, so configuration is shared,
//! never re-parsed.
//!
//! It can be built three ways:
//! 1. [`ServiceConfig::default`] (no task options seeded; tasks fall back to
//!    their declared defaults)
//! 2. [`Service::default_config`](crate::Service::default_config) (defaults of
//!    every declared option filled in)
//! 3. [`cli::parse`](crate::cli::parse) (command line on top of 2)
//!
//! ## Sentinel values
//! - `tasks = None` → run every task; `Some(vec![])` → list task names and exit
//! - `grace = 0s` → do not wait for a task's loop to exit, abort it immediately
//! - `poll_interval` is clamped to `(0, 100ms]`

use std::time::Duration;

use crate::core::service::Service;
use crate::options::{OptionValue, Options};

/// Upper bound for the outer join's wait slice.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration of one service run.
///
/// ## Field semantics
/// - `tasks`: explicit task selection (see sentinel values)
/// - `level`: log severity threshold (an `EnvFilter` directive, e.g. `"info"`)
/// - `install`: install under the process supervisor instead of running
/// - `dryrun`: exposed to tasks; the orchestrator itself ignores it
/// - `register_signals`: translate SIGINT/SIGTERM/SIGQUIT into graceful shutdown
/// - `grace`: how long the orchestrator waits for each task's loop to exit
/// - `poll_interval`: wait slice of the outer join
/// - `options`: flat `key → value` table of task options
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceConfig {
    pub tasks: Option<Vec<String>>,
    pub level: String,
    pub install: bool,
    pub dryrun: bool,
    pub register_signals: bool,
    pub grace: Duration,
    pub poll_interval: Duration,
    pub options: Options,
}

impl Default for ServiceConfig {
    /// - `tasks = None` (all)
    /// - `level = "debug"`
    /// - `register_signals = true`
    /// - `grace = 60s`
    /// - `poll_interval = 100ms`
    fn default() -> Self {
        Self {
            tasks: None,
            level: "debug".to_string(),
            install: false,
            dryrun: false,
            register_signals: true,
            grace: Duration::from_secs(60),
            poll_interval: MAX_POLL_INTERVAL,
            options: Options::default(),
        }
    }
}

impl ServiceConfig {
    /// Selects an explicit subset of tasks. An empty list requests a listing.
    pub fn with_tasks<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tasks = Some(tasks.into_iter().map(Into::into).collect());
        self
    }

    /// Seeds every option default declared by `service`'s tasks. Values already
    /// present are kept.
    pub fn with_defaults(mut self, service: &Service) -> Self {
        self.options.fill_from(&service.options().defaults());
        self
    }

    /// Sets a task option by its configuration key.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.set(key, value);
        self
    }

    pub fn with_signals(mut self, register: bool) -> Self {
        self.register_signals = register;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Returns the option stored under `key`.
    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    /// Returns `true` if `name` is part of the active selection.
    pub fn selects(&self, name: &str) -> bool {
        match &self.tasks {
            None => true,
            Some(names) => names.iter().any(|n| n == name),
        }
    }

    /// Returns `true` if the selection asks for a task listing.
    pub fn lists_tasks(&self) -> bool {
        matches!(&self.tasks, Some(names) if names.is_empty())
    }

    /// Returns the outer join wait slice, clamped to `(0, 100ms]`.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval
            .clamp(Duration::from_millis(1), MAX_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_semantics() {
        let all = ServiceConfig::default();
        assert!(all.selects("Anything"));
        assert!(!all.lists_tasks());

        let some = ServiceConfig::default().with_tasks(["A", "C"]);
        assert!(some.selects("A"));
        assert!(!some.selects("B"));

        let none = ServiceConfig::default().with_tasks(Vec::<String>::new());
        assert!(none.lists_tasks());
    }

    #[test]
    fn test_poll_interval_is_capped() {
        let mut cfg = ServiceConfig::default();
        cfg.poll_interval = Duration::from_secs(5);
        assert_eq!(cfg.poll_interval_clamped(), MAX_POLL_INTERVAL);

        cfg.poll_interval = Duration::ZERO;
        assert_eq!(cfg.poll_interval_clamped(), Duration::from_millis(1));
    }
}
