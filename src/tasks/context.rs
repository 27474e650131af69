//! # Per-task view of the owning service.
//!
//! [`TaskContext`] is handed to [`Task::init`](crate::Task::init). It exposes
//! the task's own options (resolved through the same key derivation as the
//! registry), the configuration snapshot, and a [`ServiceHandle`] for looking
//! up other tasks and requesting shutdown or restart.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::Span;

use crate::core::{ServiceConfig, ServiceHandle};
use crate::options::OptionValue;
use crate::tasks::descriptor::TaskDescriptor;

/// Context passed to a task during initialization.
pub struct TaskContext {
    name: Arc<str>,
    service: ServiceHandle,
    config: Arc<ServiceConfig>,
    /// option name → (configuration key, declared default)
    options: HashMap<String, (String, OptionValue)>,
    span: Span,
}

impl TaskContext {
    pub(crate) fn new(
        desc: &TaskDescriptor,
        service: ServiceHandle,
        config: Arc<ServiceConfig>,
        span: Span,
    ) -> Self {
        let options = desc
            .options()
            .iter()
            .map(|spec| {
                let key = spec.key_for(desc);
                let default = spec.default_value().evaluate(desc);
                (spec.name().to_string(), (key, default))
            })
            .collect();

        Self {
            name: Arc::from(desc.name()),
            service,
            config,
            options,
            span,
        }
    }

    /// Name of the task being initialized.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to the owning service (non-owning).
    pub fn service(&self) -> &ServiceHandle {
        &self.service
    }

    /// The shared configuration snapshot.
    pub fn config(&self) -> &Arc<ServiceConfig> {
        &self.config
    }

    /// The task's tracing span; every hook of this task runs inside it.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Returns the value of one of this task's declared options.
    ///
    /// Falls back to the declared default when the configuration has no entry.
    /// Returns `None` for names the task did not declare.
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        let (key, default) = self.options.get(name)?;
        Some(self.config.options.get(key).unwrap_or(default))
    }

    /// Returns the configuration key this task's option `name` is stored under.
    pub fn option_key(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(|(key, _)| key.as_str())
    }
}
