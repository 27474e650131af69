use std::sync::Arc;

use crate::core::service::Service;
use crate::deps;
use crate::error::DeclarationError;
use crate::events::Bus;
use crate::install::Installer;
use crate::options::OptionRegistry;
use crate::tasks::TaskDescriptor;

/// Default capacity of the lifecycle event bus.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Builder for a [`Service`].
///
/// Collects task declarations; [`build`](Self::build) validates them once
/// (dependency order, option keys) so every later run starts from a known-good
/// declaration.
pub struct ServiceBuilder {
    name: Arc<str>,
    tasks: Vec<TaskDescriptor>,
    installer: Option<Arc<dyn Installer>>,
    bus_capacity: usize,
}

impl ServiceBuilder {
    pub(crate) fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            installer: None,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }

    /// Declares a task. Declaration order breaks ties between independent tasks.
    pub fn task(mut self, desc: TaskDescriptor) -> Self {
        self.tasks.push(desc);
        self
    }

    /// Declares several tasks at once.
    pub fn tasks<I>(mut self, descs: I) -> Self
    where
        I: IntoIterator<Item = TaskDescriptor>,
    {
        self.tasks.extend(descs);
        self
    }

    /// Sets the process-supervisor installer. Enables `--runit-install`.
    pub fn installer(mut self, installer: impl Installer + 'static) -> Self {
        self.installer = Some(Arc::new(installer));
        self
    }

    /// Sets the lifecycle event bus capacity (clamped to at least 1).
    pub fn bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Validates the declarations and builds the service.
    ///
    /// Fails on duplicate task names, missing dependencies, dependency cycles
    /// and colliding option keys. No task value is created.
    pub fn build(self) -> Result<Service, DeclarationError> {
        let resolved = deps::resolve(&self.tasks)?;
        let options = OptionRegistry::merge(&resolved)?;

        Ok(Service::new_internal(
            self.name,
            resolved,
            options,
            self.installer,
            Bus::new(self.bus_capacity),
        ))
    }
}
