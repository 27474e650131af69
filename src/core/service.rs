//! # Service: validated declarations plus the outer run loop.
//!
//! A [`Service`] is what [`ServiceBuilder::build`] produces: the resolved task
//! declarations, the merged option list, an optional installer and the event
//! bus. It never holds live tasks; every run creates a [`ServiceInstance`].
//!
//! ## Run loop
//! ```text
//! run(cfg)
//!   ├─ cfg.install → installer.install(name) → RunOutcome::Installed
//!   ├─ one signal listener for the whole run (cfg.register_signals)
//!   └─ loop {
//!        create(cfg) ── Listed(names) → RunOutcome::Listed
//!                    └─ Ready(instance) → attach to the signal latch
//!        start() ── Err → shutdown(), return Err
//!        join()
//!        restart requested, no signal? ── yes → loop (same Arc<ServiceConfig>)
//!                                     └─ no  → RunOutcome::Stopped
//!      }
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::time::Duration;
//! use servisor::{Service, TaskDescriptor, TaskError};
//! use tokio_util::sync::CancellationToken;
//!
//! fn main() -> std::process::ExitCode {
//!     let tick = TaskDescriptor::from_fn("Tick", |token: CancellationToken| async move {
//!         if token.is_cancelled() {
//!             return Err(TaskError::Canceled);
//!         }
//!         tracing::info!("tick");
//!         Ok(())
//!     })
//!     .with_interval(Duration::from_secs(1));
//!
//!     match Service::builder("ticker").task(tick).build() {
//!         Ok(service) => service.main(),
//!         Err(e) => {
//!             eprintln!("{e}");
//!             std::process::ExitCode::FAILURE
//!         }
//!     }
//! }
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cli;
use crate::core::background::BackgroundService;
use crate::core::builder::ServiceBuilder;
use crate::core::config::ServiceConfig;
use crate::core::instance::{Creation, ServiceInstance};
use crate::core::shutdown::{self, SignalLatch};
use crate::error::RuntimeError;
use crate::events::{Bus, Event};
use crate::install::Installer;
use crate::logging;
use crate::options::OptionRegistry;
use crate::tasks::TaskDescriptor;

/// How [`Service::run`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every task stopped and no restart was requested.
    Stopped,
    /// The selection was empty; these are the declared task names.
    Listed(Vec<String>),
    /// The service was installed under the process supervisor.
    Installed,
}

/// A validated service declaration. Cheap to clone.
#[derive(Clone)]
pub struct Service {
    name: Arc<str>,
    tasks: Arc<[TaskDescriptor]>,
    options: Arc<OptionRegistry>,
    installer: Option<Arc<dyn Installer>>,
    bus: Bus,
}

impl Service {
    /// Starts declaring a service called `name`.
    pub fn builder(name: impl Into<Arc<str>>) -> ServiceBuilder {
        ServiceBuilder::new(name)
    }

    pub(crate) fn new_internal(
        name: Arc<str>,
        tasks: Vec<TaskDescriptor>,
        options: OptionRegistry,
        installer: Option<Arc<dyn Installer>>,
        bus: Bus,
    ) -> Self {
        Self {
            name,
            tasks: tasks.into(),
            options: Arc::new(options),
            installer,
            bus,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Task declarations in resolved (dependency) order.
    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|d| d.name().to_string()).collect()
    }

    /// Merged option declarations of every task.
    pub fn options(&self) -> &OptionRegistry {
        &self.options
    }

    pub fn has_installer(&self) -> bool {
        self.installer.is_some()
    }

    /// Default configuration with every declared option default filled in.
    pub fn default_config(&self) -> ServiceConfig {
        ServiceConfig::default().with_defaults(self)
    }

    /// Subscribes to lifecycle events of every instance of this service.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Creates (selects and initializes) an instance without starting it.
    pub async fn create(&self, config: Arc<ServiceConfig>) -> Result<Creation, RuntimeError> {
        ServiceInstance::create(self.name.clone(), &self.tasks, config, self.bus.clone()).await
    }

    /// Installs the service under the configured process supervisor.
    pub fn install(&self) -> Result<(), RuntimeError> {
        let installer = self
            .installer
            .as_ref()
            .ok_or_else(|| RuntimeError::Config("no installer configured".into()))?;
        installer.install(&self.name)?;
        info!(service = %self.name, "installed");
        Ok(())
    }

    /// Runs the service until it stops without a pending restart.
    pub async fn run(&self, config: ServiceConfig) -> Result<RunOutcome, RuntimeError> {
        if config.install {
            self.install()?;
            return Ok(RunOutcome::Installed);
        }

        let config = Arc::new(config);
        let latch = Arc::new(SignalLatch::default());
        let listening = CancellationToken::new();
        let _listening = listening.clone().drop_guard();
        if config.register_signals {
            let target = latch.clone();
            let _listener = shutdown::spawn_listener(move || target.deliver(), listening)?;
        }

        loop {
            let instance = match self.create(config.clone()).await? {
                Creation::Listed(names) => return Ok(RunOutcome::Listed(names)),
                Creation::Ready(instance) => instance,
            };
            latch.attach(instance.handle());

            if let Err(e) = instance.launch(false) {
                instance.shutdown().await;
                return Err(e);
            }
            instance.join().await;

            if !instance.restart_requested() || latch.received() {
                return Ok(RunOutcome::Stopped);
            }
            info!(service = %self.name, "restarting");
        }
    }

    /// Creates and starts an instance, joining it on a spawned tokio task.
    ///
    /// An empty task selection is a configuration error here: there is nothing
    /// to run.
    pub async fn start_background(
        &self,
        config: ServiceConfig,
    ) -> Result<BackgroundService, RuntimeError> {
        let instance = match self.create(Arc::new(config)).await? {
            Creation::Ready(instance) => instance,
            Creation::Listed(_) => {
                return Err(RuntimeError::Config(
                    "empty task selection; nothing to run".into(),
                ));
            }
        };

        if let Err(e) = instance.start() {
            instance.shutdown().await;
            return Err(e);
        }
        Ok(BackgroundService::spawn(instance))
    }

    /// Process entry point: parse the command line, set up logging, run.
    ///
    /// Exit codes: `0` after a clean stop, an install or a task listing; `1`
    /// on any error (every cause is printed to stderr).
    pub fn main(self) -> ExitCode {
        let config = match cli::parse(&self) {
            Ok(config) => config,
            Err(e) => e.exit(),
        };

        if let Err(e) = logging::init(&config.level) {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }

        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("failed to build tokio runtime: {e}");
                return ExitCode::FAILURE;
            }
        };

        match runtime.block_on(self.run(config)) {
            Ok(RunOutcome::Listed(names)) => {
                println!("Available tasks:");
                for name in names {
                    println!(" - {name}");
                }
                ExitCode::SUCCESS
            }
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                error!(service = %self.name, error = %e, label = e.as_label(), "service failed");
                for cause in e.causes() {
                    eprintln!("{cause}");
                }
                ExitCode::FAILURE
            }
        }
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("tasks", &self.task_names())
            .field("options", &self.options.len())
            .field("installer", &self.has_installer())
            .finish()
    }
}
