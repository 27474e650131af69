//! # servisor
//!
//! **Servisor** is a process-lifecycle kernel for long-running services.
//!
//! A service is a set of named tasks with declared dependencies. Servisor
//! orders them, initializes them one by one, runs the looping ones on their
//! own tokio tasks, and stops everything in reverse order on shutdown, on an
//! OS signal or before a restart.
//!
//! ## Architecture
//! ```text
//!   TaskDescriptor   TaskDescriptor   TaskDescriptor
//!        │                │                │
//!        └────────────────┼────────────────┘
//!                         ▼
//!   ServiceBuilder::build()
//!     ├─► deps::resolve()          dependency order, cycles, missing deps
//!     └─► OptionRegistry::merge()  one flat option namespace
//!                         ▼
//!   Service ──► cli::parse() ──► ServiceConfig ──► Arc<ServiceConfig>
//!     │
//!     └─► run(cfg) loop {
//!           ServiceInstance::create()   select + init in order
//!           ServiceInstance::start()    TaskActor per looping task
//!           ServiceInstance::join()     wait for stop flag
//!           shutdown                    reverse { stop, join(grace) }
//!         } while restart requested
//! ```
//!
//! ### Task lifecycle
//! ```text
//! Created → Initializing → Skipped
//!                        → Failed
//!                        → Ready → Running → Stopping → Stopped
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                         |
//! |-------------------|----------------------------------------------------------|--------------------------------------------|
//! | **Tasks**         | Declare tasks, their dependencies, options and mode.     | [`Task`], [`TaskDescriptor`], [`TaskFn`]   |
//! | **Orchestration** | Create, start, join, restart and stop a service.         | [`Service`], [`ServiceInstance`]           |
//! | **Options**       | Per-task typed options merged into one namespace.        | [`OptionSpec`], [`OptionRegistry`]         |
//! | **Policies**      | Backoff between failed steps.                            | [`BackoffPolicy`], [`JitterPolicy`]        |
//! | **Events**        | Broadcast lifecycle events for embedders and tests.      | [`Event`], [`EventKind`]                   |
//! | **Errors**        | Typed errors for declaration, tasks and runtime.         | [`DeclarationError`], [`TaskError`], [`RuntimeError`] |
//! | **Install**       | Install under runit.                                     | [`Installer`], [`RunitInstaller`]          |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use servisor::{Service, ServiceConfig, Task, TaskContext, TaskDescriptor, TaskError};
//!
//! #[derive(Default)]
//! struct Db {
//!     url: String,
//! }
//!
//! #[async_trait]
//! impl Task for Db {
//!     async fn init(&mut self, ctx: &TaskContext) -> Result<(), TaskError> {
//!         self.url = ctx.option("url").and_then(|v| v.as_str()).unwrap_or("").to_string();
//!         Ok(())
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Api {
//!     db: Option<Arc<Db>>,
//! }
//!
//! #[async_trait]
//! impl Task for Api {
//!     async fn init(&mut self, ctx: &TaskContext) -> Result<(), TaskError> {
//!         self.db = Some(ctx.service().require::<Db>().map_err(TaskError::fail)?);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Service::builder("demo")
//!         .task(TaskDescriptor::new("Api", Api::default).depends_on("Db").loopless())
//!         .task(
//!             TaskDescriptor::new("Db", Db::default)
//!                 .loopless()
//!                 .with_option(servisor::OptionSpec::new("url", "sqlite::memory:")),
//!         )
//!         .build()?;
//!     assert_eq!(service.task_names(), vec!["Db", "Api"]);
//!
//!     let cfg = service.default_config().with_signals(false);
//!     let bg = service.start_background(cfg).await?;
//!     assert_eq!(bg.instance().require::<Db>()?.url, "sqlite::memory:");
//!     bg.stop().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
mod core;
pub mod deps;
mod error;
mod events;
pub mod install;
pub mod logging;
mod options;
mod policies;
mod tasks;

// ---- Public re-exports ----

pub use core::{
    BackgroundService, Creation, DEFAULT_BUS_CAPACITY, MAX_POLL_INTERVAL, RunOutcome, Service,
    ServiceBuilder, ServiceConfig, ServiceHandle, ServiceInstance, TaskState,
};
pub use error::{DeclarationError, InitFailure, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use install::{InstallError, Installer, RunitInstaller};
pub use options::{
    OptionDefault, OptionKind, OptionRegistry, OptionSpec, OptionValue, Options, ResolvedOption,
};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use tasks::{AsAny, INTERVAL_OPTION, Task, TaskContext, TaskDescriptor, TaskFn, TaskMode, TaskRef};
