//! # Demo: a ticking service
//!
//! ```text
//! cargo run --example ticker -- --level info
//! cargo run --example ticker -- --tasks              # list tasks
//! cargo run --example ticker -- --clock-interval 0.2 --greeter-name you
//! ```
//!
//! `Clock` ticks on an interval and restarts the service after a few ticks;
//! `Greeter` is loopless and looked up by `Clock` during init. Ctrl-C stops it.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use servisor::{
    OptionSpec, Service, ServiceHandle, Task, TaskContext, TaskDescriptor, TaskError,
};

#[derive(Default)]
struct Greeter {
    name: String,
}

#[async_trait]
impl Task for Greeter {
    async fn init(&mut self, ctx: &TaskContext) -> Result<(), TaskError> {
        self.name = ctx
            .option("name")
            .and_then(|v| v.as_str())
            .unwrap_or("world")
            .to_string();
        Ok(())
    }

    async fn teardown(&self) {
        info!("goodbye, {}", self.name);
    }
}

impl Greeter {
    fn greet(&self, tick: u64) -> String {
        format!("hello {} (tick {tick})", self.name)
    }
}

#[derive(Default)]
struct Clock {
    ticks: AtomicU64,
    restart_after: u64,
    greeter: Option<Arc<Greeter>>,
    service: Option<ServiceHandle>,
}

#[async_trait]
impl Task for Clock {
    async fn init(&mut self, ctx: &TaskContext) -> Result<(), TaskError> {
        if ctx.config().dryrun {
            return Err(TaskError::skip("dryrun"));
        }
        self.greeter = Some(ctx.service().require::<Greeter>().map_err(TaskError::fail)?);
        self.restart_after = ctx
            .option("restart_after")
            .and_then(|v| v.as_int())
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        self.service = Some(ctx.service().clone());
        Ok(())
    }

    async fn step(&self, token: &CancellationToken) -> Result<(), TaskError> {
        if token.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(greeter) = &self.greeter {
            info!("{}", greeter.greet(tick));
        }

        if self.restart_after > 0 && tick == self.restart_after {
            if let Some(service) = &self.service {
                service.request_restart();
            }
        }
        Ok(())
    }

    fn on_stop(&self) {
        info!(ticks = self.ticks.load(Ordering::Relaxed), "clock stopping");
    }
}

fn main() -> ExitCode {
    let service = Service::builder("ticker")
        .task(
            TaskDescriptor::new("Clock", Clock::default)
                .depends_on("Greeter")
                .with_interval(Duration::from_secs(1))
                .with_option(
                    OptionSpec::new("restart_after", 0)
                        .help("Restart the service after this many ticks (0 = never)"),
                ),
        )
        .task(
            TaskDescriptor::new("Greeter", Greeter::default)
                .loopless()
                .with_option(OptionSpec::new("name", "world").help("Who to greet")),
        )
        .build();

    match service {
        Ok(service) => service.main(),
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
