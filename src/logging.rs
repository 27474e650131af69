//! # Process-wide logging setup.
//!
//! [`init`] installs a `tracing_subscriber` registry with an [`EnvFilter`] and a
//! `fmt` layer on stderr. Task hooks run inside a `task` span carrying the task
//! name, so every line a task logs is attributed to it.
//!
//! `level` accepts any `EnvFilter` directive (`info`, `servisor=debug,warn`)
//! plus the classic names `WARNING`, `CRITICAL` and `FATAL`, case-insensitive.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::RuntimeError;

/// Normalizes a log level name into an `EnvFilter` directive.
pub fn directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(level: &str) -> Result<(), RuntimeError> {
    let filter = EnvFilter::try_new(directive(level))
        .map_err(|e| RuntimeError::Config(format!("invalid log level {level:?}: {e}")))?;

    // Fails only when a global subscriber is already set.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init();
    Ok(())
}
