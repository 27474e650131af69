//! Declarative task options.
//!
//! ## Contents
//! - [`OptionSpec`], [`OptionDefault`] declarations attached to a task descriptor
//! - [`OptionValue`], [`OptionKind`] typed values
//! - [`OptionRegistry`], [`ResolvedOption`] the merged namespace
//! - [`Options`] the flat `key → value` table stored in the configuration
//!
//! ## Quick wiring
//! ```text
//! TaskDescriptor.with_option(OptionSpec) ──► OptionRegistry::merge()
//!      ├─► ResolvedOption (key, flag, default, help) ──► cli::command()
//!      └─► defaults() ──► ServiceConfig.options ──► TaskContext::option()
//! ```

mod registry;
mod spec;
mod value;

pub use registry::{OptionRegistry, Options, RESERVED_KEYS, ResolvedOption, SERVICE_OWNER};
pub use spec::{OptionDefault, OptionSpec, snake_case};
pub use value::{OptionKind, OptionValue};
