//! # Option declarations.
//!
//! An [`OptionSpec`] is attached to a [`TaskDescriptor`] and later merged into the
//! process-wide namespace by [`OptionRegistry`](super::OptionRegistry).
//!
//! ## Example
//! ```rust
//! use servisor::{OptionKind, OptionSpec, OptionValue};
//!
//! let port = OptionSpec::new("port", 8080).help("Port to listen on");
//! assert_eq!(port.kind(), OptionKind::Int);
//!
//! let host = OptionSpec::derived("host", OptionKind::Str, |d| {
//!     OptionValue::Str(format!("{}.local", d.name()))
//! });
//! assert_eq!(host.name(), "host");
//! ```

use std::borrow::Cow;
use std::fmt;

use super::value::{OptionKind, OptionValue};
use crate::tasks::TaskDescriptor;

/// Default value of an option.
#[derive(Clone)]
pub enum OptionDefault {
    /// A literal value.
    Value(OptionValue),
    /// Computed from the declaring descriptor when the registry is merged.
    Derived(fn(&TaskDescriptor) -> OptionValue),
}

impl OptionDefault {
    /// Evaluates the default against its declaring descriptor.
    pub fn evaluate(&self, owner: &TaskDescriptor) -> OptionValue {
        match self {
            OptionDefault::Value(v) => v.clone(),
            OptionDefault::Derived(f) => f(owner),
        }
    }
}

impl fmt::Debug for OptionDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionDefault::Value(v) => f.debug_tuple("Value").field(v).finish(),
            OptionDefault::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Declarative description of one task option.
#[derive(Clone, Debug)]
pub struct OptionSpec {
    name: Cow<'static, str>,
    kind: OptionKind,
    default: OptionDefault,
    help: Cow<'static, str>,
    key: Option<Cow<'static, str>>,
}

impl OptionSpec {
    /// Declares an option with a literal default; the kind follows the default.
    pub fn new(name: impl Into<Cow<'static, str>>, default: impl Into<OptionValue>) -> Self {
        let default = default.into();
        Self {
            name: name.into(),
            kind: default.kind(),
            default: OptionDefault::Value(default),
            help: Cow::Borrowed(""),
            key: None,
        }
    }

    /// Declares an option whose default is computed from the declaring descriptor.
    pub fn derived(
        name: impl Into<Cow<'static, str>>,
        kind: OptionKind,
        default: fn(&TaskDescriptor) -> OptionValue,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            default: OptionDefault::Derived(default),
            help: Cow::Borrowed(""),
            key: None,
        }
    }

    /// Sets the help text.
    pub fn help(mut self, help: impl Into<Cow<'static, str>>) -> Self {
        self.help = help.into();
        self
    }

    /// Overrides the derived configuration key (and therefore the CLI flag).
    ///
    /// Accepts either form: `"http-port"`, `"--http-port"` or `"http_port"`.
    pub fn flag(mut self, flag: impl Into<Cow<'static, str>>) -> Self {
        self.key = Some(flag.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    pub fn default_value(&self) -> &OptionDefault {
        &self.default
    }

    pub fn help_text(&self) -> &str {
        &self.help
    }

    /// Returns the configuration key under which the owning task reads this option.
    ///
    /// Keys never contain `-`, so distinct keys always map to distinct flags.
    pub fn key_for(&self, owner: &TaskDescriptor) -> String {
        match &self.key {
            Some(flag) => flag.trim_start_matches('-').replace('-', "_"),
            None => format!("{}_{}", owner.option_prefix(), self.name.replace('-', "_")),
        }
    }
}

/// Converts a task name into the snake_case prefix used for option keys.
///
/// `HttpServer` → `http_server`, `DBusMainLoop` → `d_bus_main_loop`,
/// `thrift-server` → `thrift_server`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' || c == '.' {
            if !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
