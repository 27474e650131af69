//! # Option registry: one flat namespace for every task option.
//!
//! [`OptionRegistry::merge`] walks the declared descriptors and resolves each
//! [`OptionSpec`](super::OptionSpec) into a [`ResolvedOption`] with its final key,
//! CLI flag and evaluated default.
//!
//! ## Rules
//! - Keys are `<task prefix>_<option>` unless the option declares a flag override;
//!   `-` in option names becomes `_`.
//! - Flags are keys with `_` replaced by `-`.
//! - Entries are kept in a `BTreeMap`, so the merge result does not depend on
//!   declaration order.
//! - A key declared twice (or colliding with an orchestrator option) is a
//!   [`DeclarationError::DuplicateOption`].

use std::collections::BTreeMap;

use super::value::{OptionKind, OptionValue};
use crate::error::DeclarationError;
use crate::tasks::TaskDescriptor;

/// Owner name used for options that belong to the orchestrator itself.
pub const SERVICE_OWNER: &str = "<service>";

/// Keys reserved by the orchestrator.
pub const RESERVED_KEYS: &[&str] = &["tasks", "level", "runit_install", "dryrun"];

/// One merged option, ready to be exposed to a CLI parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOption {
    /// Configuration key (`http_server_port`).
    pub key: String,
    /// Long CLI flag without dashes prefix (`http-server-port`).
    pub flag: String,
    /// Name of the declaring task.
    pub owner: String,
    /// Declared option name inside its task (`port`).
    pub name: String,
    pub kind: OptionKind,
    pub default: OptionValue,
    pub help: String,
}

/// Merged option specification of a service.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    entries: BTreeMap<String, ResolvedOption>,
}

impl OptionRegistry {
    /// Merges the options of every descriptor.
    pub fn merge(descriptors: &[TaskDescriptor]) -> Result<Self, DeclarationError> {
        let mut entries: BTreeMap<String, ResolvedOption> = BTreeMap::new();

        for desc in descriptors {
            for spec in desc.options() {
                let key = spec.key_for(desc);

                if RESERVED_KEYS.contains(&key.as_str()) {
                    return Err(DeclarationError::DuplicateOption {
                        key,
                        first: SERVICE_OWNER.to_string(),
                        second: desc.name().to_string(),
                    });
                }
                if let Some(existing) = entries.get(&key) {
                    return Err(DeclarationError::DuplicateOption {
                        key,
                        first: existing.owner.clone(),
                        second: desc.name().to_string(),
                    });
                }

                let resolved = ResolvedOption {
                    flag: key.replace('_', "-"),
                    owner: desc.name().to_string(),
                    name: spec.name().to_string(),
                    kind: spec.kind(),
                    default: spec.default_value().evaluate(desc),
                    help: spec.help_text().to_string(),
                    key: key.clone(),
                };
                entries.insert(key, resolved);
            }
        }
        Ok(Self { entries })
    }

    /// Iterates merged options ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedOption> {
        self.entries.values()
    }

    pub fn get(&self, key: &str) -> Option<&ResolvedOption> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the default-value table, usable before any parsing happens.
    pub fn defaults(&self) -> Options {
        Options {
            values: self
                .entries
                .iter()
                .map(|(k, o)| (k.clone(), o.default.clone()))
                .collect(),
        }
    }
}

/// Flat `key → value` configuration table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// Sets a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Option<OptionValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fills in every key from `defaults` that is not set yet.
    pub fn fill_from(&mut self, defaults: &Options) {
        for (k, v) in &defaults.values {
            self.values.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionSpec;
    use crate::tasks::{Task, TaskDescriptor};

    struct Noop;
    impl Task for Noop {}

    fn desc(name: &'static str) -> TaskDescriptor {
        TaskDescriptor::new(name, || Noop)
    }

    #[test]
    fn test_keys_are_prefixed_per_task() {
        let tasks = vec![
            desc("HttpServer").with_option(OptionSpec::new("port", 8080)),
            desc("Metrics").with_option(OptionSpec::new("port", 9090)),
        ];
        let reg = OptionRegistry::merge(&tasks).unwrap();
        assert_eq!(reg.len(), 2);

        let http = reg.get("http_server_port").unwrap();
        assert_eq!(http.flag, "http-server-port");
        assert_eq!(http.owner, "HttpServer");
        assert_eq!(http.default, OptionValue::Int(8080));

        let defaults = reg.defaults();
        assert_eq!(defaults.get("metrics_port"), Some(&OptionValue::Int(9090)));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = desc("A").with_option(OptionSpec::new("x", 1));
        let b = desc("B").with_option(OptionSpec::new("y", "v"));

        let forward = OptionRegistry::merge(&[a.clone(), b.clone()]).unwrap();
        let backward = OptionRegistry::merge(&[b, a]).unwrap();
        let f: Vec<_> = forward.iter().cloned().collect();
        let r: Vec<_> = backward.iter().cloned().collect();
        assert_eq!(f, r);
    }

    #[test]
    fn test_flag_override_collision_is_rejected() {
        let tasks = vec![
            desc("Api").with_option(OptionSpec::new("port", 80).flag("--port")),
            desc("Admin").with_option(OptionSpec::new("listen", 81).flag("port")),
        ];
        let err = OptionRegistry::merge(&tasks).unwrap_err();
        assert_eq!(
            err,
            DeclarationError::DuplicateOption {
                key: "port".into(),
                first: "Api".into(),
                second: "Admin".into(),
            }
        );
    }

    #[test]
    fn test_dashed_option_name_collides_with_matching_key() {
        let tasks = vec![
            desc("A").with_option(OptionSpec::new("b-c", 1)),
            desc("A_b").with_option(OptionSpec::new("c", 2)),
        ];
        let err = OptionRegistry::merge(&tasks).unwrap_err();
        assert_eq!(
            err,
            DeclarationError::DuplicateOption {
                key: "a_b_c".into(),
                first: "A".into(),
                second: "A_b".into(),
            }
        );
    }

    #[test]
    fn test_dashed_option_name_is_normalized() {
        let tasks = vec![desc("Api").with_option(OptionSpec::new("max-conns", 10))];
        let reg = OptionRegistry::merge(&tasks).unwrap();
        let opt = reg.get("api_max_conns").unwrap();
        assert_eq!(opt.flag, "api-max-conns");
    }

    #[test]
    fn test_reserved_key_is_rejected() {
        let tasks = vec![desc("Api").with_option(OptionSpec::new("lvl", "x").flag("level"))];
        let err = OptionRegistry::merge(&tasks).unwrap_err();
        assert_eq!(err.as_label(), "declaration_duplicate_option");
    }

    #[test]
    fn test_derived_default_sees_descriptor() {
        let tasks = vec![desc("Cache").with_option(OptionSpec::derived(
            "name",
            OptionKind::Str,
            |d| OptionValue::Str(d.name().to_lowercase()),
        ))];
        let reg = OptionRegistry::merge(&tasks).unwrap();
        assert_eq!(
            reg.get("cache_name").map(|o| o.default.clone()),
            Some(OptionValue::Str("cache".into()))
        );
    }

    #[test]
    fn test_fill_from_keeps_explicit_values() {
        let mut defaults = Options::new();
        defaults.set("a", 1);
        defaults.set("b", 2);

        let mut cfg = Options::new();
        cfg.set("a", 10);
        cfg.fill_from(&defaults);

        assert_eq!(cfg.get("a"), Some(&OptionValue::Int(10)));
        assert_eq!(cfg.get("b"), Some(&OptionValue::Int(2)));
    }
}
