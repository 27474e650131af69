//! # Typed option values.
//!
//! [`OptionValue`] is the value stored in the flat configuration table;
//! [`OptionKind`] is its declared type, used by the CLI adapter to pick a parser.

use std::fmt;
use std::time::Duration;

/// Declared type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    /// Free-form string.
    Str,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// Boolean switch.
    Bool,
    /// List of strings.
    List,
}

/// A configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
}

impl OptionValue {
    /// Returns the kind of this value.
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Str(_) => OptionKind::Str,
            OptionValue::Int(_) => OptionKind::Int,
            OptionValue::Float(_) => OptionKind::Float,
            OptionValue::Bool(_) => OptionKind::Bool,
            OptionValue::List(_) => OptionKind::List,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as `f64`; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            OptionValue::Float(f) => Some(*f),
            OptionValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Interprets a numeric value as seconds.
    ///
    /// Negative, non-finite or out-of-range values yield `None`.
    pub fn as_duration(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.as_float()?).ok()
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Str(s) => f.write_str(s),
            OptionValue::Int(n) => write!(f, "{n}"),
            OptionValue::Float(v) => write!(f, "{v}"),
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Str(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(i64::from(v))
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        OptionValue::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_widens_to_float_and_duration() {
        let v = OptionValue::from(3);
        assert_eq!(v.kind(), OptionKind::Int);
        assert_eq!(v.as_float(), Some(3.0));
        assert_eq!(v.as_duration(), Some(Duration::from_secs(3)));
        assert_eq!(v.as_str(), None);
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert_eq!(OptionValue::Float(-1.0).as_duration(), None);
        assert_eq!(OptionValue::Float(f64::NAN).as_duration(), None);
    }

    #[test]
    fn test_overflowing_duration_rejected() {
        assert_eq!(OptionValue::Float(1e30).as_duration(), None);
        assert_eq!(OptionValue::Float(f64::INFINITY).as_duration(), None);
        assert_eq!(OptionValue::Float(0.25).as_duration(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_display_joins_lists() {
        let v = OptionValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(v.to_string(), "a b");
    }
}
