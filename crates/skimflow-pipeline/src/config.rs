//! Named, typed task options with declared defaults.
//!
//! Values are read once, when a pipeline is assembled, and never change while it runs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("option `{name}` expects {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: ConfigValue,
    },

    #[error("unknown option `{name}`")]
    UnknownKey { name: String },

    #[error("invalid configuration: {0}")]
    Parse(String),
}

/// A scalar option value as it appears in a JSON configuration file.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "bool {v}"),
            ConfigValue::Int(v) => write!(f, "int {v}"),
            ConfigValue::Float(v) => write!(f, "float {v}"),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

/// Types an option can be read as.
pub trait FromConfigValue: Sized {
    const EXPECTED: &'static str;

    fn from_config_value(value: ConfigValue) -> Option<Self>;
}

impl FromConfigValue for bool {
    const EXPECTED: &'static str = "a bool";

    fn from_config_value(value: ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl FromConfigValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_config_value(value: ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl FromConfigValue for u64 {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_config_value(value: ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Int(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }
}

impl FromConfigValue for usize {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_config_value(value: ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Int(v) => usize::try_from(v).ok(),
            _ => None,
        }
    }
}

impl FromConfigValue for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_config_value(value: ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Float(v) => Some(v),
            ConfigValue::Int(v) => Some(v as f64),
            ConfigValue::Bool(_) => None,
        }
    }
}

/// Declaration of a task option: its key, default and a one-line description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Configurable<T> {
    pub name: &'static str,
    pub default: T,
    pub help: &'static str,
}

impl<T> Configurable<T> {
    pub const fn new(name: &'static str, default: T, help: &'static str) -> Self {
        Self {
            name,
            default,
            help,
        }
    }
}

/// Option overrides keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: BTreeMap<String, ConfigValue>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flat JSON object such as `{"ptMin": 5.0, "nBins": 50}`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn raw(&self, name: &str) -> Option<ConfigValue> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The configured value for `option`, or its declared default when unset.
    pub fn get<T>(&self, option: &Configurable<T>) -> Result<T, ConfigError>
    where
        T: FromConfigValue + Clone,
    {
        let Some(value) = self.raw(option.name) else {
            return Ok(option.default.clone());
        };
        T::from_config_value(value).ok_or_else(|| ConfigError::TypeMismatch {
            name: option.name.to_owned(),
            expected: T::EXPECTED,
            actual: value,
        })
    }

    /// Reject keys that no task declares, so a typo does not silently fall back to a default.
    pub fn check_known(&self, known: &[&str]) -> Result<(), ConfigError> {
        match self.values.keys().find(|key| !known.contains(&key.as_str())) {
            Some(name) => Err(ConfigError::UnknownKey { name: name.clone() }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PT_MIN: Configurable<f64> = Configurable::new("ptMin", 4.0, "minimum candidate pT");
    const N_BINS: Configurable<usize> = Configurable::new("nBins", 100, "histogram bins");

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::new();
        assert_eq!(config.get(&PT_MIN).unwrap(), 4.0);
        assert_eq!(config.get(&N_BINS).unwrap(), 100);
    }

    #[test]
    fn json_overrides_and_int_widening() {
        let config = Config::from_json_str(r#"{"ptMin": 5, "nBins": 50}"#).unwrap();
        assert_eq!(config.raw("ptMin"), Some(ConfigValue::Int(5)));
        assert_eq!(config.get(&PT_MIN).unwrap(), 5.0);
        assert_eq!(config.get(&N_BINS).unwrap(), 50);
    }

    #[test]
    fn mismatched_types_are_reported() {
        let config = Config::new().with("nBins", 2.5f64).with("ptMin", true);
        assert_eq!(
            config.get(&N_BINS),
            Err(ConfigError::TypeMismatch {
                name: "nBins".to_owned(),
                expected: "a non-negative integer",
                actual: ConfigValue::Float(2.5),
            })
        );
        assert!(config.get(&PT_MIN).is_err());
        assert!(Config::new().with("nBins", -1i64).get(&N_BINS).is_err());
    }

    #[test]
    fn unknown_keys_and_bad_json() {
        let config = Config::new().with("ptMn", 3.0f64);
        assert_eq!(
            config.check_known(&["ptMin", "nBins"]),
            Err(ConfigError::UnknownKey {
                name: "ptMn".to_owned()
            })
        );
        assert!(matches!(
            Config::from_json_str("[1, 2]"),
            Err(ConfigError::Parse(_))
        ));
    }
}
