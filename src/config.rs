//! Configuration handling for textpipe.
//! Components receive a flat key/value map whose keys are namespaced by dotted
//! prefixes. The map is assembled from an optional configuration file and
//! `key=value` overrides given on the command line.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use std::io::Read;
use std::path::Path;

/// Separator between a command line override's key and value.
pub const OVERRIDE_SEPARATOR: char = '=';

/// A flat string-keyed configuration map.
///
/// Keys are namespaced by dotted prefixes, e.g. `pipe.conf.extensions` or
/// `transformer.parameter.<NAME>`. Setting a key twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    entries: IndexMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style [`Configuration::set`].
    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over the entries under `prefix`, yielding the key with the
    /// prefix stripped. Keys equal to the prefix itself are skipped.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter().filter_map(move |(key, value)| {
            key.strip_prefix(prefix)
                .filter(|suffix| !suffix.is_empty())
                .map(|suffix| (suffix, value))
        })
    }

    /// Applies every entry of `other` on top of this configuration.
    pub fn merge(&mut self, other: Configuration) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut conf = Configuration::new();
        for (key, value) in iter {
            conf.set(key, value);
        }
        conf
    }
}

/// A component that is initialised from a [`Configuration`] before use.
///
/// Implementations only read keys under their own prefix and ignore the rest.
/// Configuring takes `&self` so a configured component can be shared.
pub trait Configurable {
    fn configure(&self, conf: &Configuration) -> Result<()>;
}

/// Parses a single `key=value` override.
///
/// The value may be empty and may contain further `=` characters.
///
/// # Errors
/// * `Error::ConfigError` if the separator is missing or the key is empty
pub fn parse_override(raw: &str) -> Result<(String, String)> {
    match raw.split_once(OVERRIDE_SEPARATOR) {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => {
            log::warn!("Rejected configuration override '{raw}'");
            Err(Error::ConfigError(format!(
                "Invalid configuration '{raw}'. The correct format is <key>=<value>"
            )))
        }
    }
}

/// Loads a configuration file, choosing the format by its extension.
///
/// * `.json` - a JSON object
/// * `.yml` / `.yaml` - a YAML mapping
/// * anything else - a Java `.properties` file, see [`parse_properties`]
///
/// Nested JSON/YAML mappings are flattened into dotted keys.
///
/// # Errors
/// * `Error::ConfigError` if the file can't be read or isn't a valid document
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<Configuration> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());

    let content = std::fs::read(path).map_err(|e| {
        Error::ConfigError(format!("Unable to open '{}': {}", path.display(), e))
    })?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match extension {
        "json" => {
            let value: serde_json::Value = serde_json::from_slice(&content).map_err(|e| {
                Error::ConfigError(format!("Invalid JSON in '{}': {}", path.display(), e))
            })?;
            from_structured(value, path)
        }
        "yml" | "yaml" => {
            let value: serde_json::Value = serde_yaml::from_slice(&content).map_err(|e| {
                Error::ConfigError(format!("Invalid YAML in '{}': {}", path.display(), e))
            })?;
            from_structured(value, path)
        }
        _ => parse_properties(content.as_slice()).map_err(|e| match e {
            Error::ConfigError(msg) => {
                Error::ConfigError(format!("Invalid properties in '{}': {}", path.display(), msg))
            }
            other => other,
        }),
    }
}

/// Builds the effective configuration: the file (if any) first, then every
/// override in order, later entries winning.
pub fn build_configuration<P: AsRef<Path>>(
    conf_file: Option<P>,
    overrides: &[String],
) -> Result<Configuration> {
    let mut conf = match conf_file {
        Some(path) => load_config_file(path)?,
        None => Configuration::new(),
    };

    for raw in overrides {
        let (key, value) = parse_override(raw)?;
        debug!("Override '{key}' from command line");
        conf.set(key, value);
    }

    Ok(conf)
}

/// Reads the Java `.properties` format, as `java.util.Properties::load`
/// does: ISO-8859-1 input, `=`, `:` or whitespace separators, `#`/`!`
/// comments, backslash escapes including `\uXXXX`, and line continuations.
pub fn parse_properties<R: Read>(reader: R) -> Result<Configuration> {
    let properties =
        java_properties::read(reader).map_err(|e| Error::ConfigError(e.to_string()))?;

    let mut entries: Vec<_> = properties.into_iter().collect();
    entries.sort();
    Ok(entries.into_iter().collect())
}

fn from_structured(value: serde_json::Value, path: &Path) -> Result<Configuration> {
    match value {
        serde_json::Value::Object(map) => {
            let mut conf = Configuration::new();
            for (key, value) in map {
                flatten_into(&mut conf, key, value);
            }
            Ok(conf)
        }
        serde_json::Value::Null => Ok(Configuration::new()),
        _ => Err(Error::ConfigError(format!(
            "'{}' must contain a mapping of configuration keys",
            path.display()
        ))),
    }
}

fn flatten_into(conf: &mut Configuration, key: String, value: serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (child, value) in map {
                flatten_into(conf, format!("{key}.{child}"), value);
            }
        }
        serde_json::Value::Array(items) => {
            let joined = items.into_iter().map(scalar_to_string).collect::<Vec<_>>().join(",");
            conf.set(key, joined);
        }
        scalar => conf.set(key, scalar_to_string(scalar)),
    }
}

fn scalar_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
