//! Named action inputs.
//!
//! Inputs resolve through layers, highest precedence first:
//! 1. `INPUT_<NAME>` environment variables set by the runner
//! 2. An optional TOML input file for running outside of Actions
//! 3. Built-in defaults

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Source of named inputs
pub trait Inputs {
    /// The raw value of an input, if the source has one
    fn raw(&self, name: &str) -> Option<String>;

    /// Trimmed value; empty counts as absent
    fn get(&self, name: &str) -> Option<String> {
        self.raw(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// YAML 1.2 core-schema boolean; absent is `false`
    fn get_bool(&self, name: &str) -> Result<bool> {
        match self.get(name).as_deref() {
            None => Ok(false),
            Some("true" | "True" | "TRUE") => Ok(true),
            Some("false" | "False" | "FALSE") => Ok(false),
            Some(other) => Err(Error::InvalidInput {
                name: name.to_string(),
                value: other.to_string(),
                reason: "expected one of true|True|TRUE|false|False|FALSE".to_string(),
            }),
        }
    }

    /// Non-empty trimmed lines
    fn get_multiline(&self, name: &str) -> Vec<String> {
        self.raw(name)
            .map(|v| {
                v.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Inputs set by the Actions runner as `INPUT_<NAME>` variables
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvInputs;

impl EnvInputs {
    /// Variable name the runner uses for an input
    pub fn variable(name: &str) -> String {
        format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
    }
}

impl Inputs for EnvInputs {
    fn raw(&self, name: &str) -> Option<String> {
        env::var(Self::variable(name)).ok()
    }
}

/// Inputs held in memory
#[derive(Debug, Default, Clone)]
pub struct MapInputs {
    values: BTreeMap<String, String>,
}

impl MapInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Defaults applied beneath every other layer
    pub fn builtin_defaults() -> Self {
        Self::new()
            .with("action", "test")
            .with("verbosity", "xcpretty")
            .with("upload-logs", "on-failure")
    }
}

impl Inputs for MapInputs {
    fn raw(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Inputs loaded from a flat TOML table keyed by input name
///
/// Arrays become multi-line values, booleans and numbers their text.
#[derive(Debug, Default, Clone)]
pub struct FileInputs {
    values: MapInputs,
}

impl FileInputs {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|reason| Error::Config {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let table: toml::Table = text.parse().map_err(|e: toml::de::Error| e.to_string())?;
        let mut values = MapInputs::new();

        for (name, value) in table {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        toml::Value::String(s) => Ok(s),
                        other => Err(format!(
                            "`{}` must be an array of strings, got {}",
                            name, other
                        )),
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?
                    .join("\n"),
                other => return Err(format!("unsupported value for `{}`: {}", name, other)),
            };
            values.insert(name, text);
        }

        Ok(Self { values })
    }
}

impl Inputs for FileInputs {
    fn raw(&self, name: &str) -> Option<String> {
        self.values.raw(name)
    }
}

/// Stack of input sources; the first non-empty value wins
#[derive(Default)]
pub struct LayeredInputs {
    layers: Vec<Box<dyn Inputs>>,
}

impl LayeredInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer below the existing ones
    pub fn with_layer(mut self, layer: impl Inputs + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Runner environment over an optional input file over built-in defaults
    pub fn standard(file: Option<&Path>) -> Result<Self> {
        let mut inputs = Self::new().with_layer(EnvInputs);
        if let Some(path) = file {
            inputs = inputs.with_layer(FileInputs::from_file(path)?);
        }
        Ok(inputs.with_layer(MapInputs::builtin_defaults()))
    }
}

impl Inputs for LayeredInputs {
    fn raw(&self, name: &str) -> Option<String> {
        self.layers
            .iter()
            .filter_map(|layer| layer.raw(name))
            .find(|v| !v.trim().is_empty())
    }
}
