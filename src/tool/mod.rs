//! Seam around the external provisioning tool.

pub mod terraform;

use crate::error::{HarnessError, Result};
use crate::scenario::ScenarioConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use terraform::Terraform;

/// Lifecycle operations of a declarative provisioning CLI.
///
/// Implementations run synchronously: every call returns once the child
/// process has exited.
pub trait ProvisioningTool: Send + Sync {
    fn init(&self, config: &ScenarioConfig) -> Result<()>;

    fn apply(&self, config: &ScenarioConfig) -> Result<()>;

    fn output(&self, config: &ScenarioConfig, name: &str) -> Result<String>;

    fn output_list(&self, config: &ScenarioConfig, name: &str) -> Result<Vec<String>>;

    /// All declared outputs that currently have a value.
    fn outputs(&self, config: &ScenarioConfig) -> Result<OutputSet>;

    fn destroy(&self, config: &ScenarioConfig) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Text(String),
    List(Vec<String>),
}

impl OutputValue {
    /// Convert a decoded JSON output value. Scalars become text, arrays of
    /// scalars become lists, anything else is kept as its JSON text.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(OutputValue::Text(s.clone())),
            serde_json::Value::Array(items) => Some(OutputValue::List(
                items.iter().map(json_scalar_to_string).collect(),
            )),
            other => Some(OutputValue::Text(json_scalar_to_string(other))),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            OutputValue::Text(s) => s.is_empty(),
            OutputValue::List(items) => items.is_empty(),
        }
    }
}

fn json_scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Named outputs read after a successful apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSet {
    values: BTreeMap<String, OutputValue>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: OutputValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Text output, or an empty string when absent.
    pub fn text_or_empty(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(OutputValue::Text(s)) => s,
            _ => "",
        }
    }

    /// Non-empty text output.
    pub fn require_text(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(OutputValue::Text(s)) if !s.is_empty() => Ok(s),
            Some(OutputValue::Text(_)) => {
                Err(HarnessError::Lookup(format!("Output '{}' is empty", name)))
            }
            Some(OutputValue::List(_)) => Err(HarnessError::Lookup(format!(
                "Output '{}' is a list, expected a single value",
                name
            ))),
            None => Err(HarnessError::Lookup(format!("Output '{}' not found", name))),
        }
    }

    /// List output. A single text value is treated as a one-element list.
    pub fn require_list(&self, name: &str) -> Result<Vec<String>> {
        match self.values.get(name) {
            Some(OutputValue::List(items)) => Ok(items.clone()),
            Some(OutputValue::Text(s)) => Ok(vec![s.clone()]),
            None => Err(HarnessError::Lookup(format!("Output '{}' not found", name))),
        }
    }

    /// Decode `terraform output -json`:
    /// `{"name": {"sensitive": false, "type": ..., "value": ...}}`.
    pub fn from_terraform_json(raw: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct RawOutput {
            value: serde_json::Value,
        }

        let decoded: BTreeMap<String, RawOutput> = serde_json::from_str(raw)?;
        let mut set = OutputSet::new();
        for (name, output) in decoded {
            if let Some(value) = OutputValue::from_json(&output.value) {
                set.insert(name, value);
            }
        }
        Ok(set)
    }
}
