use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A value handed to the provisioning tool as an input variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<VarValue>),
    Map(BTreeMap<String, VarValue>),
}

impl VarValue {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<VarValue>,
    {
        VarValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<VarValue>,
    {
        VarValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VarValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[VarValue]> {
        match self {
            VarValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, VarValue>> {
        match self {
            VarValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Render as the right-hand side of `-var name=value`.
    ///
    /// Top-level strings are passed raw; nested strings are quoted.
    pub fn to_cli_arg(&self) -> String {
        match self {
            VarValue::Str(s) => s.clone(),
            other => other.to_hcl(),
        }
    }

    /// HCL expression syntax for this value.
    pub fn to_hcl(&self) -> String {
        match self {
            VarValue::Bool(b) => b.to_string(),
            VarValue::Int(i) => i.to_string(),
            VarValue::Str(s) => hcl_quote(s),
            VarValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(VarValue::to_hcl).collect();
                format!("[{}]", rendered.join(", "))
            }
            VarValue::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{} = {}", hcl_quote(k), v.to_hcl()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
        }
    }
}

fn hcl_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Template sequences are escaped by doubling the leading sigil.
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::Str(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        VarValue::Str(s)
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        VarValue::Bool(b)
    }
}

impl From<i64> for VarValue {
    fn from(i: i64) -> Self {
        VarValue::Int(i)
    }
}

pub type VarMap = BTreeMap<String, VarValue>;

/// Caller-supplied adjustments applied on top of a scenario's defaults.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub vars: VarMap,
    pub env: BTreeMap<String, String>,
    /// Replaces the scenario's pinned region.
    pub region: Option<String>,
    /// Region for scenarios that do not pin one.
    pub default_region: Option<String>,
    /// Reuse an existing prefix instead of generating a fresh one.
    pub name_prefix: Option<String>,
}

/// Everything the runner needs to drive one scenario. Immutable once built.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub(crate) scenario: String,
    pub(crate) name_prefix: String,
    pub(crate) region: String,
    pub(crate) terraform_dir: PathBuf,
    pub(crate) vars: VarMap,
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) retry: RetryPolicy,
}

impl ScenarioConfig {
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Directory holding the definitions, relative to the module root until
    /// the runner resolves it.
    pub fn terraform_dir(&self) -> &Path {
        &self.terraform_dir
    }

    pub fn vars(&self) -> &VarMap {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&VarValue> {
        self.vars.get(name)
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// The same scenario pointed at a different definitions directory.
    pub fn relocated(&self, terraform_dir: PathBuf) -> Self {
        Self {
            terraform_dir,
            ..self.clone()
        }
    }

    /// `-var name=value` pairs in a stable order.
    pub fn var_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.vars.len() * 2);
        for (name, value) in &self.vars {
            args.push("-var".to_string());
            args.push(format!("{}={}", name, value.to_cli_arg()));
        }
        args
    }
}
