use super::{OutputSet, OutputValue, ProvisioningTool};
use crate::error::{HarnessError, Result};
use crate::scenario::ScenarioConfig;
use std::process::{Output, Stdio};

/// Error text carried back from a failed run is capped to this many lines
/// from the end of the combined output.
const ERROR_TAIL_LINES: usize = 40;

/// [`ProvisioningTool`] backed by the `terraform` CLI.
#[derive(Debug, Clone)]
pub struct Terraform {
    binary: String,
}

impl Default for Terraform {
    fn default() -> Self {
        Self::new("terraform")
    }
}

impl Terraform {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn init_args() -> Vec<String> {
        ["init", "-upgrade=false", "-input=false", "-no-color"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn apply_args(config: &ScenarioConfig) -> Vec<String> {
        let mut args: Vec<String> = ["apply", "-input=false", "-auto-approve", "-lock=false", "-no-color"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(config.var_args());
        args
    }

    pub fn destroy_args(config: &ScenarioConfig) -> Vec<String> {
        let mut args: Vec<String> = ["destroy", "-input=false", "-auto-approve", "-no-color"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(config.var_args());
        args
    }

    fn run(&self, config: &ScenarioConfig, args: &[String]) -> Result<Output> {
        let prefix = config.name_prefix();
        let subcommand = args.first().map(String::as_str).unwrap_or("");
        tracing::info!(
            "[{}] Running {} {} in {}",
            prefix,
            self.binary,
            subcommand,
            config.terraform_dir().display()
        );

        let output = std::process::Command::new(&self.binary)
            .args(args)
            .current_dir(config.terraform_dir())
            .envs(config.env())
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                HarnessError::Tool(format!(
                    "Failed to execute '{} {}' in {}: {}",
                    self.binary,
                    subcommand,
                    config.terraform_dir().display(),
                    e
                ))
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!("[{}] {}", prefix, line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            tracing::debug!("[{}] {}", prefix, line);
        }

        Ok(output)
    }

    fn run_checked(&self, config: &ScenarioConfig, args: &[String]) -> Result<Output> {
        let output = self.run(config, args)?;
        if output.status.success() {
            return Ok(output);
        }

        let subcommand = args.first().map(String::as_str).unwrap_or("");
        let exit_code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Err(HarnessError::Provision(format!(
            "terraform {} failed with exit code {}: {}",
            subcommand,
            exit_code,
            failure_text(&output)
        )))
    }

    fn output_json(&self, config: &ScenarioConfig, name: &str) -> Result<serde_json::Value> {
        let args: Vec<String> = vec![
            "output".to_string(),
            "-no-color".to_string(),
            "-json".to_string(),
            name.to_string(),
        ];
        let output = self.run(config, &args)?;
        if !output.status.success() {
            return Err(HarnessError::Lookup(format!(
                "Output '{}' unavailable: {}",
                name,
                failure_text(&output)
            )));
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

impl ProvisioningTool for Terraform {
    fn init(&self, config: &ScenarioConfig) -> Result<()> {
        self.run_checked(config, &Self::init_args()).map(|_| ())
    }

    fn apply(&self, config: &ScenarioConfig) -> Result<()> {
        self.run_checked(config, &Self::apply_args(config)).map(|_| ())
    }

    fn output(&self, config: &ScenarioConfig, name: &str) -> Result<String> {
        match OutputValue::from_json(&self.output_json(config, name)?) {
            Some(OutputValue::Text(s)) => Ok(s),
            Some(OutputValue::List(_)) => Err(HarnessError::Lookup(format!(
                "Output '{}' is a list, expected a single value",
                name
            ))),
            None => Ok(String::new()),
        }
    }

    fn output_list(&self, config: &ScenarioConfig, name: &str) -> Result<Vec<String>> {
        match OutputValue::from_json(&self.output_json(config, name)?) {
            Some(OutputValue::List(items)) => Ok(items),
            Some(OutputValue::Text(s)) => Err(HarnessError::Lookup(format!(
                "Output '{}' is not a list: {}",
                name, s
            ))),
            None => Ok(Vec::new()),
        }
    }

    fn outputs(&self, config: &ScenarioConfig) -> Result<OutputSet> {
        let args: Vec<String> = vec![
            "output".to_string(),
            "-no-color".to_string(),
            "-json".to_string(),
        ];
        let output = self.run_checked(config, &args)?;
        OutputSet::from_terraform_json(&String::from_utf8_lossy(&output.stdout))
    }

    fn destroy(&self, config: &ScenarioConfig) -> Result<()> {
        self.run_checked(config, &Self::destroy_args(config))
            .map(|_| ())
    }
}

fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).to_string()
    } else {
        stderr.to_string()
    };
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}
