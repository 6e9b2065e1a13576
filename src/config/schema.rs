use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terraform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<String>,
}

impl ToolsConfig {
    pub fn get_terraform(&self) -> String {
        self.terraform
            .clone()
            .unwrap_or_else(super::default_terraform_binary)
    }

    pub fn get_aws(&self) -> String {
        self.aws.clone().unwrap_or_else(super::default_aws_binary)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
}

impl PathsConfig {
    pub fn get_module_root(&self) -> String {
        self.module_root
            .clone()
            .unwrap_or_else(super::default_module_root)
    }

    pub fn get_work_dir(&self) -> String {
        self.work_dir.clone().unwrap_or_else(super::default_work_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolate_workdir: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,
}

impl RunConfig {
    /// Never returns zero.
    pub fn get_parallelism(&self) -> usize {
        self.parallelism
            .unwrap_or(super::DEFAULT_PARALLELISM)
            .max(1)
    }

    pub fn get_isolate_workdir(&self) -> bool {
        self.isolate_workdir.unwrap_or(true)
    }

    pub fn get_default_region(&self) -> String {
        self.default_region
            .clone()
            .unwrap_or_else(super::default_region)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub run: RunConfig,
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.run.parallelism == Some(0) {
        tracing::warn!("run.parallelism is 0; scenarios will run one at a time");
    }

    if let Some(region) = &config.run.default_region {
        if region.trim().is_empty() {
            return Err(crate::error::HarnessError::Config(
                "run.default_region must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}
