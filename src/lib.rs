pub mod assertions;
pub mod cli;
pub mod cloud;
pub mod commands;
pub mod config;
pub mod error;
pub mod report;
pub mod retry;
pub mod runner;
pub mod scenario;
pub mod tool;
pub mod workdir;

pub use config::expand_tilde;
pub use config::get_config_path;
pub use config::get_module_root;
pub use config::get_work_dir;
pub use config::load_config;
pub use config::save_config;
pub use config::Config;
pub use config::PathsConfig;
pub use config::RunConfig;
pub use config::ToolsConfig;

pub use error::{HarnessError, Result};

pub use assertions::{AssertionFailure, Expectation};
pub use cloud::{AwsCli, CloudInspector, ResourceKind, Snapshot};
pub use retry::{with_retry, RetryPolicy};
pub use runner::{Checker, RunnerSettings, ScenarioOutcome, ScenarioRunner, TeardownGuard};
pub use scenario::{configure, find_scenario, Overrides, ScenarioConfig, VarValue};
pub use tool::{OutputSet, OutputValue, ProvisioningTool, Terraform};
