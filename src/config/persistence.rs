use crate::error::{HarnessError, Result};

use crate::config::paths::*;
use crate::config::schema::*;

/// Load the user config, then layer `.s2s-harness.toml` from the current
/// directory on top of it. A missing user config yields defaults.
pub fn load_config() -> Result<Config> {
    let config_path = get_config_path()?;

    let mut config = if config_path.exists() {
        let toml_content = std::fs::read_to_string(&config_path)
            .map_err(|e| HarnessError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&toml_content)
            .map_err(|e| HarnessError::Config(format!("Failed to parse config: {}", e)))?
    } else {
        tracing::debug!("No config at {}, using defaults", config_path.display());
        Config::default()
    };

    if let Some(project_config) = load_project_config()? {
        config = merge_configs(config, project_config);
    }

    validate_config(&config)?;
    Ok(config)
}

fn load_project_config() -> Result<Option<Config>> {
    if let Some(project_config_path) = get_project_config_path() {
        let toml_content = std::fs::read_to_string(&project_config_path).map_err(|e| {
            HarnessError::Config(format!("Failed to read project config file: {}", e))
        })?;

        let config: Config = toml::from_str(&toml_content).map_err(|e| {
            HarnessError::Config(format!("Failed to parse project config: {}", e))
        })?;

        return Ok(Some(config));
    }
    Ok(None)
}

pub fn merge_configs(base: Config, overlay: Config) -> Config {
    Config {
        tools: ToolsConfig {
            terraform: overlay.tools.terraform.or(base.tools.terraform),
            aws: overlay.tools.aws.or(base.tools.aws),
        },
        paths: PathsConfig {
            module_root: overlay.paths.module_root.or(base.paths.module_root),
            work_dir: overlay.paths.work_dir.or(base.paths.work_dir),
        },
        run: RunConfig {
            parallelism: overlay.run.parallelism.or(base.run.parallelism),
            isolate_workdir: overlay.run.isolate_workdir.or(base.run.isolate_workdir),
            default_region: overlay.run.default_region.or(base.run.default_region),
        },
    }
}

pub fn save_config(config: &Config) -> Result<()> {
    let config_path = get_config_path()?;
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            HarnessError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| HarnessError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(&config_path, toml_str)
        .map_err(|e| HarnessError::Config(format!("Failed to write config file: {}", e)))?;
    Ok(())
}
