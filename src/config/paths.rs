use crate::config::Config;
use crate::error::{HarnessError, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const PROJECT_CONFIG_FILE: &str = ".s2s-harness.toml";

pub fn expand_tilde(path: &str) -> PathBuf {
    let path = path.trim();
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    } else if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    }
    PathBuf::from(path)
}

/// Expand `~` and anchor relative paths at `base`.
pub fn resolve_path(path: &str, base: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    if let Ok(config_dir) = std::env::var("S2S_HARNESS_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let project_dirs = ProjectDirs::from("com", "s2s-harness", "s2s-harness").ok_or_else(|| {
        HarnessError::Config("Could not determine config directory".to_string())
    })?;

    Ok(project_dirs.config_dir().to_path_buf())
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

pub fn get_project_config_path() -> Option<PathBuf> {
    let current_dir = std::env::current_dir().ok()?;
    let project_config_path = current_dir.join(PROJECT_CONFIG_FILE);
    if project_config_path.exists() {
        Some(project_config_path)
    } else {
        None
    }
}

pub fn get_module_root(config: &Config) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(resolve_path(&config.paths.get_module_root(), &cwd))
}

pub fn get_work_dir(config: &Config) -> Result<PathBuf> {
    if let Ok(env_dir) = std::env::var("S2S_HARNESS_WORK_DIR") {
        return Ok(PathBuf::from(env_dir));
    }
    let cwd = std::env::current_dir()?;
    Ok(resolve_path(&config.paths.get_work_dir(), &cwd))
}
