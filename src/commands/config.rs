use crate::cli::ConfigAction;
use crate::config::{
    get_config_path, get_module_root, get_project_config_path, get_work_dir, load_config,
    save_config, Config, PathsConfig, RunConfig, ToolsConfig,
};
use crate::error::Result;

/// A config with every field spelled out, for `config init`.
fn explicit_defaults() -> Config {
    let defaults = Config::default();
    Config {
        tools: ToolsConfig {
            terraform: Some(defaults.tools.get_terraform()),
            aws: Some(defaults.tools.get_aws()),
        },
        paths: PathsConfig {
            module_root: Some(defaults.paths.get_module_root()),
            work_dir: Some(defaults.paths.get_work_dir()),
        },
        run: RunConfig {
            parallelism: Some(defaults.run.get_parallelism()),
            isolate_workdir: Some(defaults.run.get_isolate_workdir()),
            default_region: Some(defaults.run.get_default_region()),
        },
    }
}

pub fn handle_config_command(action: Option<ConfigAction>) -> Result<()> {
    match action {
        Some(ConfigAction::Path) => {
            let config_path = get_config_path()?;
            println!("Config location: {}", config_path.display());
            if let Some(project) = get_project_config_path() {
                println!("Project override: {}", project.display());
            }
        }
        None | Some(ConfigAction::Show) => {
            let config_path = get_config_path()?;
            let config = load_config()?;
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("Config file: {} (not found, using defaults)", config_path.display());
            }
            if let Some(project) = get_project_config_path() {
                println!("Project override: {}", project.display());
            }
            println!();
            println!("Current configuration:");
            println!("  Tools:");
            println!("    terraform: {}", config.tools.get_terraform());
            println!("    aws: {}", config.tools.get_aws());
            println!("  Paths:");
            println!(
                "    module_root: {}",
                get_module_root(&config)?.display()
            );
            println!("    work_dir: {}", get_work_dir(&config)?.display());
            println!("  Run:");
            println!("    parallelism: {}", config.run.get_parallelism());
            println!("    isolate_workdir: {}", config.run.get_isolate_workdir());
            println!("    default_region: {}", config.run.get_default_region());
        }
        Some(ConfigAction::Init) => {
            let config_path = get_config_path()?;
            if config_path.exists() {
                println!("Config already exists at {}", config_path.display());
                return Ok(());
            }
            save_config(&explicit_defaults())?;
            println!("Created default config at {}", config_path.display());
        }
    }
    Ok(())
}
