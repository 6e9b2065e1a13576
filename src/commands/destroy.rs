use crate::cli::{parse_vars, validate_name_prefix};
use crate::commands::run::build_runner;
use crate::config::{load_config, Config};
use crate::error::Result;
use crate::scenario::{configure, Overrides, ScenarioConfig};

/// Tear down resources a crashed or failed run left behind, using the work
/// copy that still holds its state.
pub fn destroy_scenario(
    scenario: &str,
    prefix: &str,
    vars: &[String],
    region: Option<String>,
) -> Result<()> {
    let config = load_config()?;
    let scenario_config = destroy_config(&config, scenario, prefix, vars, region)?;

    println!(
        "Destroying {} resources with prefix {} in {}...",
        scenario,
        prefix,
        scenario_config.region()
    );

    let runner = build_runner(&config, false)?;
    runner.destroy_existing(&scenario_config)?;

    println!("Destroyed {}", prefix);
    Ok(())
}

/// Rebuild the configuration an earlier run used: same prefix, same
/// variable overrides.
fn destroy_config(
    config: &Config,
    scenario: &str,
    prefix: &str,
    vars: &[String],
    region: Option<String>,
) -> Result<ScenarioConfig> {
    validate_name_prefix(prefix)?;

    let overrides = Overrides {
        vars: parse_vars(vars)?,
        region,
        default_region: Some(config.run.get_default_region()),
        name_prefix: Some(prefix.to_string()),
        ..Default::default()
    };
    configure(scenario, &overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::VarValue;

    #[test]
    fn test_destroy_reuses_prefix_and_var_overrides() {
        let vars = vec![r#"private_subnet_cidrs=["10.0.1.0/24"]"#.to_string()];

        let config =
            destroy_config(&Config::default(), "basic-vpn", "test-s2s-abc123", &vars, None)
                .unwrap();

        assert_eq!(config.name_prefix(), "test-s2s-abc123");
        assert_eq!(
            config.var("private_subnet_cidrs"),
            Some(&VarValue::list(["10.0.1.0/24"]))
        );
        assert_eq!(config.var("create_vpc"), Some(&VarValue::Bool(true)));
    }

    #[test]
    fn test_destroy_rejects_malformed_var() {
        let vars = vec!["no-equals-sign".to_string()];
        let err = destroy_config(&Config::default(), "basic-vpn", "test-s2s-abc123", &vars, None)
            .unwrap_err();
        assert!(err.to_string().contains("NAME=VALUE"));
    }
}
