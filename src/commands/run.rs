use crate::cli::parse_vars;
use crate::cloud::AwsCli;
use crate::config::{get_module_root, get_work_dir, load_config, Config};
use crate::error::{HarnessError, Result};
use crate::report::{render_json, render_text, RunSummary};
use crate::runner::{CheckFn, RunnerSettings, ScenarioOutcome, ScenarioRunner};
use crate::scenario::{configure, find_scenario, scenario_names, Overrides, ScenarioConfig};
use crate::tool::Terraform;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub struct RunOptions {
    pub scenarios: Vec<String>,
    pub all: bool,
    pub vars: Vec<String>,
    pub region: Option<String>,
    pub json: bool,
    pub keep_workdir: bool,
}

fn selected_names(options: &RunOptions) -> Result<Vec<String>> {
    if options.all {
        return Ok(scenario_names().into_iter().map(str::to_string).collect());
    }
    if options.scenarios.is_empty() {
        return Err(HarnessError::Config(format!(
            "No scenarios selected. Pass scenario names or --all (available: {})",
            scenario_names().join(", ")
        )));
    }

    let mut names: Vec<String> = Vec::new();
    for name in &options.scenarios {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    Ok(names)
}

fn runner_settings(config: &Config, keep_workdir: bool) -> Result<RunnerSettings> {
    Ok(RunnerSettings {
        module_root: get_module_root(config)?,
        work_dir: get_work_dir(config)?,
        isolate_workdir: config.run.get_isolate_workdir(),
        keep_workdir,
    })
}

pub fn build_runner(config: &Config, keep_workdir: bool) -> Result<ScenarioRunner> {
    Ok(ScenarioRunner::new(
        Arc::new(Terraform::new(config.tools.get_terraform())),
        Arc::new(AwsCli::new(config.tools.get_aws())),
        runner_settings(config, keep_workdir)?,
    ))
}

/// Configure every selected scenario up front so a bad name or override
/// fails before anything is provisioned.
fn plan(options: &RunOptions, config: &Config) -> Result<Vec<(ScenarioConfig, CheckFn)>> {
    let overrides = Overrides {
        vars: parse_vars(&options.vars)?,
        region: options.region.clone(),
        default_region: Some(config.run.get_default_region()),
        ..Default::default()
    };

    selected_names(options)?
        .iter()
        .map(|name| {
            let scenario_config = configure(name, &overrides)?;
            let check = find_scenario(name)
                .map(|s| s.check)
                .ok_or_else(|| HarnessError::Config(format!("Unknown scenario '{}'", name)))?;
            Ok((scenario_config, check))
        })
        .collect()
}

/// Sets `flag` on the first Ctrl+C. Scenarios notice it between tool calls
/// and go straight to teardown.
fn spawn_interrupt_listener(flag: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, tearing down running scenarios...");
            flag.store(true, Ordering::SeqCst);
        }
    })
}

/// Run `planned` with at most `parallelism` scenarios in flight. Outcomes
/// come back in plan order.
pub async fn execute(
    runner: Arc<ScenarioRunner>,
    planned: Vec<(ScenarioConfig, CheckFn)>,
    parallelism: usize,
) -> Vec<ScenarioOutcome> {
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut tasks = JoinSet::new();

    for (index, (scenario_config, check)) in planned.iter().cloned().enumerate() {
        let runner = runner.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = semaphore.acquire_owned().await.ok();
            let result =
                tokio::task::spawn_blocking(move || runner.run(&scenario_config, check)).await;
            (index, result)
        });
    }

    let mut outcomes: Vec<Option<ScenarioOutcome>> = vec![None; planned.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(outcome))) => outcomes[index] = Some(outcome),
            Ok((index, Err(e))) => {
                tracing::error!(
                    "[{}] Scenario worker panicked: {}",
                    planned[index].0.name_prefix(),
                    e
                );
                outcomes[index] = Some(ScenarioOutcome::aborted(
                    &planned[index].0,
                    format!("scenario worker panicked: {}", e),
                ));
            }
            Err(e) => tracing::error!("Scenario task failed: {}", e),
        }
    }

    outcomes
        .into_iter()
        .zip(planned.iter())
        .map(|(outcome, (scenario_config, _))| {
            outcome.unwrap_or_else(|| {
                ScenarioOutcome::aborted(scenario_config, "scenario task did not report")
            })
        })
        .collect()
}

pub async fn run_scenarios(options: RunOptions) -> Result<i32> {
    let config = load_config()?;
    let planned = plan(&options, &config)?;

    let interrupt = Arc::new(AtomicBool::new(false));
    let runner =
        Arc::new(build_runner(&config, options.keep_workdir)?.with_interrupt(interrupt.clone()));

    tracing::info!(
        "Running {} scenario(s) with parallelism {}",
        planned.len(),
        config.run.get_parallelism()
    );

    let listener = spawn_interrupt_listener(interrupt);
    let outcomes = execute(runner, planned, config.run.get_parallelism()).await;
    listener.abort();

    if options.json {
        println!("{}", render_json(&outcomes)?);
    } else {
        print!("{}", render_text(&outcomes));
    }

    Ok(if RunSummary::new(&outcomes).all_passed() {
        0
    } else {
        1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(scenarios: &[&str], all: bool) -> RunOptions {
        RunOptions {
            scenarios: scenarios.iter().map(|s| s.to_string()).collect(),
            all,
            vars: Vec::new(),
            region: None,
            json: false,
            keep_workdir: false,
        }
    }

    #[test]
    fn test_nothing_selected_is_an_error() {
        let err = selected_names(&options(&[], false)).unwrap_err();
        assert!(err.to_string().contains("--all"));
    }

    #[test]
    fn test_all_selects_every_scenario() {
        let names = selected_names(&options(&[], true)).unwrap();
        assert_eq!(names.len(), scenario_names().len());
    }

    #[test]
    fn test_duplicates_run_once_in_order() {
        let names = selected_names(&options(&["security", "basic-vpn", "security"], false)).unwrap();
        assert_eq!(names, vec!["security", "basic-vpn"]);
    }

    #[test]
    fn test_plan_rejects_unknown_before_running_anything() {
        let err = plan(&options(&["basic-vpn", "nope"], false), &Config::default()).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_plan_applies_cli_overrides() {
        let mut opts = options(&["module-smoke"], false);
        opts.vars = vec!["enable_vpc_flow_logs=false".to_string()];
        opts.region = Some("eu-west-1".to_string());

        let planned = plan(&opts, &Config::default()).unwrap();

        let scenario_config = &planned[0].0;
        assert_eq!(scenario_config.region(), "eu-west-1");
        assert_eq!(
            scenario_config.var("enable_vpc_flow_logs"),
            Some(&crate::scenario::VarValue::Bool(false))
        );
    }
}
