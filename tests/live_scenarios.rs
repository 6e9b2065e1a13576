//! Real provisioning against an AWS account. Each test creates billable
//! resources and tears them down again.
//!
//! Run from the module checkout with credentials in the environment:
//!
//! ```text
//! cargo test --test live_scenarios -- --ignored --test-threads 2
//! ```

use s2s_harness::commands::run::build_runner;
use s2s_harness::scenario::{configure, find_scenario, Overrides};
use s2s_harness::{load_config, ScenarioOutcome};

fn run_live(name: &str) -> ScenarioOutcome {
    let config = load_config().expect("Failed to load config");
    let runner = build_runner(&config, false).expect("Failed to build runner");
    let overrides = Overrides {
        default_region: Some(config.run.get_default_region()),
        ..Default::default()
    };
    let scenario_config = configure(name, &overrides).expect("Failed to configure scenario");
    let scenario = find_scenario(name).expect("Scenario missing from catalog");

    runner.run(&scenario_config, scenario.check)
}

fn assert_passed(outcome: &ScenarioOutcome) {
    assert!(
        outcome.passed(),
        "{} ({}) failed: error={:?} failures={:?} teardown={:?}",
        outcome.scenario,
        outcome.name_prefix,
        outcome.error,
        outcome.failures,
        outcome.teardown_error
    );
}

#[test]
#[ignore = "provisions real AWS resources"]
fn live_basic_vpn() {
    assert_passed(&run_live("basic-vpn"));
}

#[test]
#[ignore = "provisions real AWS resources"]
fn live_transit_gateway() {
    assert_passed(&run_live("transit-gateway"));
}

#[test]
#[ignore = "provisions real AWS resources"]
fn live_vpc_flow_logs() {
    assert_passed(&run_live("vpc-flow-logs"));
}

#[test]
#[ignore = "provisions real AWS resources"]
fn live_resource_tags() {
    assert_passed(&run_live("resource-tags"));
}

#[test]
#[ignore = "provisions real AWS resources"]
fn live_security() {
    assert_passed(&run_live("security"));
}

#[test]
#[ignore = "provisions real AWS resources"]
fn live_module_smoke() {
    assert_passed(&run_live("module-smoke"));
}
