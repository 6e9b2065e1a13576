//! Built-in scenarios and the checks run against each one.

use super::naming::unique_name_prefix;
use super::types::{Overrides, ScenarioConfig, VarMap, VarValue};
use crate::assertions::Expectation;
use crate::cloud::ResourceKind;
use crate::config::default_region;
use crate::error::{HarnessError, Result};
use crate::retry::RetryPolicy;
use crate::runner::{CheckFn, Checker};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

const RETRY_ANY_MESSAGE: &str = "Retrying due to transient error";

pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    /// Definitions directory relative to the module root.
    pub terraform_dir: &'static str,
    /// Region the scenario always runs in unless explicitly overridden.
    pub region: Option<&'static str>,
    pub prefix_base: &'static str,
    /// Whether `aws_region` is passed as an input variable.
    pub sets_region_var: bool,
    pub vars: fn() -> VarMap,
    pub retry: fn() -> Result<RetryPolicy>,
    pub check: CheckFn,
}

pub static SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "basic-vpn",
        description: "VPC with private and public subnets across two zones",
        terraform_dir: "examples/basic-vpn",
        region: Some("us-east-1"),
        prefix_base: "test-s2s",
        sets_region_var: true,
        vars: basic_vpn_vars,
        retry: retry_any_5s,
        check: check_basic_vpn,
    },
    Scenario {
        name: "transit-gateway",
        description: "Transit gateway with a private ASN",
        terraform_dir: "examples/transit-gateway",
        region: Some("us-west-2"),
        prefix_base: "test-tgw",
        sets_region_var: true,
        vars: transit_gateway_vars,
        retry: retry_any_10s,
        check: check_transit_gateway,
    },
    Scenario {
        name: "vpc-flow-logs",
        description: "VPC flow logs delivered with 7 day retention",
        terraform_dir: ".",
        region: Some("us-east-1"),
        prefix_base: "test-flow",
        sets_region_var: true,
        vars: flow_logs_vars,
        retry: no_retry,
        check: check_flow_logs,
    },
    Scenario {
        name: "resource-tags",
        description: "Common tags propagated to the VPC",
        terraform_dir: ".",
        region: Some("us-east-1"),
        prefix_base: "test-tags",
        sets_region_var: true,
        vars: resource_tags_vars,
        retry: no_retry,
        check: check_resource_tags,
    },
    Scenario {
        name: "security",
        description: "VPN security group has no ingress open to the internet",
        terraform_dir: ".",
        region: Some("us-east-1"),
        prefix_base: "test-sec",
        sets_region_var: true,
        vars: security_vars,
        retry: no_retry,
        check: check_security,
    },
    Scenario {
        name: "module-smoke",
        description: "Basic example with flow logs, outputs only",
        terraform_dir: "examples/basic-vpn",
        region: None,
        prefix_base: "test-s2s",
        sets_region_var: false,
        vars: module_smoke_vars,
        retry: no_retry,
        check: check_module_smoke,
    },
];

pub fn find_scenario(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.name == name)
}

pub fn scenario_names() -> Vec<&'static str> {
    SCENARIOS.iter().map(|s| s.name).collect()
}

/// Build the configuration for one invocation of `name`.
///
/// Region precedence: explicit override, then the scenario's pinned region,
/// then the configured default. An `aws_region` override variable wins over
/// all of them.
pub fn configure(name: &str, overrides: &Overrides) -> Result<ScenarioConfig> {
    let scenario = find_scenario(name).ok_or_else(|| {
        HarnessError::Config(format!(
            "Unknown scenario '{}'. Available: {}",
            name,
            scenario_names().join(", ")
        ))
    })?;

    let mut region = overrides
        .region
        .clone()
        .or_else(|| scenario.region.map(str::to_string))
        .or_else(|| overrides.default_region.clone())
        .unwrap_or_else(default_region);

    let name_prefix = overrides
        .name_prefix
        .clone()
        .unwrap_or_else(|| unique_name_prefix(scenario.prefix_base));

    let mut vars = (scenario.vars)();
    vars.insert("name_prefix".to_string(), name_prefix.clone().into());
    if scenario.sets_region_var {
        vars.insert("aws_region".to_string(), region.clone().into());
    }
    for (key, value) in &overrides.vars {
        vars.insert(key.clone(), value.clone());
    }
    if let Some(r) = vars.get("aws_region").and_then(VarValue::as_str) {
        region = r.to_string();
    }

    let mut env = BTreeMap::new();
    env.insert("AWS_DEFAULT_REGION".to_string(), region.clone());
    env.extend(overrides.env.clone());

    Ok(ScenarioConfig {
        scenario: scenario.name.to_string(),
        name_prefix,
        region,
        terraform_dir: PathBuf::from(scenario.terraform_dir),
        vars,
        env,
        retry: (scenario.retry)()?,
    })
}

fn no_retry() -> Result<RetryPolicy> {
    Ok(RetryPolicy::none())
}

fn retry_any_5s() -> Result<RetryPolicy> {
    RetryPolicy::new(3, Duration::from_secs(5)).with_pattern(".*", RETRY_ANY_MESSAGE)
}

fn retry_any_10s() -> Result<RetryPolicy> {
    RetryPolicy::new(3, Duration::from_secs(10)).with_pattern(".*", RETRY_ANY_MESSAGE)
}

fn vars<const N: usize>(entries: [(&str, VarValue); N]) -> VarMap {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn basic_vpn_vars() -> VarMap {
    vars([
        ("create_vpc", true.into()),
        ("vpc_cidr_block", "10.0.0.0/16".into()),
        (
            "private_subnet_cidrs",
            VarValue::list(["10.0.1.0/24", "10.0.2.0/24"]),
        ),
        (
            "public_subnet_cidrs",
            VarValue::list(["10.0.101.0/24", "10.0.102.0/24"]),
        ),
    ])
}

fn transit_gateway_vars() -> VarMap {
    vars([
        ("create_transit_gateway", true.into()),
        ("transit_gateway_amazon_side_asn", 64512_i64.into()),
    ])
}

fn flow_logs_vars() -> VarMap {
    vars([
        ("create_vpc", true.into()),
        ("enable_vpc_flow_logs", true.into()),
        ("vpc_flow_log_retention_days", 7_i64.into()),
    ])
}

fn resource_tags_vars() -> VarMap {
    vars([
        ("create_vpc", true.into()),
        (
            "common_tags",
            VarValue::map([
                ("Environment", "test"),
                ("Project", "s2s-testing"),
                ("terraform-module", "tfm-aws-s2s"),
            ]),
        ),
    ])
}

fn security_vars() -> VarMap {
    vars([
        ("create_vpc", true.into()),
        ("create_vpn_security_group", true.into()),
        ("enable_vpc_flow_logs", true.into()),
    ])
}

fn module_smoke_vars() -> VarMap {
    let mut map = basic_vpn_vars();
    map.remove("create_vpc");
    map.insert("enable_vpc_flow_logs".to_string(), true.into());
    map
}

/// Length of a list variable, for expectations that follow the inputs.
fn list_len(c: &Checker<'_>, name: &str) -> Option<usize> {
    c.config().var(name).and_then(VarValue::as_list).map(<[_]>::len)
}

fn check_basic_vpn(c: &mut Checker<'_>) -> Result<()> {
    c.require_output("vpc_id")?;

    if let Some(n) = list_len(c, "private_subnet_cidrs") {
        c.expect_output("private_subnet_ids", Expectation::Count(n));
    }
    if let Some(n) = list_len(c, "public_subnet_cidrs") {
        c.expect_output("public_subnet_ids", Expectation::Count(n));
    }

    let vpc = c.fetch(ResourceKind::Vpc, "vpc_id")?;
    if let Some(cidr) = c.config().var("vpc_cidr_block").and_then(VarValue::as_str) {
        c.expect(&vpc, Expectation::CidrEquals(cidr.to_string()));
    }

    let private = c.fetch(ResourceKind::Subnets, "private_subnet_ids")?;
    if let Some(n) = list_len(c, "private_subnet_cidrs") {
        c.expect(&private, Expectation::Count(n));
    }
    c.expect(&private, Expectation::MinDistinctAzs(2));

    let all = c.fetch(ResourceKind::VpcSubnets, "vpc_id")?;
    c.expect(&all, Expectation::MinDistinctAzs(2));
    Ok(())
}

fn check_transit_gateway(c: &mut Checker<'_>) -> Result<()> {
    let id = c.require_output("transit_gateway_id")?;
    c.require_output("transit_gateway_arn")?;
    c.expect_output("transit_gateway_arn", Expectation::Contains(id));
    Ok(())
}

fn check_flow_logs(c: &mut Checker<'_>) -> Result<()> {
    c.require_output("vpc_id")?;
    let logs = c.fetch(ResourceKind::FlowLogs, "vpc_id")?;
    c.expect(&logs, Expectation::NonEmpty);
    Ok(())
}

fn check_resource_tags(c: &mut Checker<'_>) -> Result<()> {
    let tags: Vec<(String, String)> = c
        .config()
        .var("common_tags")
        .and_then(VarValue::as_map)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let vpc = c.fetch(ResourceKind::Vpc, "vpc_id")?;
    for (key, value) in tags {
        c.expect(&vpc, Expectation::tag(key, value));
    }
    Ok(())
}

fn check_security(c: &mut Checker<'_>) -> Result<()> {
    if c.output_or_empty("vpn_security_group_id").is_empty() {
        tracing::info!(
            "[{}] No VPN security group created, skipping ingress checks",
            c.config().name_prefix()
        );
        return Ok(());
    }

    let group = c.fetch(ResourceKind::SecurityGroup, "vpn_security_group_id")?;
    c.expect(&group, Expectation::HasIngressRules);
    c.expect(&group, Expectation::NoUnrestrictedIngress);
    Ok(())
}

fn check_module_smoke(c: &mut Checker<'_>) -> Result<()> {
    c.expect_output("vpc_id", Expectation::NonEmpty);
    c.expect_output("private_subnet_ids", Expectation::Count(2));
    Ok(())
}
