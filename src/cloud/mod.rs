//! Read-only queries against the cloud provider.

pub mod aws_cli;
pub mod types;

use crate::error::{HarnessError, Result};
use crate::tool::OutputSet;

pub use aws_cli::AwsCli;
pub use types::{
    FlowLog, IngressRule, ResourceKind, ResourceState, SecurityGroup, Snapshot, Subnet, Vpc,
};

pub trait CloudInspector: Send + Sync {
    fn get_vpc(&self, vpc_id: &str, region: &str) -> Result<Vpc>;

    fn list_subnets_for_vpc(&self, vpc_id: &str, region: &str) -> Result<Vec<Subnet>>;

    fn get_subnets(&self, subnet_ids: &[String], region: &str) -> Result<Vec<Subnet>>;

    fn get_flow_logs_for_vpc(&self, vpc_id: &str, region: &str) -> Result<Vec<FlowLog>>;

    fn get_security_group(&self, group_id: &str, region: &str) -> Result<SecurityGroup>;
}

/// Query live state for `ids`. Only [`ResourceKind::Subnets`] accepts more
/// than one id.
pub fn fetch(
    cloud: &dyn CloudInspector,
    region: &str,
    kind: ResourceKind,
    ids: &[String],
) -> Result<Snapshot> {
    if ids.is_empty() || ids.iter().any(|id| id.trim().is_empty()) {
        return Err(HarnessError::Lookup(format!("Empty id for {} lookup", kind)));
    }

    let single = || single_id(kind, ids);

    let state = match kind {
        ResourceKind::Vpc => ResourceState::Vpc(cloud.get_vpc(single()?, region)?),
        ResourceKind::VpcSubnets => {
            ResourceState::Subnets(cloud.list_subnets_for_vpc(single()?, region)?)
        }
        ResourceKind::Subnets => ResourceState::Subnets(cloud.get_subnets(ids, region)?),
        ResourceKind::FlowLogs => {
            ResourceState::FlowLogs(cloud.get_flow_logs_for_vpc(single()?, region)?)
        }
        ResourceKind::SecurityGroup => {
            ResourceState::SecurityGroup(cloud.get_security_group(single()?, region)?)
        }
    };

    Ok(Snapshot {
        kind,
        id: ids.join(","),
        state,
    })
}

fn single_id(kind: ResourceKind, ids: &[String]) -> Result<&str> {
    match ids {
        [id] => Ok(id.as_str()),
        _ => Err(HarnessError::Lookup(format!(
            "{} lookup takes exactly one id, got {}",
            kind,
            ids.len()
        ))),
    }
}

/// Resolve the id(s) from the output named `id_output`, then [`fetch`].
pub fn fetch_from_outputs(
    cloud: &dyn CloudInspector,
    region: &str,
    outputs: &OutputSet,
    kind: ResourceKind,
    id_output: &str,
) -> Result<Snapshot> {
    let ids = match kind {
        ResourceKind::Subnets => outputs.require_list(id_output)?,
        _ => vec![outputs.require_text(id_output)?.to_string()],
    };
    fetch(cloud, region, kind, &ids)
}
